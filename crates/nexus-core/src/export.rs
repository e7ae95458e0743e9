//! Record export: two fixed queries against the source-of-truth schema,
//! written out as JSON files next to the section data.

use crate::error::{Result, SyncError};
use crate::io;
use crate::paths;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::postgres::{PgConnection, PgRow, PgTypeKind};
use sqlx::{Column, Connection, Row, TypeInfo};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/postgres";

// Enum-typed and aggregate columns are cast to types `cell` decodes. Ordering
// stays on the source columns.
pub const TRIAGE_COUNTS_QUERY: &str = "SELECT entity::text AS entity, triage::text AS triage, \
     count::bigint AS count FROM sot.triage_counts \
     ORDER BY triage_counts.entity, triage_counts.triage NULLS LAST";

pub const TASKS_QUERY: &str = "SELECT id,title,repo,nh_id,epic,triage::text AS triage,due,owner,\
     sot_link,status::text AS status FROM sot.tasks_export ORDER BY id DESC LIMIT 200";

pub const TASK_COLUMNS: [&str; 10] = [
    "id", "title", "repo", "nh_id", "epic", "triage", "due", "owner", "sot_link", "status",
];

const UNSPECIFIED_TRIAGE: &str = "Unspecified";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageCount {
    pub entity: String,
    pub triage: String,
    pub count: i64,
}

impl TriageCount {
    pub fn new(entity: String, triage: Option<String>, count: i64) -> Self {
        let triage = triage
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNSPECIFIED_TRIAGE.to_string());
        Self {
            entity,
            triage,
            count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub triage_counts: usize,
    pub tasks: usize,
    pub triage_counts_path: PathBuf,
    pub tasks_path: PathBuf,
}

pub fn resolve_database_url(url: Option<String>) -> String {
    url.filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

/// Zip a task row's values with [`TASK_COLUMNS`]. Missing trailing values
/// become `null`.
pub fn task_record(values: Vec<Value>) -> Map<String, Value> {
    let mut values = values.into_iter();
    TASK_COLUMNS
        .iter()
        .map(|c| (c.to_string(), values.next().unwrap_or(Value::Null)))
        .collect()
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn opt<T: Into<Value>>(v: Option<T>) -> Value {
    v.map(Into::into).unwrap_or(Value::Null)
}

/// How a column is read back out of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Bool,
    Text,
    /// Enum labels travel as their text form in both wire formats.
    EnumLabel,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Json,
    Uuid,
    Unsupported,
}

fn cell_kind(type_name: &str, is_enum: bool) -> CellKind {
    if is_enum {
        return CellKind::EnumLabel;
    }
    match type_name {
        "INT2" => CellKind::Int2,
        "INT4" => CellKind::Int4,
        "INT8" => CellKind::Int8,
        "FLOAT4" => CellKind::Float4,
        "FLOAT8" => CellKind::Float8,
        "BOOL" => CellKind::Bool,
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" => CellKind::Text,
        "DATE" => CellKind::Date,
        "TIME" => CellKind::Time,
        "TIMESTAMP" => CellKind::Timestamp,
        "TIMESTAMPTZ" => CellKind::TimestampTz,
        "JSON" | "JSONB" => CellKind::Json,
        "UUID" => CellKind::Uuid,
        _ => CellKind::Unsupported,
    }
}

/// Decode one cell into JSON according to its PostgreSQL type.
fn cell(row: &PgRow, idx: usize) -> Result<Value> {
    let column = row.column(idx);
    let type_info = column.type_info();
    let is_enum = matches!(type_info.kind(), PgTypeKind::Enum(_));
    let value = match cell_kind(type_info.name(), is_enum) {
        CellKind::Int2 => opt(row.try_get::<Option<i16>, _>(idx)?),
        CellKind::Int4 => opt(row.try_get::<Option<i32>, _>(idx)?),
        CellKind::Int8 => opt(row.try_get::<Option<i64>, _>(idx)?),
        CellKind::Float4 => opt(row.try_get::<Option<f32>, _>(idx)?),
        CellKind::Float8 => opt(row.try_get::<Option<f64>, _>(idx)?),
        CellKind::Bool => opt(row.try_get::<Option<bool>, _>(idx)?),
        CellKind::Text => opt(row.try_get::<Option<String>, _>(idx)?),
        CellKind::EnumLabel => opt(row.try_get_unchecked::<Option<String>, _>(idx)?),
        CellKind::Date => opt(row
            .try_get::<Option<NaiveDate>, _>(idx)?
            .map(|d| d.format("%Y-%m-%d").to_string())),
        CellKind::Time => opt(row
            .try_get::<Option<NaiveTime>, _>(idx)?
            .map(|t| t.to_string())),
        CellKind::Timestamp => opt(row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        CellKind::TimestampTz => opt(row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(|t| t.to_rfc3339())),
        CellKind::Json => row
            .try_get::<Option<Value>, _>(idx)?
            .unwrap_or(Value::Null),
        CellKind::Uuid => opt(row
            .try_get::<Option<sqlx::types::Uuid>, _>(idx)?
            .map(|u| u.to_string())),
        CellKind::Unsupported => {
            return Err(SyncError::UnsupportedColumn {
                column: column.name().to_string(),
                type_name: type_info.name().to_string(),
            })
        }
    };
    Ok(value)
}

fn row_values(row: &PgRow) -> Result<Vec<Value>> {
    (0..row.len()).map(|i| cell(row, i)).collect()
}

fn triage_count_from_row(row: &PgRow) -> Result<TriageCount> {
    let values = row_values(row)?;
    let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
    Ok(TriageCount::new(
        text(values.first()).unwrap_or_default(),
        text(values.get(1)),
        values.get(2).and_then(Value::as_i64).unwrap_or(0),
    ))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write both result sets into `out_dir`.
pub fn write_exports(
    out_dir: &Path,
    counts: &[TriageCount],
    tasks: &[Map<String, Value>],
) -> Result<ExportSummary> {
    let triage_counts_path = out_dir.join(paths::TRIAGE_COUNTS_FILE);
    let tasks_path = out_dir.join(paths::TASKS_EXPORT_FILE);
    io::write_json(&triage_counts_path, counts)?;
    io::write_json(&tasks_path, tasks)?;
    Ok(ExportSummary {
        triage_counts: counts.len(),
        tasks: tasks.len(),
        triage_counts_path,
        tasks_path,
    })
}

/// Query the database once for each export and write the results.
/// The connection is closed before any file is written.
pub async fn export(database_url: &str, out_dir: &Path) -> Result<ExportSummary> {
    debug!("connecting to database");
    let mut conn = PgConnection::connect(database_url).await?;

    let counts = sqlx::query(TRIAGE_COUNTS_QUERY)
        .fetch_all(&mut conn)
        .await?
        .iter()
        .map(triage_count_from_row)
        .collect::<Result<Vec<_>>>()?;

    let tasks = sqlx::query(TASKS_QUERY)
        .fetch_all(&mut conn)
        .await?
        .iter()
        .map(|row| row_values(row).map(task_record))
        .collect::<Result<Vec<_>>>()?;

    conn.close().await?;

    let summary = write_exports(out_dir, &counts, &tasks)?;
    info!(
        triage_counts = summary.triage_counts,
        tasks = summary.tasks,
        "records exported"
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
