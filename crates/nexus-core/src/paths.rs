use crate::error::{Result, SyncError};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// File and directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "sections.yaml";
pub const DATA_DIR: &str = "data";
pub const MANIFEST_FILE: &str = "data/nexus.json";
pub const DEFAULT_SOURCES_ROOT: &str = ".cache/sources";

pub const TRIAGE_COUNTS_FILE: &str = "sot_triage_counts.json";
pub const TASKS_EXPORT_FILE: &str = "sot_tasks_export.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn data_dir(root: &Path) -> PathBuf {
    root.join(DATA_DIR)
}

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

/// Destination used when a section does not declare one: `data/<id>.json`.
pub fn default_section_dest(id: &str) -> PathBuf {
    Path::new(DATA_DIR).join(format!("{id}.json"))
}

/// `owner/name` → `owner__name`.
pub fn cache_dir_name(repo: &str) -> String {
    repo.replace('/', "__")
}

/// `base.join(rel)` without `.` segments. `..` is kept as written.
pub fn join_clean(base: &Path, rel: &Path) -> PathBuf {
    let joined: PathBuf = base
        .join(rel)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if joined.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        joined
    }
}

/// Local working copy location for `repo` under `sources_root`.
pub fn checkout_dir(sources_root: &Path, repo: &str) -> PathBuf {
    sources_root.join(cache_dir_name(repo))
}

// ---------------------------------------------------------------------------
// Repo slug validation
// ---------------------------------------------------------------------------

static REPO_SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn repo_slug_re() -> &'static Regex {
    REPO_SLUG_RE.get_or_init(|| Regex::new(r"^[\w\-]+/[\w.\-]+$").unwrap())
}

pub fn validate_repo_slug(repo: &str) -> Result<()> {
    if !repo_slug_re().is_match(repo) {
        return Err(SyncError::InvalidRepoSlug(repo.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
