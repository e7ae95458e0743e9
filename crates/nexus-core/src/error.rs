use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("missing config: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("bad repo slug '{0}': must be owner/name")]
    InvalidRepoSlug(String),

    #[error("invalid triage '{0}': must be one of Blue, Green, Yellow, Orange, Red")]
    InvalidTriage(String),

    #[error("invalid include pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("failed to run '{command}': {reason}")]
    CommandSpawn { command: String, reason: String },

    #[error("command failed: {command} ({})", exit_label(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("unsupported column type {type_name} for column '{column}'")]
    UnsupportedColumn { column: String, type_name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "terminated by signal".to_string(),
    }
}
