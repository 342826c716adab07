use thiserror::Error;

use crate::domain::EntityKind;
use crate::engine::SyncResult;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Store error: {0}")]
    Store(#[from] libsql::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A pass aborted inside `sync_all`; `partial` holds the counts of the
    /// passes that finished before it.
    #[error("{kind} sync failed: {source}")]
    Pass {
        kind: EntityKind,
        partial: Box<SyncResult>,
        source: Box<SyncError>,
    },
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, SyncError>;
