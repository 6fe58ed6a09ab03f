use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid arguments: {0}")]
    Validation(String),

    #[error("Database file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Write operations are not allowed in readonly mode. Set readonly=false to allow writes.")]
    WriteNotAllowed,

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("failed to open database {}: {source}", .path.display())]
    DbOpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Engine failures keep the SQLite message verbatim.
    #[error("{0}")]
    Engine(#[from] rusqlite::Error),

    #[error("cannot read directory {}: {source}", .path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::WriteNotAllowed => "WRITE_NOT_ALLOWED",
            AppError::TableNotFound(_) => "TABLE_NOT_FOUND",
            AppError::DbOpenFailed { .. } => "DB_OPEN_FAILED",
            AppError::Engine(_) => "ENGINE",
            AppError::DirectoryUnreadable { .. } => "DIRECTORY_UNREADABLE",
            AppError::Io(_) => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
