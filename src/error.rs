// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for tidydir

use thiserror::Error;

/// Result type alias for tidydir operations
pub type Result<T> = std::result::Result<T, TidyError>;

/// tidydir error types
#[derive(Error, Debug)]
pub enum TidyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Directory not found: {0:?}")]
    DirectoryNotFound(std::path::PathBuf),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Record store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<lopdf::Error> for TidyError {
    fn from(e: lopdf::Error) -> Self {
        TidyError::Report(e.to_string())
    }
}
