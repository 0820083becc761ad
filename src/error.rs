use std::path::PathBuf;

use thiserror::Error;

/// Error type for dbirs operations
#[derive(Debug, Error)]
pub enum DbiError {
    #[error("Unsupported backend `{0}`; supported backends are sqlite, sybase")]
    UnsupportedBackend(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    #[error("Parameter binding failed: {0}")]
    Binding(String),

    #[error("No password supplied and none available: {0}")]
    NoPassword(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("{program} failed with return code {code:?}: {stderr}")]
    ExternalProcess {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to read credential file {path}: {source}")]
    CredentialUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV output: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// Result type alias for dbirs operations
pub type Result<T> = std::result::Result<T, DbiError>;
