//! Error types for core catalog operations.

use thiserror::Error;

/// Errors that can occur while loading or querying a core catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Reading a catalog file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A catalog file is not valid JSON or does not match the record layout.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No core with this model name exists.
    #[error("unknown core model '{0}'")]
    UnknownCore(String),

    /// A core with this model name was already loaded.
    #[error("duplicate core model '{0}'")]
    DuplicateCore(String),

    /// A core record has an invalid dimension.
    #[error("core '{model}' is invalid: {source}")]
    InvalidCore {
        model: String,
        source: flyback_core::Error,
    },
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
