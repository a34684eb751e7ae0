//! Error types for the wait-times gateway

use std::io;

use thiserror::Error;

/// Result type alias for the wait-times gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Wait-times gateway errors
///
/// The response cache itself has no error taxonomy — all of its operations
/// are total. Everything here belongs to the surrounding service: config
/// loading, the upstream fetch, and serving.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream returned a non-success status or an unusable payload
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
