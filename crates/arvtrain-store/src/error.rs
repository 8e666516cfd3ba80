//! Store error types.

use thiserror::Error;

/// Errors raised by stores, data sources and sinks.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing a local file failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// A stored record exists but does not parse.
    #[error("corrupt data in {path}: {message}")]
    Corrupt { path: String, message: String },

    /// The remote endpoint answered with an error status.
    #[error("HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },

    /// The remote endpoint could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(path.display().to_string())
        } else {
            StoreError::Io {
                path: path.display().to_string(),
                message: err.to_string(),
            }
        }
    }

    pub(crate) fn corrupt(path: &std::path::Path, err: serde_json::Error) -> Self {
        StoreError::Corrupt {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            StoreError::Network(format!("request to {url} timed out"))
        } else if err.is_connect() {
            StoreError::Network(format!("{url} is not reachable"))
        } else {
            StoreError::Network(err.to_string())
        }
    }
}
