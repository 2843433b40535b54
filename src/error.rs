//! Error types for site-merger
//!
//! This module provides the error type hierarchy using `thiserror`.
//! Per-source failures (`FetchError`) are never fatal to a run; the
//! aggregator absorbs them. Only persistence and base-document failures
//! abort.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for site-merger operations
#[derive(Error, Debug)]
pub enum Error {
    /// Remote document retrieval errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Reading or writing a local artifact failed
    #[error("Failed to persist {path}: {source}")]
    Persist {
        /// Artifact path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The base document could not be loaded, nothing to merge into
    #[error("Base document unavailable: {0}")]
    BaseUnavailable(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors retrieving or decoding a remote document
#[derive(Error, Debug)]
pub enum FetchError {
    /// URL failed to parse or uses an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Connection, DNS or TLS failure
    #[error("Network error: {0}")]
    Transport(String),

    /// Request or task exceeded its deadline
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Non-2xx response
    #[error("HTTP error {status} from {url}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Body was neither JSON nor a base64-wrapped JSON payload
    #[error("Undecodable payload: {0}")]
    Decode(String),
}

/// Structural failures in the merge engine
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MergeError {
    /// Document has no `sites` array
    #[error("document has no valid 'sites' array")]
    MissingSites,

    /// An item to insert is not a JSON object
    #[error("item {0} to insert is not an object")]
    NotAnObject(usize),
}

/// Run configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for `RunConfig`
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds an unusable value
    #[error("Invalid value for {field}: {message}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    /// Create an `Invalid` error for a field
    pub fn invalid<S: Into<String>>(field: &'static str, message: S) -> Self {
        ConfigError::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Notification channel errors
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Both the POST and the GET fallback failed to get a response
    #[error("Notification transport failed: {0}")]
    Transport(String),

    /// Endpoint answered with a non-zero `error_code`
    #[error("Notification rejected with code {code}: {message}")]
    Rejected {
        /// Remote error code
        code: i64,
        /// Remote error message, empty when absent
        message: String,
    },

    /// Response body was not the expected JSON shape
    #[error("Invalid notification response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for site-merger operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a persistence error for a path
    pub fn persist<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Error::Persist {
            path: path.into(),
            source,
        }
    }
}
