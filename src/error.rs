//! Error types for batchfetch
//!
//! Two layers of errors exist:
//! - [`Error`] covers startup, configuration and pipeline-level failures. These are
//!   fatal and abort a run before (or instead of) producing a report.
//! - [`FetchError`] covers a single network retrieval. These never escape the
//!   pipeline: the item task downgrades them to the descriptor's `succeeded` flag
//!   and logs them.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for batchfetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for batchfetch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "workers")
        key: Option<String>,
    },

    /// I/O error (reading the address list or a config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The outbound queue closed before every submitted item produced an outcome
    #[error("worker pool stopped early: received {received} of {expected} outcomes")]
    WorkerLost {
        /// Number of items submitted to the pool
        expected: usize,
        /// Number of outcomes received before the queue closed
        received: usize,
    },
}

impl Error {
    /// Build a [`Error::Config`] for a specific configuration key.
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Failure of a single fetch operation.
///
/// Every variant carries the URL that was requested so that log lines can be
/// correlated with the descriptor they belong to.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be constructed (malformed address)
    #[error("invalid request for {url}: {reason}")]
    InvalidRequest {
        /// The URL that could not be requested
        url: String,
        /// Why the request could not be built
        reason: String,
    },

    /// Connection, DNS or body-read failure
    #[error("transport error for {url}: {source}")]
    Transport {
        /// The URL being fetched
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The per-request deadline expired
    #[error("request to {url} timed out after {}s", .timeout.as_secs_f64())]
    Timeout {
        /// The URL being fetched
        url: String,
        /// The deadline that expired
        timeout: Duration,
    },

    /// The server answered with something other than 200 OK
    #[error("unexpected status {status} for {url}")]
    Status {
        /// The URL being fetched
        url: String,
        /// HTTP status code returned
        status: u16,
    },

    /// The response body was not the expected JSON shape
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// The URL being fetched
        url: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse classification of a [`FetchError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Request construction failed
    Request,
    /// Transport failed, including deadline expiry
    Transport,
    /// Non-success status code
    Status,
    /// Payload decoding failed
    Decode,
}

impl FetchError {
    /// Classify this error.
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::InvalidRequest { .. } => FetchErrorKind::Request,
            FetchError::Transport { .. } | FetchError::Timeout { .. } => {
                FetchErrorKind::Transport
            }
            FetchError::Status { .. } => FetchErrorKind::Status,
            FetchError::Decode { .. } => FetchErrorKind::Decode,
        }
    }

    /// Whether the request failed because its deadline expired.
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Timeout { .. } => true,
            FetchError::Transport { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// The URL that was being requested.
    pub fn url(&self) -> &str {
        match self {
            FetchError::InvalidRequest { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::Timeout { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }
}
