//! Error types for fuentes-stream

use thiserror::Error;

/// Result type alias using fuentes-stream Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the backend or reading its stream
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed (connect, send, or mid-body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend answered with a non-2xx status
    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Stream was aborted by the caller
    #[error("Request aborted")]
    Aborted,

    /// Invalid configuration (bad URL, etc.)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Frame or response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Create a status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Whether this error is a transport failure, i.e. the kind of failure
    /// that ends a query session and is shown to the user.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Status { .. })
    }

    /// Whether this error came from a single malformed frame.
    /// Frame failures are logged and skipped, never fatal to a stream.
    pub fn is_frame_failure(&self) -> bool {
        matches!(self, Error::Json(_) | Error::UnexpectedResponse(_))
    }
}
