//! Error types for fuentes-chat

use thiserror::Error;

/// Result type alias using fuentes-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during chat operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the stream layer
    #[error(transparent)]
    Stream(#[from] fuentes_stream::Error),

    /// A query session is already in flight
    #[error("A query is already in progress")]
    Busy,

    /// A generic chat error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if this error came from the transport
    pub fn is_transport_failure(&self) -> bool {
        match self {
            Error::Stream(e) => e.is_transport_failure(),
            _ => false,
        }
    }
}
