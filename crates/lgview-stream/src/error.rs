//! Error taxonomy for the streaming client.

use thiserror::Error;

/// A failure observed at the transport boundary.
///
/// Cancellation is deliberately absent: a cancelled stream ends in
/// [`StreamOutcome::Cancelled`](crate::transport::StreamOutcome::Cancelled).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The endpoint could not be reached (DNS, refused connection, TLS, ...).
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server answered with a non-success status.
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },

    /// The server answered successfully but without a body to stream.
    #[error("response body is null")]
    MissingBody,

    /// Reading an already-open body failed.
    #[error("stream read failed: {0}")]
    Read(String),

    /// A non-streaming response could not be decoded.
    #[error("invalid response payload: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Connection(_) => FailureKind::Connection,
            TransportError::Status { .. } | TransportError::MissingBody => FailureKind::Protocol,
            TransportError::Read(_) | TransportError::Decode(_) => FailureKind::StreamRead,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Connection,
    Protocol,
    StreamRead,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no location selected")]
    NoLocation,

    #[error("unknown location {0:?}")]
    UnknownLocation(String),

    #[error("invalid locations list: {0}")]
    InvalidLocations(#[from] serde_json::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
