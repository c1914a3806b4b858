//! Error types for the status mirror.

use thiserror::Error;

/// Main error type for status operations.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Malformed update: {0}")]
    MalformedUpdate(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Update requested while another update is being applied on this thread")]
    ReentrantUpdate,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<serde_json::Error> for StatusError {
    fn from(e: serde_json::Error) -> Self {
        StatusError::Decode(e.to_string())
    }
}

/// Failure reported by a transport collaborator.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Invalid response body: {0}")]
    InvalidBody(String),
}

/// Failure reported by a subscriber callback.
///
/// Never propagates out of `publish`; it is logged and counted.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SubscriberError(pub String);

impl SubscriberError {
    pub fn new(msg: impl Into<String>) -> Self {
        SubscriberError(msg.into())
    }
}

/// Result type for subscriber callbacks.
pub type SubscriberResult = std::result::Result<(), SubscriberError>;

/// Result type for status operations.
pub type Result<T> = std::result::Result<T, StatusError>;
