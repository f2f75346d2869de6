//! Error types for the subscription engine.

use crate::types::ConnectionId;
use thiserror::Error;

/// Main error type for registry, routing and transport operations.
#[derive(Debug, Error)]
pub enum TransceiverError {
    #[error("Invalid collection name: {0:?}")]
    InvalidCollection(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TransceiverError {
    fn from(e: serde_json::Error) -> Self {
        TransceiverError::Serialization(e.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, TransceiverError>;

/// Reject empty collection names at the registry boundary.
pub(crate) fn validate_collection(collection: &str) -> Result<()> {
    if collection.is_empty() {
        return Err(TransceiverError::InvalidCollection(collection.to_string()));
    }
    Ok(())
}
