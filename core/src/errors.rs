//! Error types for herald

use thiserror::Error;

/// Error taxonomy of the messaging layer.
///
/// No variant is fatal to the process: connection errors are retried via
/// `ensure_connection`, topology errors are surfaced to the supervision
/// loop which retries after a fixed delay, publish errors are logged and
/// converted to `false`, and handler errors trigger a negative
/// acknowledgment with broker redelivery.
#[derive(Debug, Error)]
pub enum HeraldError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Topology error: {0}")]
    Topology(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
