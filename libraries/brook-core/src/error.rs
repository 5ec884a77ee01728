//! Core error types for the Brook bridge

use thiserror::Error;

/// Result type alias using `BridgeError`
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Core error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Allocation failure reported by a collaborator
    #[error("Out of memory")]
    OutOfMemory,

    /// No downstream sink is connected to the pin
    #[error("Pin is not connected to a downstream sink")]
    NotConnected,

    /// Type negotiation failed; no candidate descriptor was accepted
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Byte source read failure
    #[error("I/O failure: {0}")]
    IoFailure(String),

    /// The engine failed to open or probe the container
    #[error("Engine failed to open container: {0}")]
    EngineOpenFailure(String),

    /// The engine rejected a seek command
    #[error("Engine rejected seek")]
    SeekFailure,

    /// Operation issued in the wrong connection state
    #[error("Invalid bridge state: {0}")]
    InvalidState(String),

    /// Pin index out of range
    #[error("No such pin: {0}")]
    NoSuchPin(usize),
}

/// Errors surfaced by a downstream sink during delivery
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The sink has no connection; delivery is skipped, not fatal
    #[error("Sink is not connected")]
    NotConnected,

    /// The sink is flushing and rejected the delivery
    #[error("Sink is flushing")]
    Flushing,

    /// Any other sink-side failure
    #[error("Sink error: {0}")]
    Failed(String),
}

impl From<SinkError> for BridgeError {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::NotConnected => BridgeError::NotConnected,
            other => BridgeError::IoFailure(other.to_string()),
        }
    }
}
