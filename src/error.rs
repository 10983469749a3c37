use thiserror::Error;

/// Result type for VR Sync operations
pub type Result<T> = std::result::Result<T, VrSyncError>;

/// Errors that can occur when talking to a VR Sync server
#[derive(Error, Debug)]
pub enum VrSyncError {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The connection task has stopped and no longer accepts commands
    #[error("Connection closed")]
    ConnectionClosed,

    /// Handshake did not complete in time
    #[error("Handshake timeout")]
    Timeout,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be turned into an endpoint
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Media type index outside of the known media types
    #[error("Invalid media type index: {0}")]
    InvalidMediaType(usize),

    /// Action id the module does not define
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Malformed Socket.IO / Engine.IO frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}
