//! Error types for the Tsudoi client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The hub rejected the token during the handshake
    #[error("The server rejected the token (401 Unauthorized)")]
    Unauthorized,

    /// The hub is shutting down and refuses new connections
    #[error("The server is unavailable (503 Service Unavailable)")]
    Unavailable,

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
}
