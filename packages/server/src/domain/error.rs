//! Domain error types.
//!
//! Every error a client can observe is mapped to an [`ErrorCode`] and delivered
//! as an `error` envelope to the offending connection only.

use serde::Serialize;
use thiserror::Error;

/// Machine-readable error code carried by outbound `error` envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownEvent,
    InvalidPayload,
    MalformedFrame,
    FrameTooLarge,
    Forbidden,
    ValidationFailed,
    NotFound,
    Internal,
}

/// Errors raised while decoding an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The frame is text but not a JSON event envelope.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The transport delivered a frame that is not text (binary).
    #[error("malformed frame: {0} frames are not supported")]
    NonTextFrame(&'static str),

    /// The frame exceeds the configured size limit.
    #[error("frame of {size} bytes exceeds the limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },

    /// The envelope's `type` is not a recognized event kind.
    #[error("unknown event type '{0}'")]
    UnknownEvent(String),

    /// The envelope's `data` (or `chat_id`) does not fit the event kind.
    #[error("invalid payload for '{kind}': {reason}")]
    InvalidPayload { kind: String, reason: String },
}

impl ProtocolError {
    /// Fatal errors close the connection after the error envelope is sent:
    /// oversized frames and frames that are not text at the transport level.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::FrameTooLarge { .. } | ProtocolError::NonTextFrame(_)
        )
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ProtocolError::MalformedFrame(_) | ProtocolError::NonTextFrame(_) => {
                ErrorCode::MalformedFrame
            }
            ProtocolError::FrameTooLarge { .. } => ErrorCode::FrameTooLarge,
            ProtocolError::UnknownEvent(_) => ErrorCode::UnknownEvent,
            ProtocolError::InvalidPayload { .. } => ErrorCode::InvalidPayload,
        }
    }
}

/// Failures reported by the message-processing and chat-access collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl ProcessError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProcessError::Validation(_) => ErrorCode::ValidationFailed,
            ProcessError::Forbidden(_) => ErrorCode::Forbidden,
            ProcessError::NotFound(_) => ErrorCode::NotFound,
            ProcessError::Storage(_) => ErrorCode::Internal,
        }
    }
}

/// Authentication failures. These reject the upgrade before a connection exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no token was presented")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token subject '{0}' is not a user id")]
    InvalidSubject(String),
}
