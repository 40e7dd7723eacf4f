//! WebSocket event envelope DTOs.
//!
//! Inbound (client → server):
//!
//! ```text
//! {"type": "new-message", "chat_id": 10, "data": {"content": "hello"}}
//! ```
//!
//! Outbound (server → client):
//!
//! ```text
//! {"type": "new-message", "chat_id": 10, "user_id": 1, "data": {...}, "timestamp": 1700000000000}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{ErrorCode, PresenceStatus};

/// Raw inbound envelope; `data` is interpreted according to `type`.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrameDto {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub chat_id: i64,
    #[serde(default)]
    pub data: serde_json::Value,
}

fn default_true() -> bool {
    true
}

/// `data` of a `typing` event. A bare `typing` event means "started typing".
#[derive(Debug, Clone, Deserialize)]
pub struct TypingData {
    #[serde(default = "default_true")]
    pub is_typing: bool,
}

/// `data` of a `read-receipt` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadReceiptData {
    pub message_id: i64,
}

/// `data` of a `new-message` event.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessageData {
    pub content: String,
}

/// `data` of a `status` event.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusData {
    pub status: PresenceStatus,
}

/// Outbound envelope as written to the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelopeDto {
    #[serde(rename = "type")]
    pub kind: String,
    /// `0` when the event is not about a chat (`connected`, some `error`s).
    pub chat_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    pub timestamp: i64,
}

/// `data` of a `new-message` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: i64,
    pub content: String,
    pub created_at: i64,
}

/// `data` of a `read-receipt` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadReceiptDto {
    pub message_id: i64,
    pub read_at: i64,
}

/// `data` of a `presence` envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceDto {
    pub status: PresenceStatus,
}

/// `data` of a `typing` envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypingDto {
    pub is_typing: bool,
}

/// `data` of an `error` envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDto {
    pub code: ErrorCode,
    pub message: String,
}
