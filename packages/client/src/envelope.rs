//! Client-side view of the hub's JSON envelopes.
//!
//! The client only depends on the wire format, not on the server crate.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Envelope sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub chat_id: i64,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ClientFrame {
    pub fn join(chat_id: i64) -> Self {
        Self::bare("join", chat_id)
    }

    pub fn leave(chat_id: i64) -> Self {
        Self::bare("leave", chat_id)
    }

    pub fn typing(chat_id: i64, is_typing: bool) -> Self {
        Self {
            kind: "typing",
            chat_id,
            data: json!({ "is_typing": is_typing }),
        }
    }

    pub fn read_receipt(chat_id: i64, message_id: i64) -> Self {
        Self {
            kind: "read-receipt",
            chat_id,
            data: json!({ "message_id": message_id }),
        }
    }

    pub fn new_message(chat_id: i64, content: &str) -> Self {
        Self {
            kind: "new-message",
            chat_id,
            data: json!({ "content": content }),
        }
    }

    /// `status` events are not tied to a chat.
    pub fn status(status: &str) -> Self {
        Self {
            kind: "status",
            chat_id: 0,
            data: json!({ "status": status }),
        }
    }

    fn bare(kind: &'static str, chat_id: i64) -> Self {
        Self {
            kind,
            chat_id,
            data: Value::Null,
        }
    }
}

/// Envelope pushed by the hub.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub chat_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub data: Value,
    pub timestamp: i64,
}

impl ServerEnvelope {
    /// Look up a field of `data`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}
