//! Typed chat events exchanged between clients and the hub.
//!
//! The wire envelopes carry a `type` string and a free-form `data` object; here
//! each event kind is its own variant so that every dispatch site is checked
//! for exhaustiveness.

use super::{
    ChatId, ConnectionId, ErrorCode, MessageId, PersistedMessage, PresenceStatus,
    ReadReceiptRecord, UserId,
};

/// An event decoded from a client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Typing { chat_id: ChatId, is_typing: bool },
    Join { chat_id: ChatId },
    Leave { chat_id: ChatId },
    ReadReceipt { chat_id: ChatId, message_id: MessageId },
    NewMessage { chat_id: ChatId, content: String },
    Status { status: PresenceStatus },
}

impl InboundEvent {
    /// The wire name of this event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Typing { .. } => "typing",
            InboundEvent::Join { .. } => "join",
            InboundEvent::Leave { .. } => "leave",
            InboundEvent::ReadReceipt { .. } => "read-receipt",
            InboundEvent::NewMessage { .. } => "new-message",
            InboundEvent::Status { .. } => "status",
        }
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        match self {
            InboundEvent::Typing { chat_id, .. }
            | InboundEvent::Join { chat_id }
            | InboundEvent::Leave { chat_id }
            | InboundEvent::ReadReceipt { chat_id, .. }
            | InboundEvent::NewMessage { chat_id, .. } => Some(*chat_id),
            InboundEvent::Status { .. } => None,
        }
    }
}

/// An inbound event stamped with its sender and the server-side receipt time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedEvent {
    pub sender: UserId,
    /// The connection instance the frame arrived on.
    pub connection_id: ConnectionId,
    /// Unix milliseconds (UTC)
    pub received_at: i64,
    pub event: InboundEvent,
}

/// An event delivered to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Sent once to a freshly registered connection.
    Connected,
    UserJoined,
    UserLeft,
    Presence { status: PresenceStatus },
    Typing { is_typing: bool },
    NewMessage(PersistedMessage),
    ReadReceipt(ReadReceiptRecord),
    Error { code: ErrorCode, message: String },
}

impl OutboundEvent {
    /// The wire name of this event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEvent::Connected => "connected",
            OutboundEvent::UserJoined => "user-joined",
            OutboundEvent::UserLeft => "user-left",
            OutboundEvent::Presence { .. } => "presence",
            OutboundEvent::Typing { .. } => "typing",
            OutboundEvent::NewMessage(_) => "new-message",
            OutboundEvent::ReadReceipt(_) => "read-receipt",
            OutboundEvent::Error { .. } => "error",
        }
    }
}

/// An outbound event addressed to a chat (or to no chat) with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEnvelope {
    pub event: OutboundEvent,
    pub chat_id: Option<ChatId>,
    /// The user the event is about (sender, joiner, reader, ...).
    pub user_id: Option<UserId>,
    /// Unix milliseconds (UTC)
    pub timestamp: i64,
}

impl OutboundEnvelope {
    pub fn new(event: OutboundEvent, timestamp: i64) -> Self {
        Self {
            event,
            chat_id: None,
            user_id: None,
            timestamp,
        }
    }

    pub fn in_chat(mut self, chat_id: ChatId) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    pub fn about(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// An `error` envelope for the connection that caused it.
    pub fn error(
        code: ErrorCode,
        message: impl Into<String>,
        chat_id: Option<ChatId>,
        timestamp: i64,
    ) -> Self {
        Self {
            event: OutboundEvent::Error {
                code,
                message: message.into(),
            },
            chat_id,
            user_id: None,
            timestamp,
        }
    }
}
