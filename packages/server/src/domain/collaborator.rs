//! Interfaces of the collaborators the hub relies on but does not implement.
//!
//! Persistence, authentication and chat-membership authorization live outside
//! the hub. The hub only sees them through these traits; in-process defaults
//! are provided by the infrastructure layer.

use async_trait::async_trait;
use serde::Serialize;

use super::{AuthError, ChatId, MessageId, ProcessError, UserId};

/// A validated request to create a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub content: String,
}

/// A chat message as persisted by the message processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender: UserId,
    pub content: String,
    /// Unix milliseconds (UTC)
    pub created_at: i64,
}

/// A request to mark a message as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadReceipt {
    pub message_id: MessageId,
}

/// A read receipt as recorded by the message processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadReceiptRecord {
    pub message_id: MessageId,
    pub chat_id: ChatId,
    pub reader: UserId,
    /// Unix milliseconds (UTC)
    pub read_at: i64,
}

/// Resolves the token presented during the WebSocket handshake to a user.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError>;
}

/// Decides whether a user may join a chat's room.
///
/// The hub itself never re-checks membership; callers consult this before
/// submitting a join.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatAccess: Send + Sync {
    async fn can_join(&self, user_id: UserId, chat_id: ChatId) -> bool;
}

/// Persists chat messages and read receipts, applying business rules.
///
/// The hub only broadcasts the result; validation of content is this
/// collaborator's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn create_message(
        &self,
        sender: UserId,
        chat_id: ChatId,
        request: NewMessage,
    ) -> Result<PersistedMessage, ProcessError>;

    async fn mark_read(
        &self,
        reader: UserId,
        chat_id: ChatId,
        receipt: ReadReceipt,
    ) -> Result<ReadReceiptRecord, ProcessError>;
}
