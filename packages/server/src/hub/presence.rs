//! Presence views and the ephemeral signals built on the broadcast primitive.

use serde::Serialize;

use crate::domain::{ChatId, OutboundEvent, PresenceStatus, UserId};

use super::{BroadcastEnvelope, Connection};

/// Point-in-time presence of a connected user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceSnapshot {
    pub user_id: UserId,
    pub status: PresenceStatus,
    pub rooms: Vec<ChatId>,
    /// Unix milliseconds (UTC)
    pub connected_at: i64,
    /// Unix milliseconds (UTC)
    pub last_activity: i64,
}

impl PresenceSnapshot {
    pub(crate) fn of(connection: &Connection) -> Self {
        Self {
            user_id: connection.user_id(),
            status: connection.status(),
            rooms: connection.rooms(),
            connected_at: connection.connected_at(),
            last_activity: connection.last_activity(),
        }
    }
}

pub(crate) fn presence_envelope(
    chat_id: ChatId,
    user_id: UserId,
    status: PresenceStatus,
    timestamp: i64,
) -> BroadcastEnvelope {
    BroadcastEnvelope::from_user(chat_id, user_id, OutboundEvent::Presence { status }, timestamp)
}

pub(crate) fn membership_envelope(
    chat_id: ChatId,
    user_id: UserId,
    joined: bool,
    timestamp: i64,
) -> BroadcastEnvelope {
    let event = if joined {
        OutboundEvent::UserJoined
    } else {
        OutboundEvent::UserLeft
    };
    BroadcastEnvelope::from_user(chat_id, user_id, event, timestamp)
}

/// A typing indicator from `user_id` to the rest of `chat_id`.
pub fn typing_envelope(
    chat_id: ChatId,
    user_id: UserId,
    is_typing: bool,
    timestamp: i64,
) -> BroadcastEnvelope {
    BroadcastEnvelope::from_user(chat_id, user_id, OutboundEvent::Typing { is_typing }, timestamp)
}
