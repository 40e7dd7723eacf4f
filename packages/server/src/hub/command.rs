//! Messages accepted by the hub's control loop.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::domain::{
    ChatId, ConnectionId, OutboundEnvelope, OutboundEvent, PresenceStatus, UserId,
};

use super::Connection;

/// One fan-out operation: an event for every member of a chat but one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastEnvelope {
    pub chat_id: ChatId,
    /// The user the event originates from.
    pub origin: UserId,
    pub event: OutboundEvent,
    /// Unix milliseconds (UTC)
    pub timestamp: i64,
    /// Member that must not receive the event.
    pub exclude: Option<UserId>,
}

impl BroadcastEnvelope {
    /// An event from `origin` to the rest of `chat_id`. The origin never
    /// receives its own broadcast back.
    pub fn from_user(chat_id: ChatId, origin: UserId, event: OutboundEvent, timestamp: i64) -> Self {
        Self {
            chat_id,
            origin,
            event,
            timestamp,
            exclude: Some(origin),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.event.kind()
    }

    pub fn to_outbound(&self) -> OutboundEnvelope {
        OutboundEnvelope::new(self.event.clone(), self.timestamp)
            .in_chat(self.chat_id)
            .about(self.origin)
    }
}

/// Join, Leave and SetStatus carry the connection they were issued from, if
/// any. They are ignored when that connection is no longer the user's live one.
pub(crate) enum HubCommand {
    Register(Arc<Connection>),
    Unregister(Arc<Connection>),
    Join {
        user_id: UserId,
        chat_id: ChatId,
        origin: Option<ConnectionId>,
    },
    Leave {
        user_id: UserId,
        chat_id: ChatId,
        origin: Option<ConnectionId>,
    },
    SetStatus {
        user_id: UserId,
        status: PresenceStatus,
        origin: Option<ConnectionId>,
    },
    Broadcast(BroadcastEnvelope),
    Direct {
        user_id: UserId,
        envelope: OutboundEnvelope,
    },
    /// Acknowledged once every command queued before it has been applied.
    Barrier(oneshot::Sender<()>),
}

impl HubCommand {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            HubCommand::Register(_) => "register",
            HubCommand::Unregister(_) => "unregister",
            HubCommand::Join { .. } => "join",
            HubCommand::Leave { .. } => "leave",
            HubCommand::SetStatus { .. } => "set-status",
            HubCommand::Broadcast(_) => "broadcast",
            HubCommand::Direct { .. } => "direct",
            HubCommand::Barrier(_) => "barrier",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_user_excludes_origin() {
        // テスト項目: ユーザー発のブロードキャストは送信者自身を除外する
        // given (前提条件):
        let origin = UserId::new(1);

        // when (操作):
        let envelope = BroadcastEnvelope::from_user(
            ChatId::new(10),
            origin,
            OutboundEvent::Typing { is_typing: true },
            1000,
        );

        // then (期待する結果):
        assert_eq!(envelope.exclude, Some(origin));
        assert_eq!(envelope.kind(), "typing");
    }

    #[test]
    fn test_to_outbound_carries_chat_and_origin() {
        // テスト項目: 送信用エンベロープにチャットと送信者が引き継がれる
        // given (前提条件):
        let envelope =
            BroadcastEnvelope::from_user(ChatId::new(10), UserId::new(2), OutboundEvent::UserJoined, 5);

        // when (操作):
        let outbound = envelope.to_outbound();

        // then (期待する結果):
        assert_eq!(outbound.chat_id, Some(ChatId::new(10)));
        assert_eq!(outbound.user_id, Some(UserId::new(2)));
        assert_eq!(outbound.timestamp, 5);
    }
}
