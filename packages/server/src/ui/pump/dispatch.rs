//! Routing of decoded inbound events.

use std::sync::Arc;

use crate::{
    domain::{
        ChatAccess, InboundEvent, MessageProcessor, OutboundEnvelope, ProtocolError, StampedEvent,
    },
    hub::{Connection, Hub},
    infrastructure::dto::conversion::decode_inbound,
    usecase::{
        DisconnectUserUseCase, JoinChatUseCase, MarkReadUseCase, SendMessageUseCase, UseCaseError,
    },
};

/// Decodes inbound frames and routes each event to the hub or a use case.
///
/// Every failure is answered with an `error` envelope to the sender only.
pub struct EventDispatcher {
    hub: Hub,
    join_chat: JoinChatUseCase,
    send_message: SendMessageUseCase,
    mark_read: MarkReadUseCase,
    disconnect_user: DisconnectUserUseCase,
}

impl EventDispatcher {
    pub fn new(
        hub: Hub,
        access: Arc<dyn ChatAccess>,
        processor: Arc<dyn MessageProcessor>,
    ) -> Self {
        Self {
            join_chat: JoinChatUseCase::new(hub.clone(), access),
            send_message: SendMessageUseCase::new(hub.clone(), processor.clone()),
            mark_read: MarkReadUseCase::new(hub.clone(), processor),
            disconnect_user: DisconnectUserUseCase::new(hub.clone()),
            hub,
        }
    }

    pub fn now(&self) -> i64 {
        self.hub.now()
    }

    /// Decode one text frame received on `connection` and dispatch it.
    pub async fn handle_text(&self, connection: &Connection, text: &str) {
        match decode_inbound(text) {
            Ok(event) => {
                self.hub.record_received();
                let stamped = StampedEvent {
                    sender: connection.user_id(),
                    connection_id: connection.id(),
                    received_at: self.now(),
                    event,
                };
                self.dispatch(stamped).await;
            }
            Err(e) => self.reject(connection, &e).await,
        }
    }

    /// Route one event. Events from a connection that has been superseded
    /// are dropped without a reply.
    pub async fn dispatch(&self, stamped: StampedEvent) {
        let StampedEvent {
            sender,
            connection_id,
            received_at,
            event,
        } = stamped;
        let kind = event.kind();
        let chat_id = event.chat_id();
        if !self.hub.is_current(sender, connection_id) {
            tracing::debug!(%sender, %connection_id, kind, "event from stale connection dropped");
            return;
        }
        tracing::debug!(%sender, kind, received_at, "inbound event");

        let result = match event {
            InboundEvent::Typing { chat_id, is_typing } => {
                if self.hub.is_member(chat_id, sender) {
                    self.hub.typing(sender, chat_id, is_typing).await;
                    Ok(())
                } else {
                    Err(UseCaseError::NotMember(chat_id))
                }
            }
            InboundEvent::Join { chat_id } => {
                self.join_chat.join(sender, connection_id, chat_id).await
            }
            InboundEvent::Leave { chat_id } => {
                self.join_chat.leave(sender, connection_id, chat_id).await;
                Ok(())
            }
            InboundEvent::ReadReceipt {
                chat_id,
                message_id,
            } => self
                .mark_read
                .execute(sender, chat_id, message_id)
                .await
                .map(|_| ()),
            InboundEvent::NewMessage { chat_id, content } => self
                .send_message
                .execute(sender, chat_id, content)
                .await
                .map(|_| ()),
            InboundEvent::Status { status } => {
                self.hub.set_status_from(connection_id, sender, status).await;
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::info!(%sender, kind, "event rejected: {}", e);
            let envelope = OutboundEnvelope::error(e.code(), e.to_string(), chat_id, self.now());
            self.hub.send_direct(sender, envelope).await;
        }
    }

    /// Answer a protocol error on `connection`, unless it has been superseded.
    pub async fn reject(&self, connection: &Connection, error: &ProtocolError) {
        let sender = connection.user_id();
        tracing::warn!(%sender, fatal = error.is_fatal(), "protocol error: {}", error);
        if !self.hub.is_current(sender, connection.id()) {
            return;
        }
        let envelope = OutboundEnvelope::error(error.code(), error.to_string(), None, self.now());
        self.hub.send_direct(sender, envelope).await;
    }

    /// Unregister `connection` once its read pump has stopped.
    pub async fn disconnect(&self, connection: Arc<Connection>) {
        self.disconnect_user.execute(connection).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatId, MockChatAccess, MockMessageProcessor, PresenceStatus, UserId},
        hub::OutboundQueue,
        usecase::test_support::{drain, member, spawn_hub},
    };

    const CHAT: ChatId = ChatId::new(10);

    fn dispatcher(hub: &Hub, allow_join: bool) -> EventDispatcher {
        let mut access = MockChatAccess::new();
        access.expect_can_join().return_const(allow_join);
        EventDispatcher::new(hub.clone(), Arc::new(access), Arc::new(MockMessageProcessor::new()))
    }

    async fn connect(hub: &Hub, user_id: i64) -> (Arc<Connection>, OutboundQueue) {
        let (connection, queue) = hub.connection(UserId::new(user_id));
        hub.register(connection.clone()).await;
        (connection, queue)
    }

    fn stamped(connection: &Connection, event: InboundEvent) -> StampedEvent {
        StampedEvent {
            sender: connection.user_id(),
            connection_id: connection.id(),
            received_at: 0,
            event,
        }
    }

    #[tokio::test]
    async fn test_denied_join_answers_forbidden() {
        // テスト項目: 参加を拒否されると送信者にだけ forbidden が返る
        // given (前提条件):
        let hub = spawn_hub();
        let (bob, mut bob_queue) = connect(&hub, 2).await;
        let dispatcher = dispatcher(&hub, false);

        // when (操作):
        dispatcher
            .dispatch(stamped(&bob, InboundEvent::Join { chat_id: CHAT }))
            .await;
        hub.barrier().await;

        // then (期待する結果):
        assert!(!hub.is_member(CHAT, UserId::new(2)));
        let frames = drain(&mut bob_queue);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "error");
        assert_eq!(frames[0]["chat_id"], 10);
        assert_eq!(frames[0]["data"]["code"], "forbidden");
    }

    #[tokio::test]
    async fn test_typing_outside_room_answers_forbidden() {
        // テスト項目: 参加していないルームへの入力中通知は forbidden になり配信されない
        // given (前提条件):
        let hub = spawn_hub();
        let (_alice, mut alice_queue) = member(&hub, 1, CHAT).await;
        let (bob, mut bob_queue) = connect(&hub, 2).await;
        let dispatcher = dispatcher(&hub, true);

        // when (操作):
        dispatcher
            .dispatch(stamped(
                &bob,
                InboundEvent::Typing {
                    chat_id: CHAT,
                    is_typing: true,
                },
            ))
            .await;
        hub.barrier().await;

        // then (期待する結果):
        assert!(drain(&mut alice_queue).is_empty());
        let frames = drain(&mut bob_queue);
        assert_eq!(frames[0]["data"]["code"], "forbidden");
    }

    #[tokio::test]
    async fn test_status_is_broadcast_as_presence() {
        // テスト項目: ステータス変更が同じルームのメンバーに presence として届く
        // given (前提条件):
        let hub = spawn_hub();
        let (_alice, mut alice_queue) = member(&hub, 1, CHAT).await;
        let (bob, _bob_queue) = member(&hub, 2, CHAT).await;
        drain(&mut alice_queue);
        let dispatcher = dispatcher(&hub, true);

        // when (操作):
        dispatcher
            .dispatch(stamped(
                &bob,
                InboundEvent::Status {
                    status: PresenceStatus::Busy,
                },
            ))
            .await;
        hub.barrier().await;

        // then (期待する結果):
        let frames = drain(&mut alice_queue);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "presence");
        assert_eq!(frames[0]["data"]["status"], "busy");
    }

    #[tokio::test]
    async fn test_handle_text_counts_decoded_frames_only() {
        // テスト項目: デコードできたフレームだけが受信数に数えられる
        // given (前提条件):
        let hub = spawn_hub();
        let (bob, mut bob_queue) = connect(&hub, 2).await;
        let dispatcher = dispatcher(&hub, true);

        // when (操作):
        dispatcher
            .handle_text(&bob, r#"{"type":"join","chat_id":10}"#)
            .await;
        dispatcher.handle_text(&bob, "not json").await;
        hub.barrier().await;

        // then (期待する結果):
        assert_eq!(hub.metrics().messages_received, 1);
        assert!(hub.is_member(CHAT, UserId::new(2)));
        let frames = drain(&mut bob_queue);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["data"]["code"], "malformed_frame");
    }

    #[tokio::test]
    async fn test_events_from_superseded_connection_are_dropped() {
        // テスト項目: 置き換えられた古い接続の受信フレームは、新しい接続にもルームにも影響しない
        // given (前提条件):
        let hub = spawn_hub();
        let (_alice, mut alice_queue) = member(&hub, 1, CHAT).await;
        let (old, _old_queue) = connect(&hub, 2).await;
        let (current, mut current_queue) = connect(&hub, 2).await;
        let dispatcher = dispatcher(&hub, true);

        // when (操作):
        dispatcher
            .handle_text(&old, r#"{"type":"join","chat_id":10}"#)
            .await;
        dispatcher
            .handle_text(&old, r#"{"type":"status","data":{"status":"away"}}"#)
            .await;
        dispatcher.handle_text(&old, "not json").await;
        hub.barrier().await;

        // then (期待する結果):
        assert!(!hub.is_member(CHAT, UserId::new(2)));
        assert_eq!(current.status(), PresenceStatus::Online);
        assert!(drain(&mut alice_queue).is_empty());
        assert!(drain(&mut current_queue).is_empty());
    }
}
