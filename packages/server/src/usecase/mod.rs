//! UseCase 層
//!
//! Hub と外部コラボレーター（MessageProcessor, ChatAccess）を組み合わせた
//! アプリケーションのユースケースを提供する。

mod connect_user;
mod disconnect_user;
mod error;
mod join_chat;
mod mark_read;
mod send_message;

pub use connect_user::ConnectUserUseCase;
pub use disconnect_user::DisconnectUserUseCase;
pub use error::UseCaseError;
pub use join_chat::JoinChatUseCase;
pub use mark_read::MarkReadUseCase;
pub use send_message::SendMessageUseCase;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use tsudoi_shared::time::FixedClock;

    use crate::{
        domain::{ChatId, UserId},
        hub::{Connection, Hub, HubConfig, OutboundQueue},
    };

    pub(crate) const NOW: i64 = 1_700_000_000_000;

    pub(crate) fn spawn_hub() -> Hub {
        let (hub, _handle) = Hub::spawn(&HubConfig::default(), Arc::new(FixedClock::new(NOW)));
        hub
    }

    /// 登録済みでルームに参加したユーザーを作る
    pub(crate) async fn member(
        hub: &Hub,
        user_id: i64,
        chat_id: ChatId,
    ) -> (Arc<Connection>, OutboundQueue) {
        let (connection, queue) = hub.connection(UserId::new(user_id));
        hub.register(connection.clone()).await;
        hub.join_room(UserId::new(user_id), chat_id).await;
        hub.barrier().await;
        (connection, queue)
    }

    pub(crate) fn drain(queue: &mut OutboundQueue) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = queue.try_recv() {
            frames.push(serde_json::from_str(&frame).unwrap());
        }
        frames
    }
}
