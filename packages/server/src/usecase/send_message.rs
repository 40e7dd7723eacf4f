//! UseCase: メッセージ送信処理
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - メッセージの永続化とルームへのブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - 送信者以外のメンバーにだけメッセージが届くことを保証
//! - ルームに参加していないユーザーのメッセージが永続化されないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージ送信とブロードキャスト
//! - 異常系：未参加のルームへの送信、MessageProcessor による拒否

use std::sync::Arc;

use crate::{
    domain::{ChatId, MessageProcessor, NewMessage, OutboundEvent, PersistedMessage, UserId},
    hub::{BroadcastEnvelope, Hub},
};

use super::error::UseCaseError;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    hub: Hub,
    /// MessageProcessor（永続化とビジネスルールの抽象化）
    processor: Arc<dyn MessageProcessor>,
}

impl SendMessageUseCase {
    pub fn new(hub: Hub, processor: Arc<dyn MessageProcessor>) -> Self {
        Self { hub, processor }
    }

    /// メッセージ送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok(PersistedMessage)` - 永続化されたメッセージ
    /// * `Err(UseCaseError)` - 未参加、または MessageProcessor が拒否した
    pub async fn execute(
        &self,
        sender: UserId,
        chat_id: ChatId,
        content: String,
    ) -> Result<PersistedMessage, UseCaseError> {
        // 1. 送信者がルームのメンバーか確認
        if !self.hub.is_member(chat_id, sender) {
            return Err(UseCaseError::NotMember(chat_id));
        }

        // 2. MessageProcessor で永続化
        let message = self
            .processor
            .create_message(sender, chat_id, NewMessage { content })
            .await?;

        // 3. 送信者以外のメンバーにブロードキャスト
        let envelope = BroadcastEnvelope::from_user(
            chat_id,
            sender,
            OutboundEvent::NewMessage(message.clone()),
            self.hub.now(),
        );
        self.hub.broadcast(envelope).await;

        tracing::debug!(%sender, %chat_id, message_id = %message.id, "message sent");
        Ok(message)
    }
}
