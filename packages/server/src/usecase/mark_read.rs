//! UseCase: 既読通知

use std::sync::Arc;

use crate::{
    domain::{ChatId, MessageId, MessageProcessor, OutboundEvent, ReadReceipt, ReadReceiptRecord, UserId},
    hub::{BroadcastEnvelope, Hub},
};

use super::error::UseCaseError;

/// 既読通知のユースケース
pub struct MarkReadUseCase {
    hub: Hub,
    processor: Arc<dyn MessageProcessor>,
}

impl MarkReadUseCase {
    pub fn new(hub: Hub, processor: Arc<dyn MessageProcessor>) -> Self {
        Self { hub, processor }
    }

    /// 既読を記録し、送信者以外のメンバーに通知する
    pub async fn execute(
        &self,
        reader: UserId,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<ReadReceiptRecord, UseCaseError> {
        if !self.hub.is_member(chat_id, reader) {
            return Err(UseCaseError::NotMember(chat_id));
        }

        let record = self
            .processor
            .mark_read(reader, chat_id, ReadReceipt { message_id })
            .await?;

        let envelope = BroadcastEnvelope::from_user(
            chat_id,
            reader,
            OutboundEvent::ReadReceipt(record),
            self.hub.now(),
        );
        self.hub.broadcast(envelope).await;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MockMessageProcessor, ProcessError},
        usecase::test_support::{NOW, drain, member, spawn_hub},
    };

    const CHAT: ChatId = ChatId::new(8);

    #[tokio::test]
    async fn test_execute_notifies_other_members() {
        // テスト項目: 既読が記録され、送信者以外のメンバーに read-receipt が届く
        // given (前提条件):
        let hub = spawn_hub();
        let (_alice, mut alice_queue) = member(&hub, 1, CHAT).await;
        let (_bob, mut bob_queue) = member(&hub, 2, CHAT).await;
        drain(&mut alice_queue);
        let mut processor = MockMessageProcessor::new();
        processor
            .expect_mark_read()
            .times(1)
            .returning(|reader, chat_id, receipt| {
                Ok(ReadReceiptRecord {
                    message_id: receipt.message_id,
                    chat_id,
                    reader,
                    read_at: NOW,
                })
            });
        let usecase = MarkReadUseCase::new(hub.clone(), Arc::new(processor));

        // when (操作):
        let result = usecase.execute(UserId::new(2), CHAT, MessageId::new(9)).await;
        hub.barrier().await;

        // then (期待する結果):
        assert_eq!(result.map(|r| r.message_id), Ok(MessageId::new(9)));
        assert!(drain(&mut bob_queue).is_empty());
        let frames = drain(&mut alice_queue);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "read-receipt");
        assert_eq!(frames[0]["user_id"], 2);
        assert_eq!(frames[0]["data"]["message_id"], 9);
    }

    #[tokio::test]
    async fn test_execute_unknown_message() {
        // テスト項目: 存在しないメッセージへの既読は NotFound になる
        // given (前提条件):
        let hub = spawn_hub();
        let (_alice, _alice_queue) = member(&hub, 1, CHAT).await;
        let mut processor = MockMessageProcessor::new();
        processor
            .expect_mark_read()
            .returning(|_, _, _| Err(ProcessError::NotFound("message 9".to_string())));
        let usecase = MarkReadUseCase::new(hub.clone(), Arc::new(processor));

        // when (操作):
        let result = usecase.execute(UserId::new(1), CHAT, MessageId::new(9)).await;

        // then (期待する結果):
        assert_eq!(result.map_err(|e| e.code()), Err(crate::domain::ErrorCode::NotFound));
    }
}
