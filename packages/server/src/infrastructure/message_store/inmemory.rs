//! InMemory MessageProcessor 実装
//!
//! ドメイン層が定義する MessageProcessor trait の具体的な実装。
//! メッセージと既読を HashMap に保持します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use tsudoi_shared::time::Clock;

use crate::domain::{
    ChatId, MessageId, MessageProcessor, NewMessage, PersistedMessage, ProcessError, ReadReceipt,
    ReadReceiptRecord, UserId,
};

/// Longest accepted message content, in characters.
pub const MAX_CONTENT_CHARS: usize = 4000;

#[derive(Default)]
struct Store {
    next_id: i64,
    messages: HashMap<MessageId, PersistedMessage>,
    receipts: HashMap<(MessageId, UserId), ReadReceiptRecord>,
}

/// インメモリのメッセージストア
pub struct InMemoryMessageStore {
    store: Mutex<Store>,
    clock: Arc<dyn Clock>,
}

impl InMemoryMessageStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            clock,
        }
    }

    /// Messages of `chat_id` in creation order.
    pub fn history(&self, chat_id: ChatId) -> Vec<PersistedMessage> {
        let store = self.store.lock();
        let mut messages: Vec<PersistedMessage> = store
            .messages
            .values()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.id);
        messages
    }
}

#[async_trait]
impl MessageProcessor for InMemoryMessageStore {
    async fn create_message(
        &self,
        sender: UserId,
        chat_id: ChatId,
        request: NewMessage,
    ) -> Result<PersistedMessage, ProcessError> {
        let content = request.content.trim();
        if content.is_empty() {
            return Err(ProcessError::Validation("message content is empty".to_string()));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(ProcessError::Validation(format!(
                "message content exceeds {MAX_CONTENT_CHARS} characters"
            )));
        }

        let mut store = self.store.lock();
        store.next_id += 1;
        let message = PersistedMessage {
            id: MessageId::new(store.next_id),
            chat_id,
            sender,
            content: content.to_string(),
            created_at: self.clock.now_millis(),
        };
        store.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn mark_read(
        &self,
        reader: UserId,
        chat_id: ChatId,
        receipt: ReadReceipt,
    ) -> Result<ReadReceiptRecord, ProcessError> {
        let mut store = self.store.lock();
        let in_chat = store
            .messages
            .get(&receipt.message_id)
            .is_some_and(|m| m.chat_id == chat_id);
        if !in_chat {
            return Err(ProcessError::NotFound(format!(
                "message {} in chat {}",
                receipt.message_id, chat_id
            )));
        }

        let read_at = self.clock.now_millis();
        let record = store
            .receipts
            .entry((receipt.message_id, reader))
            .or_insert(ReadReceiptRecord {
                message_id: receipt.message_id,
                chat_id,
                reader,
                read_at,
            });
        Ok(*record)
    }
}
