//! In-memory ChatAccess implementation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{ChatAccess, ChatId, UserId};

/// Grants per chat. Chats without any grant are open only when
/// `allow_unlisted` is set.
#[derive(Debug, Default)]
pub struct InMemoryChatAccess {
    grants: RwLock<HashMap<ChatId, HashSet<UserId>>>,
    allow_unlisted: bool,
}

impl InMemoryChatAccess {
    pub fn new(allow_unlisted: bool) -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
            allow_unlisted,
        }
    }

    /// Restrict `chat_id` to granted users and grant `user_id`.
    pub fn grant(&self, chat_id: ChatId, user_id: UserId) {
        self.grants.write().entry(chat_id).or_default().insert(user_id);
    }

    pub fn revoke(&self, chat_id: ChatId, user_id: UserId) {
        if let Some(users) = self.grants.write().get_mut(&chat_id) {
            users.remove(&user_id);
        }
    }
}

#[async_trait]
impl ChatAccess for InMemoryChatAccess {
    async fn can_join(&self, user_id: UserId, chat_id: ChatId) -> bool {
        match self.grants.read().get(&chat_id) {
            Some(users) => users.contains(&user_id),
            None => self.allow_unlisted,
        }
    }
}
