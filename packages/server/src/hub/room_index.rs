//! Room membership index.
//!
//! Maps a chat to the set of users currently joined to it. The index is owned
//! by the hub's control loop and has no locking of its own. A chat appears in
//! the index if and only if it has at least one member.

use std::collections::{HashMap, HashSet};

use crate::domain::{ChatId, UserId};

#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: HashMap<ChatId, HashSet<UserId>>,
}

impl RoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user_id` to `chat_id`. Returns `false` if it was already a member.
    pub fn add_member(&mut self, chat_id: ChatId, user_id: UserId) -> bool {
        self.rooms.entry(chat_id).or_default().insert(user_id)
    }

    /// Remove `user_id` from `chat_id`, deleting the room once it is empty.
    /// Returns `false` if it was not a member.
    pub fn remove_member(&mut self, chat_id: ChatId, user_id: UserId) -> bool {
        let Some(members) = self.rooms.get_mut(&chat_id) else {
            return false;
        };
        let removed = members.remove(&user_id);
        if members.is_empty() {
            self.rooms.remove(&chat_id);
        }
        removed
    }

    /// Members of `chat_id` in ascending order; empty for unknown rooms.
    pub fn members(&self, chat_id: ChatId) -> Vec<UserId> {
        let mut members: Vec<UserId> = self
            .rooms
            .get(&chat_id)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn is_member(&self, chat_id: ChatId, user_id: UserId) -> bool {
        self.rooms
            .get(&chat_id)
            .is_some_and(|members| members.contains(&user_id))
    }

    pub fn member_count(&self, chat_id: ChatId) -> usize {
        self.rooms.get(&chat_id).map_or(0, HashSet::len)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains_room(&self, chat_id: ChatId) -> bool {
        self.rooms.contains_key(&chat_id)
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: ChatId = ChatId::new(10);

    #[test]
    fn test_add_member_is_idempotent() {
        // テスト項目: 同じユーザーを二度追加してもメンバー数は変わらない
        // given (前提条件):
        let mut index = RoomIndex::new();
        let alice = UserId::new(1);

        // when (操作):
        let first = index.add_member(CHAT, alice);
        let second = index.add_member(CHAT, alice);

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(index.member_count(CHAT), 1);
    }

    #[test]
    fn test_last_member_leaving_deletes_room() {
        // テスト項目: 最後のメンバーが抜けるとルーム自体が削除される
        // given (前提条件):
        let mut index = RoomIndex::new();
        let alice = UserId::new(1);
        let bob = UserId::new(2);
        index.add_member(CHAT, alice);
        index.add_member(CHAT, bob);

        // when (操作):
        index.remove_member(CHAT, alice);
        let still_there = index.contains_room(CHAT);
        index.remove_member(CHAT, bob);

        // then (期待する結果):
        assert!(still_there);
        assert!(!index.contains_room(CHAT));
        assert_eq!(index.room_count(), 0);
        assert!(index.members(CHAT).is_empty());
    }

    #[test]
    fn test_remove_non_member_is_noop() {
        // テスト項目: メンバーでないユーザーの削除は何もしない
        // given (前提条件):
        let mut index = RoomIndex::new();
        index.add_member(CHAT, UserId::new(1));

        // when (操作):
        let removed_from_room = index.remove_member(CHAT, UserId::new(2));
        let removed_from_unknown = index.remove_member(ChatId::new(99), UserId::new(1));

        // then (期待する結果):
        assert!(!removed_from_room);
        assert!(!removed_from_unknown);
        assert_eq!(index.member_count(CHAT), 1);
        assert!(!index.contains_room(ChatId::new(99)));
    }

    #[test]
    fn test_members_are_sorted() {
        // テスト項目: メンバー一覧はユーザー ID の昇順で返される
        // given (前提条件):
        let mut index = RoomIndex::new();
        for id in [3, 1, 2] {
            index.add_member(CHAT, UserId::new(id));
        }

        // when (操作):
        let members = index.members(CHAT);

        // then (期待する結果):
        assert_eq!(members, vec![UserId::new(1), UserId::new(2), UserId::new(3)]);
        assert!(index.is_member(CHAT, UserId::new(2)));
        assert!(!index.is_member(CHAT, UserId::new(4)));
    }
}
