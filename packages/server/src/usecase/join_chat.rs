//! UseCase: チャットルームへの参加・退出
//!
//! ### 何をテストしているか
//! - JoinChatUseCase::join() / leave() メソッド
//! - ChatAccess による参加可否の判定
//!
//! ### どのような状況を想定しているか
//! - 正常系：許可されたルームへの参加と退出
//! - 異常系：参加を拒否されたルーム（Hub の状態は変わらない）

use std::sync::Arc;

use crate::{
    domain::{ChatAccess, ChatId, ConnectionId, UserId},
    hub::Hub,
};

use super::error::UseCaseError;

/// ルーム参加・退出のユースケース
pub struct JoinChatUseCase {
    hub: Hub,
    access: Arc<dyn ChatAccess>,
}

impl JoinChatUseCase {
    pub fn new(hub: Hub, access: Arc<dyn ChatAccess>) -> Self {
        Self { hub, access }
    }

    /// ルームに参加する
    ///
    /// 戻った時点で参加は Hub に反映済みで、直後の同じユーザーからの
    /// メッセージは参加後の状態で処理される。`origin` がすでに置き換えられた
    /// 接続であれば Hub は何もしない。
    pub async fn join(
        &self,
        user_id: UserId,
        origin: ConnectionId,
        chat_id: ChatId,
    ) -> Result<(), UseCaseError> {
        // 1. 参加可否の確認
        if !self.access.can_join(user_id, chat_id).await {
            tracing::info!(%user_id, %chat_id, "join denied");
            return Err(UseCaseError::AccessDenied(chat_id));
        }

        // 2. 参加して反映を待つ
        self.hub.join_room_from(origin, user_id, chat_id).await;
        self.hub.barrier().await;
        Ok(())
    }

    /// ルームから退出する。参加していなければ何も起きない。
    pub async fn leave(&self, user_id: UserId, origin: ConnectionId, chat_id: ChatId) {
        self.hub.leave_room_from(origin, user_id, chat_id).await;
        self.hub.barrier().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::MockChatAccess,
        usecase::test_support::{drain, member, spawn_hub},
    };
    use mockall::predicate::eq;

    const CHAT: ChatId = ChatId::new(12);

    #[tokio::test]
    async fn test_join_allowed_chat() {
        // テスト項目: 許可されたルームに参加でき、既存メンバーに通知される
        // given (前提条件):
        let hub = spawn_hub();
        let (_alice, mut alice_queue) = member(&hub, 1, CHAT).await;
        let (bob, _bob_queue) = {
            let (connection, queue) = hub.connection(UserId::new(2));
            hub.register(connection.clone()).await;
            (connection, queue)
        };
        let mut access = MockChatAccess::new();
        access
            .expect_can_join()
            .with(eq(UserId::new(2)), eq(CHAT))
            .times(1)
            .return_const(true);
        let usecase = JoinChatUseCase::new(hub.clone(), Arc::new(access));

        // when (操作):
        let result = usecase.join(UserId::new(2), bob.id(), CHAT).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert!(hub.is_member(CHAT, UserId::new(2)));
        let frames = drain(&mut alice_queue);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "user-joined");
    }

    #[tokio::test]
    async fn test_join_denied_chat() {
        // テスト項目: 拒否されたルームには参加できず、AccessDenied が返る
        // given (前提条件):
        let hub = spawn_hub();
        let (connection, _queue) = hub.connection(UserId::new(2));
        hub.register(connection.clone()).await;
        let mut access = MockChatAccess::new();
        access.expect_can_join().return_const(false);
        let usecase = JoinChatUseCase::new(hub.clone(), Arc::new(access));

        // when (操作):
        let result = usecase.join(UserId::new(2), connection.id(), CHAT).await;

        // then (期待する結果):
        assert_eq!(result, Err(UseCaseError::AccessDenied(CHAT)));
        assert!(!hub.is_member(CHAT, UserId::new(2)));
        assert!(hub.room_users(CHAT).is_empty());
    }

    #[tokio::test]
    async fn test_leave_removes_membership() {
        // テスト項目: 退出するとメンバーから外れ、二度目の退出は何も起こさない
        // given (前提条件):
        let hub = spawn_hub();
        let (alice, _alice_queue) = member(&hub, 1, CHAT).await;
        let usecase = JoinChatUseCase::new(hub.clone(), Arc::new(MockChatAccess::new()));

        // when (操作):
        usecase.leave(UserId::new(1), alice.id(), CHAT).await;
        usecase.leave(UserId::new(1), alice.id(), CHAT).await;

        // then (期待する結果):
        assert!(!hub.is_member(CHAT, UserId::new(1)));
        assert!(hub.user_rooms(UserId::new(1)).is_empty());
    }

    #[tokio::test]
    async fn test_join_from_superseded_connection_is_ignored() {
        // テスト項目: 再接続で置き換えられた古い接続からの参加は新しい接続に反映されない
        // given (前提条件):
        let hub = spawn_hub();
        let (_alice, mut alice_queue) = member(&hub, 1, CHAT).await;
        let (old, _old_queue) = hub.connection(UserId::new(2));
        hub.register(old.clone()).await;
        let (current, _current_queue) = hub.connection(UserId::new(2));
        hub.register(current.clone()).await;
        let mut access = MockChatAccess::new();
        access.expect_can_join().return_const(true);
        let usecase = JoinChatUseCase::new(hub.clone(), Arc::new(access));

        // when (操作):
        let result = usecase.join(UserId::new(2), old.id(), CHAT).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert!(!hub.is_member(CHAT, UserId::new(2)));
        assert!(current.rooms().is_empty());
        assert!(drain(&mut alice_queue).is_empty());
    }
}
