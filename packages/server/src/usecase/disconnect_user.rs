//! UseCase: ユーザー切断処理
//!
//! ### 何をテストしているか
//! - DisconnectUserUseCase::execute() メソッド
//! - 切断時のルームからの除去と offline 通知
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルームに参加中のユーザーの切断
//! - エッジケース：既に置き換えられた古い接続の切断（何も起きない）

use std::sync::Arc;

use crate::hub::{Connection, Hub};

/// ユーザー切断のユースケース
pub struct DisconnectUserUseCase {
    hub: Hub,
}

impl DisconnectUserUseCase {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// 接続を Hub から登録解除する
    ///
    /// 既に別の接続に置き換えられている場合は、この接続を閉じるだけで
    /// レジストリとルームには触れない。
    pub async fn execute(&self, connection: Arc<Connection>) {
        let user_id = connection.user_id();
        let connection_id = connection.id();
        self.hub.unregister(connection).await;
        tracing::debug!(%user_id, %connection_id, "user disconnected");
    }
}
