//! UseCase: ユーザー接続処理
//!
//! ### 何をテストしているか
//! - ConnectUserUseCase::execute() メソッド
//! - 接続の登録と `connected` の通知
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規ユーザーの接続
//! - エッジケース：同じユーザーの再接続（古い接続の置き換え）

use std::sync::Arc;

use crate::{
    domain::{OutboundEnvelope, OutboundEvent, UserId},
    hub::{Connection, Hub, OutboundQueue},
};

/// ユーザー接続のユースケース
pub struct ConnectUserUseCase {
    hub: Hub,
}

impl ConnectUserUseCase {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// 認証済みユーザーの接続を作成して Hub に登録する
    ///
    /// # Returns
    ///
    /// 登録した接続と、書き込みポンプが読み出す送信キュー
    pub async fn execute(&self, user_id: UserId) -> (Arc<Connection>, OutboundQueue) {
        // 1. 接続を作成して登録（既存の接続があれば置き換えられる）
        let (connection, queue) = self.hub.connection(user_id);
        self.hub.register(connection.clone()).await;

        // 2. 本人にだけ `connected` を送る（登録の後に順序付けられる）
        let welcome = OutboundEnvelope::new(OutboundEvent::Connected, self.hub.now()).about(user_id);
        self.hub.send_direct(user_id, welcome).await;

        tracing::debug!(%user_id, connection_id = %connection.id(), "user connected");
        (connection, queue)
    }
}
