//! Shared application state.

use std::sync::Arc;

use crate::{domain::Authenticator, hub::Hub, usecase::ConnectUserUseCase};

use super::pump::{EventDispatcher, PumpConfig};

/// Shared application state
pub struct AppState {
    pub hub: Hub,
    /// Authenticator（トークン検証の抽象化）
    pub authenticator: Arc<dyn Authenticator>,
    /// ConnectUserUseCase（接続登録のユースケース）
    pub connect_user: ConnectUserUseCase,
    /// 受信イベントのディスパッチャ（全接続で共有）
    pub dispatcher: Arc<EventDispatcher>,
    pub pump_config: PumpConfig,
}
