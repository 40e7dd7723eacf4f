//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use futures_util::stream::StreamExt;
use serde::Deserialize;

use crate::{
    domain::UserId,
    ui::{
        pump::{run_read_pump, run_write_pump},
        state::AppState,
    },
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    if state.hub.is_shut_down() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    // The query parameter wins over the Authorization header
    let token = query
        .token
        .or_else(|| bearer_token(&headers))
        .unwrap_or_default();
    let user_id = match state.authenticator.authenticate(&token).await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!("Rejected WebSocket upgrade: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // Frames above max_frame_bytes are rejected by the read pump with an error
    // envelope; the transport only drops what is far beyond that.
    let transport_limit = state.pump_config.max_frame_bytes.saturating_mul(2);
    Ok(ws
        .max_message_size(transport_limit)
        .max_frame_size(transport_limit)
        .on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    // 1. Hub に登録（connected は登録の直後にキューへ積まれる）
    let (connection, queue) = state.connect_user.execute(user_id).await;
    tracing::info!(%user_id, connection_id = %connection.id(), "WebSocket connected");

    // 2. 書き込みポンプを別タスクで起動
    let (sink, stream) = socket.split();
    let write_task = tokio::spawn(run_write_pump(
        sink,
        queue,
        connection.clone(),
        state.pump_config.clone(),
    ));

    // 3. 読み取りポンプ（終了時に必ず登録解除する）
    run_read_pump(
        stream,
        connection.clone(),
        state.dispatcher.clone(),
        state.pump_config.clone(),
    )
    .await;

    if let Err(e) = write_task.await {
        tracing::error!(%user_id, "write pump panicked: {}", e);
    }
    tracing::info!(%user_id, connection_id = %connection.id(), "WebSocket disconnected");
}
