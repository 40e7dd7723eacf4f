//! HTTP API endpoint handlers.
//!
//! Read-only views over the hub; none of them go through the control loop.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{ChatId, UserId},
    infrastructure::dto::http::{
        ChatUsersDto, HealthDto, MetricsDto, OnlineUsersDto, UserPresenceDto,
    },
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    let metrics = state.hub.cached_metrics();
    Json(HealthDto {
        status: "ok".to_string(),
        connected: state.hub.connected_users().len(),
        uptime_secs: metrics.uptime_secs,
    })
}

/// Users with a live connection
pub async fn online_users(State(state): State<Arc<AppState>>) -> Json<OnlineUsersDto> {
    Json(OnlineUsersDto::new(&state.hub.connected_users()))
}

/// Presence of one user; 404 while the user is offline
pub async fn user_presence(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserPresenceDto>, StatusCode> {
    state
        .hub
        .presence(UserId::new(user_id))
        .map(|snapshot| Json(UserPresenceDto::from(&snapshot)))
        .ok_or(StatusCode::NOT_FOUND)
}

/// Members of a chat room (empty when nobody has joined)
pub async fn chat_users(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
) -> Json<ChatUsersDto> {
    let chat_id = ChatId::new(chat_id);
    Json(ChatUsersDto::new(chat_id, &state.hub.room_users(chat_id)))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsDto> {
    Json(MetricsDto::from(&state.hub.metrics()))
}
