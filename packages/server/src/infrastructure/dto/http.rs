//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};
use tsudoi_shared::time::timestamp_to_rfc3339;

use crate::{
    domain::{ChatId, UserId},
    hub::{MetricsSnapshot, PresenceSnapshot},
};

/// `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub connected: usize,
    pub uptime_secs: u64,
}

/// `GET /api/online`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUsersDto {
    pub users: Vec<i64>,
    pub count: usize,
}

impl OnlineUsersDto {
    pub fn new(users: &[UserId]) -> Self {
        Self {
            users: users.iter().map(|u| u.value()).collect(),
            count: users.len(),
        }
    }
}

/// `GET /api/users/{user_id}/presence`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPresenceDto {
    pub user_id: i64,
    pub status: String,
    pub rooms: Vec<i64>,
    /// RFC 3339 (UTC)
    pub connected_at: String,
    /// RFC 3339 (UTC)
    pub last_activity: String,
}

impl From<&PresenceSnapshot> for UserPresenceDto {
    fn from(snapshot: &PresenceSnapshot) -> Self {
        Self {
            user_id: snapshot.user_id.value(),
            status: snapshot.status.as_str().to_string(),
            rooms: snapshot.rooms.iter().map(|c| c.value()).collect(),
            connected_at: timestamp_to_rfc3339(snapshot.connected_at),
            last_activity: timestamp_to_rfc3339(snapshot.last_activity),
        }
    }
}

/// `GET /api/chats/{chat_id}/users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUsersDto {
    pub chat_id: i64,
    pub users: Vec<i64>,
    pub count: usize,
}

impl ChatUsersDto {
    pub fn new(chat_id: ChatId, users: &[UserId]) -> Self {
        Self {
            chat_id: chat_id.value(),
            users: users.iter().map(|u| u.value()).collect(),
            count: users.len(),
        }
    }
}

/// `GET /api/metrics`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsDto {
    pub connected: usize,
    pub rooms: usize,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub connections_dropped: u64,
    pub connections_total: u64,
    /// RFC 3339 (UTC)
    pub started_at: String,
    pub uptime_secs: u64,
}

impl From<&MetricsSnapshot> for MetricsDto {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            connected: snapshot.connected,
            rooms: snapshot.rooms,
            messages_sent: snapshot.messages_sent,
            messages_received: snapshot.messages_received,
            connections_dropped: snapshot.connections_dropped,
            connections_total: snapshot.connections_total,
            started_at: timestamp_to_rfc3339(snapshot.started_at),
            uptime_secs: snapshot.uptime_secs,
        }
    }
}
