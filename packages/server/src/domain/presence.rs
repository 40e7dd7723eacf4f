//! Presence status of a connected user.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status advertised to the members of every chat a user has joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    Online,
    Away,
    Busy,
    Offline,
}

impl PresenceStatus {
    /// Whether a client may set this status on its own connection.
    ///
    /// `Offline` is reserved for the hub, which emits it on unregistration.
    pub fn is_client_settable(&self) -> bool {
        !matches!(self, PresenceStatus::Offline)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Away => "away",
            PresenceStatus::Busy => "busy",
            PresenceStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_is_not_client_settable() {
        // テスト項目: offline はクライアントから設定できない
        // given (前提条件):
        let statuses = [
            PresenceStatus::Online,
            PresenceStatus::Away,
            PresenceStatus::Busy,
        ];

        // when (操作):
        let settable: Vec<bool> = statuses.iter().map(|s| s.is_client_settable()).collect();

        // then (期待する結果):
        assert_eq!(settable, vec![true, true, true]);
        assert!(!PresenceStatus::Offline.is_client_settable());
    }

    #[test]
    fn test_status_uses_lowercase_wire_names() {
        // テスト項目: ステータスが小文字の名前でシリアライズされる
        // given (前提条件):
        let status = PresenceStatus::Busy;

        // when (操作):
        let json = serde_json::to_string(&status).unwrap();

        // then (期待する結果):
        assert_eq!(json, "\"busy\"");
        assert_eq!(status.to_string(), "busy");
    }
}
