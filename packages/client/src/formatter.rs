//! Message formatting utilities for client display.

use serde_json::Value;
use tsudoi_shared::time::timestamp_to_clock_label;

use crate::envelope::ServerEnvelope;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format an envelope pushed by the hub.
    ///
    /// `me` is the user id announced by the `connected` envelope, used to mark
    /// the user's own events.
    pub fn format_envelope(envelope: &ServerEnvelope, me: Option<i64>) -> String {
        let at = timestamp_to_clock_label(envelope.timestamp);
        let who = Self::user_label(envelope.user_id, me);
        let chat = envelope.chat_id;

        match envelope.kind.as_str() {
            "connected" => format!("\nConnected as {} at {}\n", who, at),
            "user-joined" => format!("\n+ {} joined chat {} at {}\n", who, chat, at),
            "user-left" => format!("\n- {} left chat {} at {}\n", who, chat, at),
            "presence" => {
                let status = Self::str_field(envelope, "status").unwrap_or("unknown");
                format!("\n* {} is {} (chat {}, {})\n", who, status, chat, at)
            }
            "typing" => {
                let is_typing = envelope
                    .field("is_typing")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                let verb = if is_typing { "is typing" } else { "stopped typing" };
                format!("\n… {} {} in chat {}\n", who, verb, chat)
            }
            "new-message" => Self::format_chat_message(envelope, &who),
            "read-receipt" => {
                let message_id = envelope.field("message_id").and_then(Value::as_i64);
                match message_id {
                    Some(id) => format!("\n✓ {} read #{} in chat {} at {}\n", who, id, chat, at),
                    None => Self::format_raw_message(&envelope.data.to_string()),
                }
            }
            "error" => {
                let code = Self::str_field(envelope, "code").unwrap_or("error");
                let message = Self::str_field(envelope, "message").unwrap_or_default();
                format!("\n! [{}] {}\n", code, message)
            }
            other => format!("\n← {} {}\n", other, envelope.data),
        }
    }

    fn format_chat_message(envelope: &ServerEnvelope, who: &str) -> String {
        let content = Self::str_field(envelope, "content").unwrap_or_default();
        let id = envelope
            .field("id")
            .and_then(Value::as_i64)
            .unwrap_or_default();
        let created_at = envelope
            .field("created_at")
            .and_then(Value::as_i64)
            .unwrap_or(envelope.timestamp);
        format!(
            "\n\n------------------------------------------------------------\n\
             [chat {}] {}: {}\n\
             #{} sent at {}\n\
             ------------------------------------------------------------\n",
            envelope.chat_id,
            who,
            content,
            id,
            timestamp_to_clock_label(created_at)
        )
    }

    fn user_label(user_id: Option<i64>, me: Option<i64>) -> String {
        match user_id {
            Some(id) if Some(id) == me => format!("user {} (me)", id),
            Some(id) => format!("user {}", id),
            None => "someone".to_string(),
        }
    }

    fn str_field<'a>(envelope: &'a ServerEnvelope, name: &str) -> Option<&'a str> {
        envelope.field(name).and_then(Value::as_str)
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // 2023-01-01 12:34:56 UTC in milliseconds
    const AT: i64 = 1672576496000;

    fn envelope(kind: &str, chat_id: i64, user_id: Option<i64>, data: Value) -> ServerEnvelope {
        ServerEnvelope {
            kind: kind.to_string(),
            chat_id,
            user_id,
            data,
            timestamp: AT,
        }
    }

    #[test]
    fn test_format_connected_marks_me() {
        // テスト項目: connected エンベロープが自分のユーザーとして表示される
        // given (前提条件):
        let envelope = envelope("connected", 0, Some(1), Value::Null);

        // when (操作):
        let result = MessageFormatter::format_envelope(&envelope, Some(1));

        // then (期待する結果):
        assert_eq!(result, "\nConnected as user 1 (me) at 12:34:56\n");
    }

    #[test]
    fn test_format_membership_changes() {
        // テスト項目: 参加・退出の通知がチャット ID と時刻付きで表示される
        // given (前提条件):
        let joined = envelope("user-joined", 10, Some(2), Value::Null);
        let left = envelope("user-left", 10, Some(2), Value::Null);

        // when (操作):
        let joined = MessageFormatter::format_envelope(&joined, Some(1));
        let left = MessageFormatter::format_envelope(&left, Some(1));

        // then (期待する結果):
        assert_eq!(joined, "\n+ user 2 joined chat 10 at 12:34:56\n");
        assert_eq!(left, "\n- user 2 left chat 10 at 12:34:56\n");
    }

    #[test]
    fn test_format_chat_message() {
        // テスト項目: new-message が送信者・本文・メッセージ ID 付きで表示される
        // given (前提条件):
        let envelope = envelope(
            "new-message",
            10,
            Some(2),
            json!({ "id": 3, "content": "hello", "created_at": AT }),
        );

        // when (操作):
        let result = MessageFormatter::format_envelope(&envelope, Some(1));

        // then (期待する結果):
        assert!(result.contains("[chat 10] user 2: hello"));
        assert!(result.contains("#3 sent at 12:34:56"));
    }

    #[test]
    fn test_format_presence_typing_and_receipt() {
        // テスト項目: presence / typing / read-receipt が表示される
        // given (前提条件):
        let presence = envelope("presence", 10, Some(2), json!({ "status": "away" }));
        let typing = envelope("typing", 10, Some(2), json!({ "is_typing": false }));
        let receipt = envelope(
            "read-receipt",
            10,
            Some(2),
            json!({ "message_id": 3, "read_at": AT }),
        );

        // when (操作):
        let presence = MessageFormatter::format_envelope(&presence, None);
        let typing = MessageFormatter::format_envelope(&typing, None);
        let receipt = MessageFormatter::format_envelope(&receipt, None);

        // then (期待する結果):
        assert_eq!(presence, "\n* user 2 is away (chat 10, 12:34:56)\n");
        assert_eq!(typing, "\n… user 2 stopped typing in chat 10\n");
        assert_eq!(receipt, "\n✓ user 2 read #3 in chat 10 at 12:34:56\n");
    }

    #[test]
    fn test_format_error() {
        // テスト項目: error エンベロープがコードとメッセージ付きで表示される
        // given (前提条件):
        let envelope = envelope(
            "error",
            10,
            None,
            json!({ "code": "forbidden", "message": "not a member of chat 10" }),
        );

        // when (操作):
        let result = MessageFormatter::format_envelope(&envelope, Some(1));

        // then (期待する結果):
        assert_eq!(result, "\n! [forbidden] not a member of chat 10\n");
    }

    #[test]
    fn test_format_binary_and_raw_message() {
        // テスト項目: バイナリと解析できないテキストがそのまま通知される
        // given (前提条件):
        let byte_count = 1024;
        let text = "not json";

        // when (操作):
        let binary = MessageFormatter::format_binary_message(byte_count);
        let raw = MessageFormatter::format_raw_message(text);

        // then (期待する結果):
        assert_eq!(binary, "\n← Received 1024 bytes of binary data\n");
        assert_eq!(raw, "\n← Received: not json\n");
    }
}
