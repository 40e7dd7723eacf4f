//! Conversion between WebSocket DTOs and domain events.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::domain::{
    ChatId, InboundEvent, MessageId, OutboundEnvelope, OutboundEvent, ProtocolError,
};

use super::websocket::{
    ErrorDto, InboundFrameDto, MessageDto, NewMessageData, OutboundEnvelopeDto, PresenceDto,
    ReadReceiptData, ReadReceiptDto, StatusData, TypingData, TypingDto,
};

/// Decode a text frame into a typed inbound event.
pub fn decode_inbound(text: &str) -> Result<InboundEvent, ProtocolError> {
    let frame: InboundFrameDto = serde_json::from_str(text)
        .map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?;
    InboundEvent::try_from(frame)
}

/// Serialize an outbound envelope into the text written to the socket.
pub fn encode_outbound(envelope: &OutboundEnvelope) -> Result<Arc<str>, serde_json::Error> {
    let dto = OutboundEnvelopeDto::try_from(envelope)?;
    let json = serde_json::to_string(&dto)?;
    Ok(Arc::from(json))
}

fn parse_data<T: DeserializeOwned>(kind: &str, data: serde_json::Value) -> Result<T, ProtocolError> {
    // A missing `data` is read as an empty object so all-default payloads decode.
    let data = if data.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        data
    };
    serde_json::from_value(data).map_err(|e| ProtocolError::InvalidPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

fn require_chat(kind: &str, chat_id: i64) -> Result<ChatId, ProtocolError> {
    if chat_id <= 0 {
        return Err(ProtocolError::InvalidPayload {
            kind: kind.to_string(),
            reason: "chat_id must be a positive integer".to_string(),
        });
    }
    Ok(ChatId::new(chat_id))
}

impl TryFrom<InboundFrameDto> for InboundEvent {
    type Error = ProtocolError;

    fn try_from(frame: InboundFrameDto) -> Result<Self, Self::Error> {
        let kind = frame.kind.as_str();
        match kind {
            "typing" => {
                let chat_id = require_chat(kind, frame.chat_id)?;
                let data: TypingData = parse_data(kind, frame.data)?;
                Ok(InboundEvent::Typing {
                    chat_id,
                    is_typing: data.is_typing,
                })
            }
            "join" => Ok(InboundEvent::Join {
                chat_id: require_chat(kind, frame.chat_id)?,
            }),
            "leave" => Ok(InboundEvent::Leave {
                chat_id: require_chat(kind, frame.chat_id)?,
            }),
            "read-receipt" => {
                let chat_id = require_chat(kind, frame.chat_id)?;
                let data: ReadReceiptData = parse_data(kind, frame.data)?;
                Ok(InboundEvent::ReadReceipt {
                    chat_id,
                    message_id: MessageId::new(data.message_id),
                })
            }
            "new-message" => {
                let chat_id = require_chat(kind, frame.chat_id)?;
                let data: NewMessageData = parse_data(kind, frame.data)?;
                Ok(InboundEvent::NewMessage {
                    chat_id,
                    content: data.content,
                })
            }
            "status" => {
                let data: StatusData = parse_data(kind, frame.data)?;
                if !data.status.is_client_settable() {
                    return Err(ProtocolError::InvalidPayload {
                        kind: kind.to_string(),
                        reason: format!("status '{}' cannot be set by clients", data.status),
                    });
                }
                Ok(InboundEvent::Status {
                    status: data.status,
                })
            }
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }
}

impl TryFrom<&OutboundEnvelope> for OutboundEnvelopeDto {
    type Error = serde_json::Error;

    fn try_from(envelope: &OutboundEnvelope) -> Result<Self, Self::Error> {
        let data = match &envelope.event {
            OutboundEvent::Connected | OutboundEvent::UserJoined | OutboundEvent::UserLeft => {
                serde_json::Value::Null
            }
            OutboundEvent::Presence { status } => {
                serde_json::to_value(PresenceDto { status: *status })?
            }
            OutboundEvent::Typing { is_typing } => serde_json::to_value(TypingDto {
                is_typing: *is_typing,
            })?,
            OutboundEvent::NewMessage(message) => serde_json::to_value(MessageDto {
                id: message.id.value(),
                content: message.content.clone(),
                created_at: message.created_at,
            })?,
            OutboundEvent::ReadReceipt(record) => serde_json::to_value(ReadReceiptDto {
                message_id: record.message_id.value(),
                read_at: record.read_at,
            })?,
            OutboundEvent::Error { code, message } => serde_json::to_value(ErrorDto {
                code: *code,
                message: message.clone(),
            })?,
        };

        Ok(OutboundEnvelopeDto {
            kind: envelope.event.kind().to_string(),
            chat_id: envelope.chat_id.map(|c| c.value()).unwrap_or(0),
            user_id: envelope.user_id.map(|u| u.value()),
            data,
            timestamp: envelope.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode, PersistedMessage, PresenceStatus, UserId};

    #[test]
    fn test_decode_new_message() {
        // テスト項目: new-message フレームが型付きイベントにデコードされる
        // given (前提条件):
        let text = r#"{"type":"new-message","chat_id":10,"data":{"content":"hello"}}"#;

        // when (操作):
        let event = decode_inbound(text).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            InboundEvent::NewMessage {
                chat_id: ChatId::new(10),
                content: "hello".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_typing_without_data_defaults_to_started() {
        // テスト項目: data のない typing は入力開始として扱われる
        // given (前提条件):
        let text = r#"{"type":"typing","chat_id":3}"#;

        // when (操作):
        let event = decode_inbound(text).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            InboundEvent::Typing {
                chat_id: ChatId::new(3),
                is_typing: true,
            }
        );
    }

    #[test]
    fn test_decode_join_requires_chat_id() {
        // テスト項目: chat_id のない join は不正なペイロードとして拒否される
        // given (前提条件):
        let text = r#"{"type":"join"}"#;

        // when (操作):
        let result = decode_inbound(text);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidPayload { ref kind, .. }) if kind == "join"
        ));
    }

    #[test]
    fn test_decode_unknown_type() {
        // テスト項目: 未知のイベント種別は UnknownEvent になる
        // given (前提条件):
        let text = r#"{"type":"dance","chat_id":10,"data":{}}"#;

        // when (操作):
        let result = decode_inbound(text);

        // then (期待する結果):
        assert_eq!(result, Err(ProtocolError::UnknownEvent("dance".to_string())));
    }

    #[test]
    fn test_decode_malformed_json() {
        // テスト項目: JSON でないフレームは MalformedFrame になる
        // given (前提条件):
        let text = "hello there";

        // when (操作):
        let result = decode_inbound(text);

        // then (期待する結果):
        assert!(matches!(result, Err(ProtocolError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_status_rejects_offline() {
        // テスト項目: クライアントは offline ステータスを設定できない
        // given (前提条件):
        let text = r#"{"type":"status","data":{"status":"offline"}}"#;

        // when (操作):
        let result = decode_inbound(text);

        // then (期待する結果):
        assert!(matches!(result, Err(ProtocolError::InvalidPayload { .. })));
    }

    #[test]
    fn test_decode_read_receipt_with_missing_message_id() {
        // テスト項目: message_id のない read-receipt は不正なペイロードになる
        // given (前提条件):
        let text = r#"{"type":"read-receipt","chat_id":10,"data":{}}"#;

        // when (操作):
        let result = decode_inbound(text);

        // then (期待する結果):
        assert!(matches!(result, Err(ProtocolError::InvalidPayload { .. })));
    }

    #[test]
    fn test_encode_new_message_envelope() {
        // テスト項目: new-message エンベロープが期待する JSON 形式になる
        // given (前提条件):
        let message = PersistedMessage {
            id: MessageId::new(7),
            chat_id: ChatId::new(10),
            sender: UserId::new(1),
            content: "hello".to_string(),
            created_at: 1000,
        };
        let envelope = OutboundEnvelope::new(OutboundEvent::NewMessage(message), 1001)
            .in_chat(ChatId::new(10))
            .about(UserId::new(1));

        // when (操作):
        let json = encode_outbound(&envelope).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "new-message");
        assert_eq!(value["chat_id"], 10);
        assert_eq!(value["user_id"], 1);
        assert_eq!(value["data"]["id"], 7);
        assert_eq!(value["data"]["content"], "hello");
        assert_eq!(value["timestamp"], 1001);
    }

    #[test]
    fn test_encode_omits_empty_data_and_user() {
        // テスト項目: data と user_id がない場合は JSON から省略される
        // given (前提条件):
        let envelope = OutboundEnvelope::new(OutboundEvent::Connected, 5);

        // when (操作):
        let json = encode_outbound(&envelope).unwrap();

        // then (期待する結果):
        assert_eq!(&*json, r#"{"type":"connected","chat_id":0,"timestamp":5}"#);
    }

    #[test]
    fn test_encode_error_and_presence_payloads() {
        // テスト項目: error と presence のペイロードが正しく出力される
        // given (前提条件):
        let error = OutboundEnvelope::error(ErrorCode::UnknownEvent, "no", None, 1);
        let presence = OutboundEnvelope::new(
            OutboundEvent::Presence {
                status: PresenceStatus::Offline,
            },
            2,
        )
        .in_chat(ChatId::new(4))
        .about(UserId::new(9));

        // when (操作):
        let error: OutboundEnvelopeDto = serde_json::from_str(&encode_outbound(&error).unwrap()).unwrap();
        let presence: OutboundEnvelopeDto =
            serde_json::from_str(&encode_outbound(&presence).unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(error.kind, "error");
        assert_eq!(error.data["code"], "unknown_event");
        assert_eq!(presence.kind, "presence");
        assert_eq!(presence.data["status"], "offline");
        assert_eq!(presence.user_id, Some(9));
    }
}
