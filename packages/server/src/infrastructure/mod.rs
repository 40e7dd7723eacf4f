//! Infrastructure layer
//!
//! ## 責務
//!
//! - ドメイン層が定義するコラボレータ trait の具体的な実装
//!   （認証、メッセージ永続化、チャット参加権限）
//! - WebSocket / HTTP のワイヤ形式（DTO）とドメインモデルとの変換

pub mod auth;
pub mod chat_access;
pub mod dto;
pub mod message_store;
