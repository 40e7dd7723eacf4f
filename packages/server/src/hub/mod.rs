//! The real-time connection hub.
//!
//! ## 責務
//!
//! - 接続中ユーザーのレジストリ（ユーザーごとに最大 1 接続）
//! - チャットルームのメンバーシップ索引
//! - ルーム単位のブロードキャスト（遅いクライアントは切断するバックプレッシャー方針）
//! - プレゼンス・入力中表示・メトリクスといった派生ビュー
//!
//! All mutations go through a single control loop fed by a command channel,
//! so registry and room index updates are applied one at a time in the order
//! they were submitted.

mod command;
mod connection;
mod control;
mod metrics;
mod presence;
mod room_index;

pub use command::BroadcastEnvelope;
pub use connection::{Connection, ConnectionState, EnqueueError, OutboundQueue};
pub use control::{Hub, HubConfig, HubLoop};
pub use metrics::MetricsSnapshot;
pub use presence::{PresenceSnapshot, typing_envelope};
pub use room_index::RoomIndex;
