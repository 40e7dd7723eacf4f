//! Per-connection read and write pumps.
//!
//! The two pumps of a connection run as separate tasks and never touch each
//! other directly. The write pump drains the outbound queue into the socket;
//! the read pump decodes inbound frames and hands them to the
//! [`EventDispatcher`]. Both are generic over `Sink`/`Stream` so they can be
//! driven by an axum `WebSocket` or by in-memory channels.

mod dispatch;
mod read;
mod write;

use std::time::Duration;

pub use dispatch::EventDispatcher;
pub use read::run_read_pump;
pub use write::run_write_pump;

/// Transport limits and liveness timing of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpConfig {
    /// Larger inbound frames close the connection.
    pub max_frame_bytes: usize,
    /// Bound on a single flush (or ping) to the socket.
    pub write_timeout: Duration,
    /// Read deadline, renewed by every inbound frame.
    pub pong_timeout: Duration,
    /// Ping period while no application data is being written.
    pub ping_interval: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 64 * 1024,
            write_timeout: Duration::from_secs(10),
            pong_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(54),
        }
    }
}
