//! Observational hub counters and the periodic metrics ticker.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use serde::Serialize;
use tokio::time::MissedTickBehavior;

use super::Hub;

/// Cumulative counters updated by the control loop and the read pumps.
#[derive(Debug, Default)]
pub(crate) struct HubCounters {
    /// Frames successfully enqueued onto outbound queues.
    pub(crate) messages_sent: AtomicU64,
    /// Inbound frames decoded into events.
    pub(crate) messages_received: AtomicU64,
    /// Connections evicted because their outbound queue rejected a frame.
    pub(crate) connections_dropped: AtomicU64,
    /// Connections ever registered.
    pub(crate) connections_total: AtomicU64,
}

impl HubCounters {
    pub(crate) fn add_sent(&self, count: u64) {
        if count > 0 {
            self.messages_sent.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn add_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_dropped(&self) {
        self.connections_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_registered(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }
}

/// Derived, non-authoritative view of the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub connected: usize,
    pub rooms: usize,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub connections_dropped: u64,
    pub connections_total: u64,
    /// Unix milliseconds (UTC)
    pub started_at: i64,
    pub uptime_secs: u64,
}

impl MetricsSnapshot {
    pub(crate) fn collect(
        counters: &HubCounters,
        connected: usize,
        rooms: usize,
        started_at: i64,
        now: i64,
    ) -> Self {
        Self {
            connected,
            rooms,
            messages_sent: counters.messages_sent.load(Ordering::Relaxed),
            messages_received: counters.messages_received.load(Ordering::Relaxed),
            connections_dropped: counters.connections_dropped.load(Ordering::Relaxed),
            connections_total: counters.connections_total.load(Ordering::Relaxed),
            started_at,
            uptime_secs: u64::try_from((now - started_at).max(0) / 1000).unwrap_or(0),
        }
    }
}

/// Recompute the cached snapshot every `period` until the hub shuts down.
pub(crate) async fn run_metrics_ticker(hub: Hub, period: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = hub.shutdown_token();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let snapshot = hub.refresh_metrics();
                tracing::debug!(
                    connected = snapshot.connected,
                    rooms = snapshot.rooms,
                    sent = snapshot.messages_sent,
                    received = snapshot.messages_received,
                    dropped = snapshot.connections_dropped,
                    "hub metrics"
                );
            }
        }
    }

    tracing::debug!("metrics ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_reads_counters_and_uptime() {
        // テスト項目: スナップショットがカウンタと稼働時間を反映する
        // given (前提条件):
        let counters = HubCounters::default();
        counters.add_sent(3);
        counters.add_sent(0);
        counters.add_received();
        counters.add_dropped();
        counters.add_registered();
        counters.add_registered();

        // when (操作):
        let snapshot = MetricsSnapshot::collect(&counters, 2, 1, 10_000, 75_500);

        // then (期待する結果):
        assert_eq!(snapshot.connected, 2);
        assert_eq!(snapshot.rooms, 1);
        assert_eq!(snapshot.messages_sent, 3);
        assert_eq!(snapshot.messages_received, 1);
        assert_eq!(snapshot.connections_dropped, 1);
        assert_eq!(snapshot.connections_total, 2);
        assert_eq!(snapshot.uptime_secs, 65);
    }

    #[test]
    fn test_uptime_never_negative() {
        // テスト項目: 時計が巻き戻っても稼働時間は 0 になる
        // given (前提条件):
        let counters = HubCounters::default();

        // when (操作):
        let snapshot = MetricsSnapshot::collect(&counters, 0, 0, 10_000, 5_000);

        // then (期待する結果):
        assert_eq!(snapshot.uptime_secs, 0);
    }
}
