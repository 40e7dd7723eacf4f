//! Outbound half of a connection.

use std::{fmt::Display, sync::Arc};

use axum::{body::Bytes, extract::ws::Message};
use futures_util::{Sink, SinkExt};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};

use crate::hub::{Connection, OutboundQueue};

use super::PumpConfig;

/// Frames coalesced into one flush at most.
const MAX_BATCH: usize = 64;

/// Drain `queue` into `sink` until the queue is closed or a write fails.
///
/// Frames already queued behind the first one are fed into the same flush.
/// When nothing was written during a ping interval a ping is sent instead.
/// A closed queue ends with a close frame; a failed or timed-out write ends
/// without one. Either way the connection is marked closed on exit.
pub async fn run_write_pump<S>(
    mut sink: S,
    mut queue: OutboundQueue,
    connection: Arc<Connection>,
    config: PumpConfig,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let user_id = connection.user_id();
    let mut ticker = interval_at(Instant::now() + config.ping_interval, config.ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut wrote_since_tick = false;

    let drained = loop {
        tokio::select! {
            frame = queue.recv() => {
                let Some(frame) = frame else {
                    break true;
                };
                match timeout(config.write_timeout, write_batch(&mut sink, &mut queue, frame)).await {
                    Ok(Ok(count)) => {
                        wrote_since_tick = true;
                        tracing::trace!(%user_id, count, "frames flushed");
                    }
                    Ok(Err(e)) => {
                        tracing::info!(%user_id, "write failed: {}", e);
                        break false;
                    }
                    Err(_) => {
                        tracing::warn!(%user_id, "write timed out");
                        break false;
                    }
                }
            }
            _ = ticker.tick() => {
                if std::mem::take(&mut wrote_since_tick) {
                    continue;
                }
                match timeout(config.write_timeout, sink.send(Message::Ping(Bytes::new()))).await {
                    Ok(Ok(())) => tracing::trace!(%user_id, "ping sent"),
                    Ok(Err(e)) => {
                        tracing::info!(%user_id, "ping failed: {}", e);
                        break false;
                    }
                    Err(_) => {
                        tracing::warn!(%user_id, "ping timed out");
                        break false;
                    }
                }
            }
        }
    };

    if drained {
        let _ = timeout(config.write_timeout, sink.send(Message::Close(None))).await;
    }
    let _ = timeout(config.write_timeout, sink.close()).await;
    connection.mark_closed();
    tracing::debug!(%user_id, connection_id = %connection.id(), "write pump stopped");
}

async fn write_batch<S>(
    sink: &mut S,
    queue: &mut OutboundQueue,
    first: Arc<str>,
) -> Result<usize, S::Error>
where
    S: Sink<Message> + Unpin,
{
    sink.feed(Message::Text(first.as_ref().into())).await?;
    let mut count = 1;
    while count < MAX_BATCH {
        let Ok(frame) = queue.try_recv() else {
            break;
        };
        sink.feed(Message::Text(frame.as_ref().into())).await?;
        count += 1;
    }
    sink.flush().await?;
    Ok(count)
}
