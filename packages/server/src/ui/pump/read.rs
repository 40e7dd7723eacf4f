//! Inbound half of a connection.

use std::{fmt::Display, sync::Arc};

use axum::extract::ws::Message;
use futures_util::{Stream, StreamExt};
use tokio::time::timeout;

use crate::{domain::ProtocolError, hub::Connection};

use super::{EventDispatcher, PumpConfig};

/// Read frames from `stream` and dispatch them until the peer goes away, the
/// read deadline passes, a fatal protocol error occurs or the hub closes the
/// connection. Always unregisters the connection on exit.
///
/// Once the connection is closed (for example superseded by a reconnect) no
/// further frame is dispatched, even one already buffered in `stream`.
pub async fn run_read_pump<S, E>(
    mut stream: S,
    connection: Arc<Connection>,
    dispatcher: Arc<EventDispatcher>,
    config: PumpConfig,
) where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let user_id = connection.user_id();

    loop {
        let next = tokio::select! {
            biased;
            () = connection.closed() => {
                tracing::debug!(%user_id, "connection closed by hub");
                break;
            }
            next = timeout(config.pong_timeout, stream.next()) => next,
        };

        let message = match next {
            Err(_) => {
                tracing::info!(%user_id, "read deadline exceeded");
                break;
            }
            Ok(None) => {
                tracing::debug!(%user_id, "peer went away");
                break;
            }
            Ok(Some(Err(e))) => {
                tracing::info!(%user_id, "read failed: {}", e);
                break;
            }
            Ok(Some(Ok(message))) => message,
        };
        if connection.is_closed() {
            tracing::debug!(%user_id, "frame after close discarded");
            break;
        }
        connection.touch(dispatcher.now());

        match message {
            Message::Text(text) => {
                if let Err(e) = check_size(text.as_str().len(), config.max_frame_bytes) {
                    dispatcher.reject(&connection, &e).await;
                    break;
                }
                dispatcher.handle_text(&connection, text.as_str()).await;
            }
            Message::Binary(data) => {
                let error = check_size(data.len(), config.max_frame_bytes)
                    .err()
                    .unwrap_or(ProtocolError::NonTextFrame("binary"));
                dispatcher.reject(&connection, &error).await;
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => {
                tracing::debug!(%user_id, "close frame received");
                break;
            }
        }
    }

    dispatcher.disconnect(connection).await;
}

fn check_size(size: usize, limit: usize) -> Result<(), ProtocolError> {
    if size > limit {
        return Err(ProtocolError::FrameTooLarge { size, limit });
    }
    Ok(())
}
