//! WebSocket client session management.

use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use futures_util::{SinkExt, StreamExt};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, http::StatusCode, protocol::Message},
};

use crate::{
    command::{ChatCursor, Command, HELP, parse_command},
    envelope::{ClientFrame, ServerEnvelope},
    error::ClientError,
    formatter::MessageFormatter,
    ui::{prompt_label, redisplay_prompt},
};

/// Chat the user is currently typing into, shared between the prompt, the
/// reader and the writer. `0` means none.
#[derive(Debug, Clone, Default)]
pub struct CurrentChat(Arc<AtomicI64>);

impl CurrentChat {
    pub fn new(chat_id: Option<i64>) -> Self {
        Self(Arc::new(AtomicI64::new(chat_id.unwrap_or(0))))
    }

    pub fn get(&self) -> Option<i64> {
        match self.0.load(Ordering::Relaxed) {
            0 => None,
            chat_id => Some(chat_id),
        }
    }

    pub fn set(&self, chat_id: Option<i64>) {
        self.0.store(chat_id.unwrap_or(0), Ordering::Relaxed);
    }
}

/// Build the connection URL carrying the access token.
pub fn connect_url(url: &str, token: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", url, separator, token)
}

/// Run the WebSocket client session
///
/// Returns `Ok(())` when the user leaves the prompt, and an error when the
/// connection could not be opened or was lost.
pub async fn run_client_session(
    url: &str,
    token: &str,
    current_chat: &CurrentChat,
) -> Result<(), ClientError> {
    let (ws_stream, _response) = match connect_async(connect_url(url, token)).await {
        Ok(result) => result,
        Err(WsError::Http(response)) if response.status() == StatusCode::UNAUTHORIZED => {
            return Err(ClientError::Unauthorized);
        }
        Err(WsError::Http(response)) if response.status() == StatusCode::SERVICE_UNAVAILABLE => {
            return Err(ClientError::Unavailable);
        }
        Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
    };

    tracing::info!("Connected to the hub!");
    println!("\nType /help for commands. Press Ctrl+C or Ctrl+D to exit.\n");

    let (mut write, mut read) = ws_stream.split();

    // Rejoin the chat that was current before a reconnect
    if let Some(chat_id) = current_chat.get() {
        send_frame(&mut write, &ClientFrame::join(chat_id))
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    }

    // Spawn a task to handle incoming envelopes
    let chat_for_read = current_chat.clone();
    let mut read_task = tokio::spawn(async move {
        let mut me = None;

        while let Some(message) = read.next().await {
            let formatted = match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerEnvelope>(&text) {
                    Ok(envelope) => {
                        if envelope.kind == "connected" {
                            me = envelope.user_id;
                        }
                        MessageFormatter::format_envelope(&envelope, me)
                    }
                    Err(_) => MessageFormatter::format_raw_message(&text),
                },
                Ok(Message::Binary(data)) => MessageFormatter::format_binary_message(data.len()),
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => continue,
            };
            print!("{}", formatted);
            redisplay_prompt(chat_for_read.get());
        }
    });

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let chat_for_prompt = current_chat.clone();
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt_label(chat_for_prompt.get())) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Spawn a task to turn prompt input into frames
    let chat_for_write = current_chat.clone();
    let mut write_task = tokio::spawn(async move {
        let mut cursor = ChatCursor::new(chat_for_write.get());

        while let Some(line) = input_rx.recv().await {
            let command = match parse_command(&line) {
                Ok(Command::Quit) => break,
                Ok(Command::Help) => {
                    println!("{}", HELP);
                    continue;
                }
                Ok(command) => command,
                Err(e) => {
                    println!("! {}", e);
                    continue;
                }
            };

            let frame = match cursor.frame_for(&command) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    println!("! {}", e);
                    continue;
                }
            };
            chat_for_write.set(cursor.current());

            if let Err(e) = send_frame(&mut write, &frame).await {
                tracing::warn!("Failed to send frame: {}", e);
                return true;
            }
        }

        write.send(Message::Close(None)).await.ok();
        false
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
            Err(ClientError::ConnectionError("Connection lost".to_string()))
        }
        write_result = &mut write_task => {
            read_task.abort();
            if write_result.unwrap_or(true) {
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
            Ok(())
        }
    }
}

async fn send_frame<S>(write: &mut S, frame: &ClientFrame) -> Result<(), WsError>
where
    S: futures_util::Sink<Message, Error = WsError> + Unpin,
{
    let json = serde_json::to_string(frame).map_err(|e| WsError::Io(std::io::Error::other(e)))?;
    write.send(Message::Text(json.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_url_appends_token() {
        // テスト項目: 接続 URL にトークンがクエリパラメータとして付与される
        // given (前提条件):
        let url = "ws://127.0.0.1:8080/ws";

        // when (操作):
        let plain = connect_url(url, "abc.def.ghi");
        let with_query = connect_url("ws://127.0.0.1:8080/ws?v=1", "abc");

        // then (期待する結果):
        assert_eq!(plain, "ws://127.0.0.1:8080/ws?token=abc.def.ghi");
        assert_eq!(with_query, "ws://127.0.0.1:8080/ws?v=1&token=abc");
    }

    #[test]
    fn test_current_chat_round_trip() {
        // テスト項目: 現在のチャットを共有ハンドル経由で読み書きできる
        // given (前提条件):
        let current = CurrentChat::new(None);
        let shared = current.clone();

        // when (操作):
        shared.set(Some(10));
        let after_set = current.get();
        shared.set(None);

        // then (期待する結果):
        assert_eq!(after_set, Some(10));
        assert_eq!(current.get(), None);
    }
}
