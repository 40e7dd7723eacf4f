//! Client execution logic with reconnection support.

use crate::{
    domain::{NextStep, ReconnectPolicy},
    error::ClientError,
    session::{CurrentChat, run_client_session},
};

/// Run the WebSocket client, reconnecting according to `policy`.
///
/// `initial_chat` is joined right after connecting; whichever chat is current
/// when the connection drops is joined again after reconnecting.
pub async fn run_client(
    url: String,
    token: String,
    initial_chat: Option<i64>,
    policy: ReconnectPolicy,
) -> Result<(), ClientError> {
    let current_chat = CurrentChat::new(initial_chat);
    let mut failed_attempts = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} (attempt {}/{})",
            url,
            failed_attempts + 1,
            policy.max_attempts
        );

        let error = match run_client_session(&url, &token, &current_chat).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Err(e) => e,
        };
        failed_attempts += 1;

        match policy.next_step(&error, failed_attempts) {
            NextStep::RetryAfter(delay) => {
                tracing::warn!(
                    "{}. Reconnecting in {:?} (attempt {}/{})",
                    error,
                    delay,
                    failed_attempts + 1,
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
            }
            NextStep::Abort => return Err(error),
            NextStep::GiveUp => {
                tracing::error!("Failed to reconnect after {} attempts", failed_attempts);
                return Err(error);
            }
        }
    }
}
