//! Reconnection policy for the client.
//!
//! Pure decisions about what to do after a session fails, kept free of I/O.

use std::time::Duration;

use crate::error::ClientError;

/// What the runner does after a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Wait, then open a new session.
    RetryAfter(Duration),
    /// Retrying cannot help (the token was rejected).
    Abort,
    /// Every attempt has been used.
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    /// Decide the next step after `failed_attempts` consecutive failures
    /// ending in `error`.
    ///
    /// A hub that is shutting down gets twice the usual pause.
    pub fn next_step(&self, error: &ClientError, failed_attempts: u32) -> NextStep {
        if matches!(error, ClientError::Unauthorized) {
            return NextStep::Abort;
        }
        if failed_attempts >= self.max_attempts {
            return NextStep::GiveUp;
        }
        match error {
            ClientError::Unavailable => NextStep::RetryAfter(self.interval * 2),
            _ => NextStep::RetryAfter(self.interval),
        }
    }
}
