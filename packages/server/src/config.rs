//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{hub::HubConfig, ui::pump::PumpConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("ping interval ({ping:?}) must be shorter than the pong timeout ({pong:?})")]
    PingNotBeforePong { ping: Duration, pong: Duration },

    #[error("a JWT secret is required")]
    MissingJwtSecret,
}

/// Runtime configuration of the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Frames a connection may have queued before it is dropped.
    pub outbound_queue_capacity: usize,
    pub hub_channel_capacity: usize,
    pub max_frame_bytes: usize,
    pub write_timeout_secs: u64,
    /// Read deadline, renewed by any inbound frame including pongs.
    pub pong_timeout_secs: u64,
    /// Liveness probe interval; nine tenths of the pong timeout when unset.
    pub ping_interval_secs: Option<u64>,
    pub metrics_interval_secs: u64,
    pub jwt_secret: String,
    /// Let any authenticated user join chats without an explicit grant.
    pub open_chats: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            outbound_queue_capacity: 256,
            hub_channel_capacity: 1024,
            max_frame_bytes: 64 * 1024,
            write_timeout_secs: 10,
            pong_timeout_secs: 60,
            ping_interval_secs: None,
            metrics_interval_secs: 30,
            jwt_secret: String::new(),
            open_chats: true,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        match self.ping_interval_secs {
            Some(secs) => Duration::from_secs(secs),
            None => self.pong_timeout() * 9 / 10,
        }
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbound_queue_capacity == 0 {
            return Err(ConfigError::Zero("outbound queue capacity"));
        }
        if self.hub_channel_capacity == 0 {
            return Err(ConfigError::Zero("hub channel capacity"));
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::Zero("max frame bytes"));
        }
        if self.write_timeout_secs == 0 {
            return Err(ConfigError::Zero("write timeout"));
        }
        if self.pong_timeout_secs == 0 {
            return Err(ConfigError::Zero("pong timeout"));
        }
        if self.metrics_interval_secs == 0 {
            return Err(ConfigError::Zero("metrics interval"));
        }
        let (ping, pong) = (self.ping_interval(), self.pong_timeout());
        if ping.is_zero() || ping >= pong {
            return Err(ConfigError::PingNotBeforePong { ping, pong });
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        Ok(())
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            outbound_queue_capacity: self.outbound_queue_capacity,
            command_capacity: self.hub_channel_capacity,
            metrics_interval: self.metrics_interval(),
        }
    }

    pub fn pump_config(&self) -> PumpConfig {
        PumpConfig {
            max_frame_bytes: self.max_frame_bytes,
            write_timeout: self.write_timeout(),
            pong_timeout: self.pong_timeout(),
            ping_interval: self.ping_interval(),
        }
    }
}
