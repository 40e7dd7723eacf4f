//! Real-time chat hub server.
//!
//! Accepts authenticated WebSocket connections, keeps chat-room membership in
//! memory and fans chat events out to every member of a room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsudoi-server -- --jwt-secret dev-secret
//! cargo run --bin tsudoi-server -- --jwt-secret dev-secret --issue-token 1
//! TSUDOI_JWT_SECRET=dev-secret cargo run --bin tsudoi-server -- --host 0.0.0.0 --port 3000
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use tsudoi_server::{
    config::ServerConfig,
    domain::UserId,
    hub::Hub,
    infrastructure::{
        auth::{JwtAuthenticator, issue_token},
        chat_access::InMemoryChatAccess,
        message_store::InMemoryMessageStore,
    },
    ui::Server,
};
use tsudoi_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "tsudoi-server")]
#[command(about = "Real-time chat hub over WebSocket", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "TSUDOI_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "TSUDOI_PORT", default_value = "8080")]
    port: u16,

    /// Frames a connection may have queued before it is dropped
    #[arg(long, env = "TSUDOI_QUEUE_CAPACITY", default_value = "256")]
    queue_capacity: usize,

    /// Capacity of the hub's command channel
    #[arg(long, env = "TSUDOI_HUB_CAPACITY", default_value = "1024")]
    hub_capacity: usize,

    /// Largest accepted inbound frame in bytes
    #[arg(long, env = "TSUDOI_MAX_FRAME_BYTES", default_value = "65536")]
    max_frame_bytes: usize,

    #[arg(long, default_value = "10")]
    write_timeout_secs: u64,

    /// Read deadline; a connection silent for this long is dropped
    #[arg(long, default_value = "60")]
    pong_timeout_secs: u64,

    /// Ping period (defaults to 9/10 of the pong timeout)
    #[arg(long)]
    ping_interval_secs: Option<u64>,

    #[arg(long, default_value = "30")]
    metrics_interval_secs: u64,

    /// Secret used to verify HS256 tokens
    #[arg(long, env = "TSUDOI_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Let any authenticated user join any chat
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    open_chats: bool,

    /// Print a token for this user id (valid for 24 hours) and exit
    #[arg(long, value_name = "USER_ID")]
    issue_token: Option<i64>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            outbound_queue_capacity: args.queue_capacity,
            hub_channel_capacity: args.hub_capacity,
            max_frame_bytes: args.max_frame_bytes,
            write_timeout_secs: args.write_timeout_secs,
            pong_timeout_secs: args.pong_timeout_secs,
            ping_interval_secs: args.ping_interval_secs,
            metrics_interval_secs: args.metrics_interval_secs,
            jwt_secret: args.jwt_secret,
            open_chats: args.open_chats,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Some(user_id) = args.issue_token {
        match issue_token(&args.jwt_secret, UserId::new(user_id), Duration::from_secs(24 * 60 * 60)) {
            Ok(token) => println!("{}", token),
            Err(e) => {
                tracing::error!("Failed to issue token: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let config = ServerConfig::from(args);
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(2);
    }

    // Initialize dependencies in order:
    // 1. Hub (control loop + metrics ticker)
    // 2. Collaborators
    // 3. Server

    // 1. Start the hub
    let clock = Arc::new(SystemClock);
    let (hub, hub_task) = Hub::spawn(&config.hub_config(), clock.clone());

    // 2. Create collaborators (in-memory implementations)
    let authenticator = Arc::new(JwtAuthenticator::new(&config.jwt_secret));
    let access = Arc::new(InMemoryChatAccess::new(config.open_chats));
    let processor = Arc::new(InMemoryMessageStore::new(clock));

    // 3. Create and run the server
    let server = Server::new(hub, authenticator, access, processor, config.pump_config());
    if let Err(e) = server.run(&config.addr()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = hub_task.await {
        tracing::error!("Hub control loop failed: {}", e);
    }
}
