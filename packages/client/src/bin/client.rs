//! Interactive command-line client for the Tsudoi hub.
//!
//! Connects with an access token, joins chats and sends messages typed at the
//! prompt. Plain text goes to the current chat; `/help` lists the commands.
//! Reconnects after a lost connection (5 attempts, 5 seconds apart by default).
//! A rejected token ends the client immediately.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsudoi-server -- --jwt-secret dev-secret --issue-token 1
//! cargo run --bin tsudoi-client -- --token <TOKEN> --chat 10
//! TSUDOI_TOKEN=<TOKEN> cargo run --bin tsudoi-client -- -u ws://127.0.0.1:3000/ws
//! ```

use clap::Parser;

use tsudoi_client::{domain::ReconnectPolicy, run_client};
use tsudoi_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tsudoi-client")]
#[command(about = "Interactive WebSocket client for the Tsudoi chat hub", long_about = None)]
struct Args {
    /// WebSocket endpoint of the hub
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Access token (JWT) identifying the user
    #[arg(short = 't', long, env = "TSUDOI_TOKEN", hide_env_values = true)]
    token: String,

    /// Chat to join right after connecting
    #[arg(short = 'c', long)]
    chat: Option<i64>,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run_client(args.url, args.token, args.chat, ReconnectPolicy::default()).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
