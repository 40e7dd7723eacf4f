mod http;
mod websocket;

pub use http::{chat_users, health_check, metrics, online_users, user_presence};
pub use websocket::websocket_handler;
