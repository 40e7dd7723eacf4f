//! Authentication of WebSocket upgrade requests.

mod jwt;

pub use jwt::{JwtAuthenticator, issue_token};
