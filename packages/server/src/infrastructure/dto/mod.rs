//! Data Transfer Objects (DTOs) for the hub.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket event envelopes
//! - `http`: HTTP API response DTOs
//!
//! `conversion` maps them to and from the domain events.

pub mod conversion;
pub mod http;
pub mod websocket;
