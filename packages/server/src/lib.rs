//! Real-time connection hub for the Tsudoi messenger.
//!
//! Live WebSocket connections are registered with a single [`hub::Hub`], grouped
//! into chat rooms, and receive fanned-out chat events (messages, typing,
//! presence, read receipts).

// layers
pub mod domain;
pub mod hub;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
