//! Interactive command-line client for the Tsudoi hub.

pub mod command;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod formatter;
pub mod runner;
pub mod session;
pub mod ui;

pub use error::ClientError;
pub use runner::run_client;
