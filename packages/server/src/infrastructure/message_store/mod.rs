//! Message persistence.

mod inmemory;

pub use inmemory::{InMemoryMessageStore, MAX_CONTENT_CHARS};
