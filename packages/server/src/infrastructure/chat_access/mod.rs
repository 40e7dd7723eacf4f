//! Chat-membership authorization.

mod inmemory;

pub use inmemory::InMemoryChatAccess;
