//! Storage backends for chat metadata and user state
//!
//! - Memory: process-local map with per-entry expiry
//! - Postgres: durable key/value table

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresStore};

pub use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Chat metadata and user state live for one year, in minutes
pub const RECORD_TTL_MINUTES: u32 = 525_600;

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key/value store with per-key TTL. Writes replace the whole value.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value; expired and missing keys both read as `None`
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Store a value for `ttl_minutes`
    async fn set(&self, key: &str, value: &Value, ttl_minutes: u32) -> Result<(), StorageError>;
}

/// Key of a chat's metadata record
pub fn chat_meta_key(channel: &str) -> String {
    format!("meta:{}", channel)
}

/// Key of a user's state record within a global channel
pub fn user_state_key(global: &str, user: &str) -> String {
    format!("{}:{}:state", global, user)
}
