mod memory;
mod noop;
mod redis_store;

pub use memory::MemoryKv;
pub use noop::NoopKv;
pub use redis_store::RedisKv;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for KvError {
    fn from(e: redis::RedisError) -> Self {
        KvError::Backend(e.to_string())
    }
}

/// One command in a batched (pipelined) submission. Pipelines are sent as a
/// single round trip but are NOT atomic across keys; a store-side failure can
/// leave a prefix of the batch applied.
#[derive(Debug, Clone)]
pub enum Command {
    Set { key: String, value: String },
    Incr { key: String },
    HSet { key: String, fields: Vec<(String, String)> },
    SAdd { key: String, member: String },
    LPush { key: String, value: String },
    LTrim { key: String, start: isize, stop: isize },
}

/// Abstraction over the remote key-value store.
///
/// Single-key operations are assumed atomic (the store's own guarantee);
/// nothing stronger is assumed for multi-key sequences. One long-lived client
/// is built at startup and injected into every service.
#[async_trait]
pub trait Kv: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
    /// Set with a TTL in seconds.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), KvError>;
    /// Returns true when the key existed.
    async fn del(&self, key: &str) -> Result<bool, KvError>;
    async fn incr(&self, key: &str) -> Result<i64, KvError>;
    async fn exists(&self, key: &str) -> Result<bool, KvError>;
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), KvError>;
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<(), KvError>;
    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, KvError>;
    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, KvError>;
    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError>;
    async fn scard(&self, key: &str) -> Result<u64, KvError>;
    async fn lpush(&self, key: &str, value: &str) -> Result<(), KvError>;
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, KvError>;
    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> Result<(), KvError>;
    /// Submit a batch in one round trip. Not transactional.
    async fn pipeline(&self, commands: &[Command]) -> Result<(), KvError>;
}
