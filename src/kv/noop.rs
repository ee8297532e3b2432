use async_trait::async_trait;

use super::{Command, Kv, KvError};

/// Degraded-mode store used when no backend is configured. Writes are
/// accepted and dropped; reads return empty. The effect is the documented
/// safe default: link lookups come back none/false and rate limiting always
/// allows the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopKv;

#[async_trait]
impl Kv for NoopKv {
    async fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), KvError> {
        Ok(())
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<(), KvError> {
        Ok(())
    }

    async fn del(&self, _key: &str) -> Result<bool, KvError> {
        Ok(false)
    }

    async fn incr(&self, _key: &str) -> Result<i64, KvError> {
        Ok(0)
    }

    async fn exists(&self, _key: &str) -> Result<bool, KvError> {
        Ok(false)
    }

    async fn expire(&self, _key: &str, _ttl_secs: u64) -> Result<(), KvError> {
        Ok(())
    }

    async fn hset(&self, _key: &str, _fields: &[(String, String)]) -> Result<(), KvError> {
        Ok(())
    }

    async fn hgetall(&self, _key: &str) -> Result<Vec<(String, String)>, KvError> {
        Ok(Vec::new())
    }

    async fn hincrby(&self, _key: &str, _field: &str, _delta: i64) -> Result<i64, KvError> {
        Ok(0)
    }

    async fn sadd(&self, _key: &str, _member: &str) -> Result<(), KvError> {
        Ok(())
    }

    async fn scard(&self, _key: &str) -> Result<u64, KvError> {
        Ok(0)
    }

    async fn lpush(&self, _key: &str, _value: &str) -> Result<(), KvError> {
        Ok(())
    }

    async fn lrange(&self, _key: &str, _start: isize, _stop: isize) -> Result<Vec<String>, KvError> {
        Ok(Vec::new())
    }

    async fn ltrim(&self, _key: &str, _start: isize, _stop: isize) -> Result<(), KvError> {
        Ok(())
    }

    async fn pipeline(&self, _commands: &[Command]) -> Result<(), KvError> {
        Ok(())
    }
}
