use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{Command, Kv, KvError};

/// Redis-backed store client. A single `ConnectionManager` multiplexes every
/// request handler over one reconnecting connection; it is cheap to clone.
#[derive(Clone)]
pub struct RedisKv {
    manager: ConnectionManager,
}

impl RedisKv {
    pub async fn connect(url: &str) -> Result<Self, KvError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait]
impl Kv for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.conn();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut conn = self.conn();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), KvError> {
        let mut conn = self.conn();
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, KvError> {
        let mut conn = self.conn();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn incr(&self, key: &str) -> Result<i64, KvError> {
        let mut conn = self.conn();
        let count: i64 = conn.incr(key, 1).await?;
        Ok(count)
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        let mut conn = self.conn();
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), KvError> {
        let mut conn = self.conn();
        let _: bool = conn.expire(key, ttl_secs as i64).await?;
        Ok(())
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<(), KvError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let _: () = conn.hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, KvError> {
        let mut conn = self.conn();
        let entries: Vec<(String, String)> = conn.hgetall(key).await?;
        Ok(entries)
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, KvError> {
        let mut conn = self.conn();
        let value: i64 = conn.hincr(key, field, delta).await?;
        Ok(value)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError> {
        let mut conn = self.conn();
        let _: i64 = conn.sadd(key, member).await?;
        Ok(())
    }

    async fn scard(&self, key: &str) -> Result<u64, KvError> {
        let mut conn = self.conn();
        let count: u64 = conn.scard(key).await?;
        Ok(count)
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut conn = self.conn();
        let _: i64 = conn.lpush(key, value).await?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, KvError> {
        let mut conn = self.conn();
        let values: Vec<String> = conn.lrange(key, start, stop).await?;
        Ok(values)
    }

    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> Result<(), KvError> {
        let mut conn = self.conn();
        let _: () = conn.ltrim(key, start, stop).await?;
        Ok(())
    }

    async fn pipeline(&self, commands: &[Command]) -> Result<(), KvError> {
        if commands.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        for command in commands {
            match command {
                Command::Set { key, value } => {
                    pipe.cmd("SET").arg(key).arg(value).ignore();
                }
                Command::Incr { key } => {
                    pipe.cmd("INCR").arg(key).ignore();
                }
                Command::HSet { key, fields } => {
                    let cmd = pipe.cmd("HSET").arg(key);
                    for (field, value) in fields {
                        cmd.arg(field).arg(value);
                    }
                    cmd.ignore();
                }
                Command::SAdd { key, member } => {
                    pipe.cmd("SADD").arg(key).arg(member).ignore();
                }
                Command::LPush { key, value } => {
                    pipe.cmd("LPUSH").arg(key).arg(value).ignore();
                }
                Command::LTrim { key, start, stop } => {
                    pipe.cmd("LTRIM").arg(key).arg(*start).arg(*stop).ignore();
                }
            }
        }
        let mut conn = self.conn();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}
