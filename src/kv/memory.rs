use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Command, Kv, KvError};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
    List(Vec<String>),
}

#[derive(Default)]
struct Inner {
    values: HashMap<String, Value>,
    expiry: HashMap<String, Instant>,
}

impl Inner {
    fn purge(&mut self, key: &str) {
        if let Some(deadline) = self.expiry.get(key) {
            if Instant::now() >= *deadline {
                self.values.remove(key);
                self.expiry.remove(key);
            }
        }
    }

    fn apply(&mut self, command: &Command) -> Result<(), KvError> {
        match command {
            Command::Set { key, value } => {
                self.values.insert(key.clone(), Value::Str(value.clone()));
                self.expiry.remove(key);
            }
            Command::Incr { key } => {
                self.incr(key)?;
            }
            Command::HSet { key, fields } => {
                let map = match self
                    .values
                    .entry(key.clone())
                    .or_insert_with(|| Value::Hash(HashMap::new()))
                {
                    Value::Hash(map) => map,
                    _ => return Err(wrong_type(key)),
                };
                for (field, value) in fields {
                    map.insert(field.clone(), value.clone());
                }
            }
            Command::SAdd { key, member } => {
                let set = match self
                    .values
                    .entry(key.clone())
                    .or_insert_with(|| Value::Set(HashSet::new()))
                {
                    Value::Set(set) => set,
                    _ => return Err(wrong_type(key)),
                };
                set.insert(member.clone());
            }
            Command::LPush { key, value } => {
                let list = match self
                    .values
                    .entry(key.clone())
                    .or_insert_with(|| Value::List(Vec::new()))
                {
                    Value::List(list) => list,
                    _ => return Err(wrong_type(key)),
                };
                list.insert(0, value.clone());
            }
            Command::LTrim { key, start, stop } => {
                if let Some(Value::List(list)) = self.values.get_mut(key) {
                    let (start, stop) = resolve_range(list.len(), *start, *stop);
                    *list = if start > stop {
                        Vec::new()
                    } else {
                        list[start..=stop].to_vec()
                    };
                }
            }
        }
        Ok(())
    }

    fn incr(&mut self, key: &str) -> Result<i64, KvError> {
        let current = match self.values.get(key) {
            Some(Value::Str(s)) => s
                .parse::<i64>()
                .map_err(|_| KvError::Backend(format!("value at {key} is not an integer")))?,
            Some(_) => return Err(wrong_type(key)),
            None => 0,
        };
        let next = current + 1;
        self.values.insert(key.to_string(), Value::Str(next.to_string()));
        Ok(next)
    }
}

fn wrong_type(key: &str) -> KvError {
    KvError::Backend(format!("wrong value type at key {key}"))
}

/// Clamp a redis-style inclusive range (supporting negative indexes) to list
/// bounds. Returns (start, stop) with start > stop meaning "empty".
fn resolve_range(len: usize, start: isize, stop: isize) -> (usize, usize) {
    let len = len as isize;
    let norm = |i: isize| if i < 0 { (len + i).max(0) } else { i };
    let start = norm(start).min(len) as usize;
    let stop = norm(stop).min(len - 1).max(-1);
    if stop < 0 {
        return (1, 0);
    }
    (start, stop as usize)
}

/// In-process store with the same command surface as the remote one. Used by
/// the test suite and by local runs without a configured backend.
#[derive(Default)]
pub struct MemoryKv {
    inner: Mutex<Inner>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Kv for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut inner = self.inner.lock().await;
        inner.purge(key);
        match inner.values.get(key) {
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut inner = self.inner.lock().await;
        inner.apply(&Command::Set {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), KvError> {
        let mut inner = self.inner.lock().await;
        inner
            .values
            .insert(key.to_string(), Value::Str(value.to_string()));
        inner
            .expiry
            .insert(key.to_string(), Instant::now() + Duration::from_secs(ttl_secs));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, KvError> {
        let mut inner = self.inner.lock().await;
        inner.purge(key);
        inner.expiry.remove(key);
        Ok(inner.values.remove(key).is_some())
    }

    async fn incr(&self, key: &str) -> Result<i64, KvError> {
        let mut inner = self.inner.lock().await;
        inner.purge(key);
        inner.incr(key)
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        let mut inner = self.inner.lock().await;
        inner.purge(key);
        Ok(inner.values.contains_key(key))
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), KvError> {
        let mut inner = self.inner.lock().await;
        if inner.values.contains_key(key) {
            inner
                .expiry
                .insert(key.to_string(), Instant::now() + Duration::from_secs(ttl_secs));
        }
        Ok(())
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<(), KvError> {
        let mut inner = self.inner.lock().await;
        inner.apply(&Command::HSet {
            key: key.to_string(),
            fields: fields.to_vec(),
        })
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, KvError> {
        let mut inner = self.inner.lock().await;
        inner.purge(key);
        match inner.values.get(key) {
            Some(Value::Hash(map)) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, KvError> {
        let mut inner = self.inner.lock().await;
        inner.purge(key);
        let map = match inner
            .values
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(HashMap::new()))
        {
            Value::Hash(map) => map,
            _ => return Err(wrong_type(key)),
        };
        let current = map
            .get(field)
            .map(|v| v.parse::<i64>())
            .transpose()
            .map_err(|_| KvError::Backend(format!("hash field {field} at {key} is not an integer")))?
            .unwrap_or(0);
        let next = current + delta;
        map.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError> {
        let mut inner = self.inner.lock().await;
        inner.apply(&Command::SAdd {
            key: key.to_string(),
            member: member.to_string(),
        })
    }

    async fn scard(&self, key: &str) -> Result<u64, KvError> {
        let mut inner = self.inner.lock().await;
        inner.purge(key);
        match inner.values.get(key) {
            Some(Value::Set(set)) => Ok(set.len() as u64),
            Some(_) => Err(wrong_type(key)),
            None => Ok(0),
        }
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut inner = self.inner.lock().await;
        inner.apply(&Command::LPush {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, KvError> {
        let mut inner = self.inner.lock().await;
        inner.purge(key);
        match inner.values.get(key) {
            Some(Value::List(list)) => {
                let (start, stop) = resolve_range(list.len(), start, stop);
                if start > stop {
                    Ok(Vec::new())
                } else {
                    Ok(list[start..=stop].to_vec())
                }
            }
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> Result<(), KvError> {
        let mut inner = self.inner.lock().await;
        inner.apply(&Command::LTrim {
            key: key.to_string(),
            start,
            stop,
        })
    }

    async fn pipeline(&self, commands: &[Command]) -> Result<(), KvError> {
        let mut inner = self.inner.lock().await;
        for command in commands {
            inner.apply(command)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_range;

    #[test]
    fn range_keeps_first_n() {
        assert_eq!(resolve_range(10, 0, 4), (0, 4));
    }

    #[test]
    fn range_clamps_stop_to_len() {
        assert_eq!(resolve_range(3, 0, 49), (0, 2));
    }

    #[test]
    fn range_negative_stop() {
        assert_eq!(resolve_range(5, 0, -1), (0, 4));
    }

    #[test]
    fn range_empty_when_inverted() {
        let (start, stop) = resolve_range(5, 4, 1);
        assert!(start > stop);
    }
}
