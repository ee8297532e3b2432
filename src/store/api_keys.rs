use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::kv::{Kv, KvError};

const KEY_PREFIX: &str = "pe_";
const KEY_RANDOM_LEN: usize = 24;

fn forward_key(key: &str) -> String {
    format!("apikey:{key}")
}

fn reverse_key(user_id: &str) -> String {
    format!("user:{user_id}:apikey")
}

/// Issues and verifies opaque bearer keys, stored as two reciprocal entries:
/// `apikey:<key> -> user` and `user:<id>:apikey -> key`.
///
/// Rotation overwrites only the reverse entry. The previous key's forward
/// entry stays in place, so an old key keeps verifying until it is deleted
/// explicitly. That matches the deployed behavior and is pinned by a test;
/// revoking on rotation would be an observable change.
#[derive(Clone)]
pub struct ApiKeyService {
    kv: Arc<dyn Kv>,
}

impl ApiKeyService {
    pub fn new(kv: Arc<dyn Kv>) -> Self {
        Self { kv }
    }

    pub async fn create(&self, user_id: &str) -> Result<String, KvError> {
        let key = generate_key();
        self.kv.set(&forward_key(&key), user_id).await?;
        self.kv.set(&reverse_key(user_id), &key).await?;
        Ok(key)
    }

    pub async fn user_key(&self, user_id: &str) -> Result<Option<String>, KvError> {
        self.kv.get(&reverse_key(user_id)).await
    }

    /// Resolve a presented key to its owner. Keys carry no expiry and no
    /// scoping; a valid key is equivalent to the owning user.
    pub async fn verify(&self, key: &str) -> Result<Option<String>, KvError> {
        if !key.starts_with(KEY_PREFIX) {
            return Ok(None);
        }
        self.kv.get(&forward_key(key)).await
    }
}

fn generate_key() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{KEY_PREFIX}{}", suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{generate_key, KEY_PREFIX};

    #[test]
    fn keys_carry_the_public_prefix() {
        let key = generate_key();
        assert!(key.starts_with(KEY_PREFIX));
        assert!(key.len() > KEY_PREFIX.len() + 16);
    }
}
