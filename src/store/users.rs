use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task;

use crate::kv::{Command, Kv, KvError};

use super::ledger::generate_id;

const SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;
const SESSION_TOKEN_LEN: usize = 32;

fn email_key(email: &str) -> String {
    format!("user:email:{email}")
}

fn user_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

fn session_key(token: &str) -> String {
    format!("session:{token}")
}

#[derive(Debug, Error)]
pub enum UserError {
    /// Duplicate registration; callers translate this to a 409.
    #[error("a user with that email already exists")]
    AlreadyExists,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] KvError),
}

/// Stored account record. Serialized as JSON at `user:<id>` with camelCase
/// field names; `user:email:<email>` indexes it by login email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Registration, credential checks, and opaque session tokens.
///
/// Sessions live in the store with a 30-day TTL; there is no server-side
/// session state beyond that entry.
#[derive(Clone)]
pub struct UserDirectory {
    kv: Arc<dyn Kv>,
}

impl UserDirectory {
    pub fn new(kv: Arc<dyn Kv>) -> Self {
        Self { kv }
    }

    /// Create an account. Fails with `AlreadyExists` when the email index
    /// already points at a user. The email index and the record are written
    /// in one batch.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<UserRecord, UserError> {
        let email = email.trim().to_ascii_lowercase();
        if self.kv.get(&email_key(&email)).await?.is_some() {
            return Err(UserError::AlreadyExists);
        }

        let password_hash = hash_password(password.to_string()).await?;
        let now = chrono::Utc::now().to_rfc3339();
        let record = UserRecord {
            id: generate_id(),
            name: name
                .map(str::to_string)
                .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string()),
            email: email.clone(),
            password_hash,
            image: None,
            created_at: now.clone(),
            updated_at: now,
        };

        let encoded = serde_json::to_string(&record)
            .map_err(|e| UserError::Store(KvError::Backend(format!("user encode: {e}"))))?;
        self.kv
            .pipeline(&[
                Command::Set {
                    key: email_key(&email),
                    value: record.id.clone(),
                },
                Command::Set {
                    key: user_key(&record.id),
                    value: encoded,
                },
            ])
            .await?;

        Ok(record)
    }

    /// Resolve email + password to the account, or `None` on any mismatch.
    /// Invalid credentials are not an error; the caller maps them to 401.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, UserError> {
        let email = email.trim().to_ascii_lowercase();
        let Some(user_id) = self.kv.get(&email_key(&email)).await? else {
            return Ok(None);
        };
        let Some(raw) = self.kv.get(&user_key(&user_id)).await? else {
            return Ok(None);
        };
        let Ok(record) = serde_json::from_str::<UserRecord>(&raw) else {
            return Ok(None);
        };

        if verify_password(password.to_string(), record.password_hash.clone()).await? {
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    pub async fn create_session(&self, user_id: &str) -> Result<String, KvError> {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_TOKEN_LEN)
            .map(char::from)
            .collect();
        self.kv
            .set_ex(&session_key(&token), user_id, SESSION_TTL_SECS)
            .await?;
        Ok(token)
    }

    pub async fn session_user(&self, token: &str) -> Result<Option<String>, KvError> {
        self.kv.get(&session_key(token)).await
    }

    pub async fn destroy_session(&self, token: &str) -> Result<bool, KvError> {
        self.kv.del(&session_key(token)).await
    }
}

/// Argon2 work happens off the async runtime.
async fn hash_password(password: String) -> Result<String, UserError> {
    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| UserError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| UserError::Hash(format!("hashing worker failed: {e}")))?
}

async fn verify_password(password: String, hash: String) -> Result<bool, UserError> {
    task::spawn_blocking(move || match PasswordHash::new(&hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    })
    .await
    .map_err(|e| UserError::Hash(format!("verification worker failed: {e}")))
}
