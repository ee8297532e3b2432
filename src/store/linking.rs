use std::sync::Arc;

use crate::kv::{Kv, KvError};

use super::ledger::generate_id;

/// One-time link tokens expire after five minutes.
pub const LINK_TOKEN_TTL_SECS: u64 = 300;

fn token_key(token: &str) -> String {
    format!("link_token:{token}")
}

fn telegram_link_key(telegram_id: i64) -> String {
    format!("telegram_link:{telegram_id}")
}

fn web_link_key(web_user_id: &str) -> String {
    format!("web_link:{web_user_id}")
}

/// Reconciles the two identity spaces: web user ids and Telegram numeric ids.
///
/// A link is a pair of reciprocal entries, `telegram_link:<tid>` and
/// `web_link:<uid>`, kept in O(1) lookup in both directions without a
/// secondary index. Both entries are written or removed together in every
/// mutation; there is no lock, so racing links resolve last-writer-wins.
#[derive(Clone)]
pub struct LinkService {
    kv: Arc<dyn Kv>,
}

impl LinkService {
    pub fn new(kv: Arc<dyn Kv>) -> Self {
        Self { kv }
    }

    /// Issue a fresh one-time token for `telegram_id`. No collision check:
    /// the token space makes collisions negligible, and a colliding write
    /// would simply overwrite the older token.
    pub async fn create_link_token(&self, telegram_id: i64) -> Result<String, KvError> {
        let token = generate_id();
        self.kv
            .set_ex(
                &token_key(&token),
                &telegram_id.to_string(),
                LINK_TOKEN_TTL_SECS,
            )
            .await?;
        Ok(token)
    }

    /// Redeem a token, consuming it. Best-effort single-use: the get and the
    /// delete are two store commands, so two racing redeemers have a narrow
    /// window in which both observe the token. Single-key commands themselves
    /// are atomic; nothing stronger is assumed of the store.
    pub async fn redeem_link_token(&self, token: &str) -> Result<Option<i64>, KvError> {
        let key = token_key(token);
        let telegram_id = self.kv.get(&key).await?;
        match telegram_id {
            Some(raw) => {
                self.kv.del(&key).await?;
                Ok(raw.parse().ok())
            }
            None => Ok(None),
        }
    }

    /// Write both directional mappings unconditionally, overwriting any prior
    /// link on either side. Linking a second Telegram id to the same web user
    /// orphans the first mapping (its `telegram_link` entry keeps pointing at
    /// the web user while `web_link` moves on); that asymmetry is known and
    /// not corrected here.
    pub async fn link_accounts(&self, telegram_id: i64, web_user_id: &str) -> Result<(), KvError> {
        self.kv
            .set(&telegram_link_key(telegram_id), web_user_id)
            .await?;
        self.kv
            .set(&web_link_key(web_user_id), &telegram_id.to_string())
            .await?;
        Ok(())
    }

    /// Remove both directions of the link. Idempotent: a second call finds no
    /// mapping and returns false without touching anything.
    pub async fn unlink(&self, telegram_id: i64) -> Result<bool, KvError> {
        let web_user_id = self.kv.get(&telegram_link_key(telegram_id)).await?;
        match web_user_id {
            Some(web_user_id) => {
                self.kv.del(&telegram_link_key(telegram_id)).await?;
                self.kv.del(&web_link_key(&web_user_id)).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn is_linked(&self, telegram_id: i64) -> Result<bool, KvError> {
        self.kv.exists(&telegram_link_key(telegram_id)).await
    }

    pub async fn linked_web_account(&self, telegram_id: i64) -> Result<Option<String>, KvError> {
        self.kv.get(&telegram_link_key(telegram_id)).await
    }

    pub async fn linked_telegram(&self, web_user_id: &str) -> Result<Option<i64>, KvError> {
        let raw = self.kv.get(&web_link_key(web_user_id)).await?;
        Ok(raw.and_then(|v| v.parse().ok()))
    }
}
