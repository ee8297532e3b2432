use std::sync::Arc;

use crate::kv::{Kv, KvError};

use super::models::RateLimitDecision;

/// Fixed-window rate limiter over a shared counter key.
///
/// The window is anchored to the first request (counter creation sets the
/// expiry), not to the calendar; a burst straddling a window edge can reach
/// twice the limit. That is the accepted tradeoff of this algorithm and not
/// something callers should try to paper over.
#[derive(Clone)]
pub struct RateLimiter {
    kv: Arc<dyn Kv>,
}

impl RateLimiter {
    pub fn new(kv: Arc<dyn Kv>) -> Self {
        Self { kv }
    }

    pub async fn check(
        &self,
        key: &str,
        limit: u64,
        window_secs: u64,
    ) -> Result<RateLimitDecision, KvError> {
        let full_key = format!("ratelimit:{key}");
        let count = self.kv.incr(&full_key).await?;

        // The increment that created the key opens the window.
        if count == 1 {
            self.kv.expire(&full_key, window_secs).await?;
        }

        let count = count.max(0) as u64;
        Ok(RateLimitDecision {
            allowed: count <= limit,
            limit,
            remaining: limit.saturating_sub(count),
            count,
        })
    }
}
