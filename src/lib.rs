//! pixedge - media hosting over a Telegram storage channel
//!
//! This crate provides short-link media hosting with two front ends:
//! - REST API with multipart upload, sessions and API keys
//! - Telegram bot (webhook) that hosts media sent in chat
//!
//! Media bytes live in a Telegram channel; everything else (upload records,
//! per-user lists, counters, account links, rate limits) lives in a Redis
//! key-value store behind the `kv::Kv` trait.

pub mod api;
pub mod bot;
pub mod config;
pub mod kv;
pub mod store;

use std::sync::Arc;

use bot::BotClient;
use config::Config;
use kv::Kv;
use store::{ApiKeyService, LinkService, RateLimiter, UploadLedger, UserDirectory};

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub kv: Arc<dyn Kv>,
    pub ledger: UploadLedger,
    pub linking: LinkService,
    pub api_keys: ApiKeyService,
    pub rate_limiter: RateLimiter,
    pub users: UserDirectory,
    /// Absent when no bot token is configured; the webhook and upload paths
    /// degrade accordingly.
    pub bot: Option<BotClient>,
}

impl AppState {
    pub fn new(config: Config, kv: Arc<dyn Kv>, bot: Option<BotClient>) -> Self {
        Self {
            ledger: UploadLedger::new(Arc::clone(&kv)),
            linking: LinkService::new(Arc::clone(&kv)),
            api_keys: ApiKeyService::new(Arc::clone(&kv)),
            rate_limiter: RateLimiter::new(Arc::clone(&kv)),
            users: UserDirectory::new(Arc::clone(&kv)),
            config,
            kv,
            bot,
        }
    }
}
