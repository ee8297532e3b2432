use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// Public base URL used to build `{base}/i/{id}` links, no trailing slash.
    pub base_url: String,
    /// Connection URL for the key-value store. Absent means degraded mode:
    /// every store-backed feature falls back to its safe default.
    pub redis_url: Option<String>,
    pub telegram: TelegramConfig,
    /// Maximum accepted upload size in bytes.
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token. Absent disables the bot front end and web uploads (media
    /// bytes live in a Telegram channel).
    pub bot_token: Option<String>,
    /// Chat id of the storage channel media is copied into.
    pub storage_chat_id: Option<i64>,
    /// Optional chat id for operational log messages.
    pub log_chat_id: Option<i64>,
    /// Bot API endpoint, overridable for tests.
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            storage_chat_id: None,
            log_chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        let redis_url = std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty());

        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|s| !s.is_empty());
        let storage_chat_id = std::env::var("TELEGRAM_STORAGE_CHAT_ID")
            .ok()
            .and_then(|s| s.parse().ok());
        let log_chat_id = std::env::var("TELEGRAM_LOG_CHAT_ID")
            .ok()
            .and_then(|s| s.parse().ok());
        let api_base = std::env::var("TELEGRAM_API_BASE")
            .unwrap_or_else(|_| "https://api.telegram.org".to_string())
            .trim_end_matches('/')
            .to_string();

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(20 * 1024 * 1024); // Bot API file download limit

        let config = Config {
            bind_address,
            base_url,
            redis_url,
            telegram: TelegramConfig {
                bot_token,
                storage_chat_id,
                log_chat_id,
                api_base,
            },
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "BASE_URL cannot be empty".to_string(),
            ));
        }

        if self.telegram.storage_chat_id.is_some() && self.telegram.bot_token.is_none() {
            return Err(ConfigError::ValidationError(
                "TELEGRAM_STORAGE_CHAT_ID requires TELEGRAM_BOT_TOKEN".to_string(),
            ));
        }

        if self.redis_url.is_none() {
            tracing::warn!(
                "REDIS_URL is not set. Running in degraded mode: uploads, linking and \
                 rate limiting will not persist."
            );
        }

        Ok(())
    }

    pub fn public_link(&self, id: &str) -> String {
        format!("{}/i/{id}", self.base_url)
    }

    pub fn direct_link(&self, id: &str, ext: &str) -> String {
        format!("{}/i/{id}.{ext}", self.base_url)
    }
}
