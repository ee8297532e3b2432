use std::sync::Arc;
use std::time::Instant;

use rand::Rng;

use crate::kv::{Command, Kv, KvError};

use super::models::{ImageRecord, MediaClass, NewImage, ServiceStats, UploadSource};

const ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 8;
/// Per-user upload list is a display cache of the most recent uploads.
const UPLOAD_LIST_LEN: isize = 50;

fn image_key(id: &str) -> String {
    format!("snap:{id}")
}

fn user_uploads_key(user_id: &str) -> String {
    format!("user:{user_id}:uploads")
}

const TOTAL_UPLOADS_KEY: &str = "stats:total_uploads";
const WEB_UPLOADS_KEY: &str = "stats:web_uploads";
const BOT_UPLOADS_KEY: &str = "stats:bot_uploads";
const IMAGES_KEY: &str = "stats:images";
const VIDEOS_KEY: &str = "stats:videos";
const USERS_SET_KEY: &str = "stats:users";

/// Generate a fresh opaque id: 8 lowercase alphanumeric characters.
pub fn generate_id() -> String {
    random_suffix(ID_LEN)
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())] as char)
        .collect()
}

fn sanitize_id(base: &str) -> String {
    base.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Records uploaded media, per-user upload lists, and the aggregate counters.
///
/// All writes for one upload go out as a single pipelined batch; the batch is
/// not transactional, so a store-side failure can apply a prefix of it. That
/// partial application is accepted and never compensated.
#[derive(Clone)]
pub struct UploadLedger {
    kv: Arc<dyn Kv>,
}

impl UploadLedger {
    pub fn new(kv: Arc<dyn Kv>) -> Self {
        Self { kv }
    }

    /// Persist a new upload and bump every counter it touches in one batch.
    pub async fn save_image(
        &self,
        record: &NewImage,
        source: UploadSource,
        user_id: Option<&str>,
    ) -> Result<(), KvError> {
        let metadata_json = serde_json::to_string(&record.metadata)
            .map_err(|e| KvError::Backend(format!("metadata encode: {e}")))?;

        let mut commands = vec![
            Command::HSet {
                key: image_key(&record.id),
                fields: vec![
                    ("telegram_file_id".to_string(), record.telegram_file_id.clone()),
                    ("created_at".to_string(), record.created_at.to_string()),
                    ("views".to_string(), "0".to_string()),
                    ("metadata".to_string(), metadata_json),
                ],
            },
            Command::Incr {
                key: TOTAL_UPLOADS_KEY.to_string(),
            },
            Command::Incr {
                key: match source {
                    UploadSource::Web => WEB_UPLOADS_KEY.to_string(),
                    UploadSource::Bot => BOT_UPLOADS_KEY.to_string(),
                },
            },
        ];

        if let Some(user_id) = user_id {
            commands.push(Command::SAdd {
                key: USERS_SET_KEY.to_string(),
                member: user_id.to_string(),
            });
            commands.push(Command::LPush {
                key: user_uploads_key(user_id),
                value: record.id.clone(),
            });
            commands.push(Command::LTrim {
                key: user_uploads_key(user_id),
                start: 0,
                stop: UPLOAD_LIST_LEN - 1,
            });
        }

        commands.push(Command::Incr {
            key: match MediaClass::from_mime(&record.metadata.mime_type) {
                MediaClass::Video => VIDEOS_KEY.to_string(),
                MediaClass::Image => IMAGES_KEY.to_string(),
            },
        });

        self.kv.pipeline(&commands).await
    }

    /// Fetch a record, counting the fetch as a view. There is deliberately no
    /// peek variant on this path: reading and view-counting are one
    /// operation. Returns the post-increment record.
    pub async fn fetch_and_count(&self, id: &str) -> Result<Option<ImageRecord>, KvError> {
        let key = image_key(id);
        if !self.kv.exists(&key).await? {
            return Ok(None);
        }
        self.kv.hincrby(&key, "views", 1).await?;
        let entries = self.kv.hgetall(&key).await?;
        Ok(ImageRecord::from_hash(id, &entries))
    }

    /// Dashboard listing: resolve the cached id list without counting views.
    /// Ids whose record has since been deleted are silently skipped.
    pub async fn user_uploads(&self, user_id: &str) -> Result<Vec<ImageRecord>, KvError> {
        let ids = self
            .kv
            .lrange(&user_uploads_key(user_id), 0, UPLOAD_LIST_LEN - 1)
            .await?;

        let mut records = Vec::with_capacity(ids.len());
        for id in &ids {
            let entries = self.kv.hgetall(&image_key(id)).await?;
            if let Some(record) = ImageRecord::from_hash(id, &entries) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Remove the record. Counters and cached user lists are deliberately
    /// left alone; `user_uploads` tolerates the dangling list entry.
    /// Idempotent: deleting a missing record returns false.
    pub async fn delete_image(&self, id: &str) -> Result<bool, KvError> {
        self.kv.del(&image_key(id)).await
    }

    /// Whether `user_id`'s cached upload list contains `id`. Used by the
    /// route layer as its ownership check before deletion.
    pub async fn user_owns(&self, user_id: &str, id: &str) -> Result<bool, KvError> {
        let ids = self
            .kv
            .lrange(&user_uploads_key(user_id), 0, UPLOAD_LIST_LEN - 1)
            .await?;
        Ok(ids.iter().any(|candidate| candidate == id))
    }

    /// Add a user to the distinct-users set without recording an upload.
    pub async fn register_user(&self, user_id: &str) -> Result<(), KvError> {
        self.kv.sadd(USERS_SET_KEY, user_id).await
    }

    /// Fan out the independent counter reads concurrently. `ping_ms` is the
    /// measured latency of this very fan-out, reported as a health signal.
    pub async fn stats(&self) -> Result<ServiceStats, KvError> {
        let started = Instant::now();
        let (total_uploads, total_users, web_uploads, bot_uploads, total_images, total_videos) = tokio::join!(
            self.kv.get(TOTAL_UPLOADS_KEY),
            self.kv.scard(USERS_SET_KEY),
            self.kv.get(WEB_UPLOADS_KEY),
            self.kv.get(BOT_UPLOADS_KEY),
            self.kv.get(IMAGES_KEY),
            self.kv.get(VIDEOS_KEY),
        );
        let ping_ms = started.elapsed().as_millis() as u64;

        Ok(ServiceStats {
            total_uploads: parse_counter(total_uploads?),
            total_users: total_users?,
            web_uploads: parse_counter(web_uploads?),
            bot_uploads: parse_counter(bot_uploads?),
            total_images: parse_counter(total_images?),
            total_videos: parse_counter(total_videos?),
            ping_ms,
        })
    }

    pub async fn id_exists(&self, id: &str) -> Result<bool, KvError> {
        self.kv.exists(&image_key(id)).await
    }

    /// Offer exactly three available ids derived from `base`: sanitized to
    /// `[a-z0-9-]`, suffixes `-1`..`-5` first, then random 4-character
    /// suffixes until three are collected.
    pub async fn suggest_ids(&self, base: &str) -> Result<Vec<String>, KvError> {
        let sanitized = sanitize_id(base);
        let mut suggestions = Vec::with_capacity(3);

        for i in 1..=5 {
            let candidate = format!("{sanitized}-{i}");
            if !self.id_exists(&candidate).await? {
                suggestions.push(candidate);
                if suggestions.len() >= 3 {
                    break;
                }
            }
        }
        while suggestions.len() < 3 {
            let candidate = format!("{sanitized}-{}", random_suffix(4));
            if suggestions.contains(&candidate) {
                continue;
            }
            if !self.id_exists(&candidate).await? {
                suggestions.push(candidate);
            }
        }

        Ok(suggestions)
    }
}

/// Counters read back as strings; a missing or malformed value counts as 0.
fn parse_counter(raw: Option<String>) -> u64 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{generate_id, parse_counter, sanitize_id};

    #[test]
    fn sanitize_lowercases_and_replaces() {
        assert_eq!(sanitize_id("My File!"), "my-file-");
        assert_eq!(sanitize_id("already-ok-42"), "already-ok-42");
    }

    #[test]
    fn counter_parse_defaults_to_zero() {
        assert_eq!(parse_counter(None), 0);
        assert_eq!(parse_counter(Some("not a number".to_string())), 0);
        assert_eq!(parse_counter(Some("17".to_string())), 17);
    }

    #[test]
    fn generated_ids_are_url_safe() {
        let id = generate_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
