use serde::{Deserialize, Serialize};

/// Which front end produced an upload. Drives the per-source counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadSource {
    Web,
    Bot,
}

/// Classification of a stored medium derived from its MIME type.
///
/// GIFs count as video: they are delivered by the storage backend as
/// animations, not stills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaClass {
    Image,
    Video,
}

impl MediaClass {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("video/") || mime_type == "image/gif" {
            MediaClass::Video
        } else {
            MediaClass::Image
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Size in bytes as reported by the uploader.
    pub size: u64,
    /// MIME type string, e.g. `image/png`.
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// A stored upload. The record is authoritative; the per-user upload list is
/// only a display cache. Mutated by view increments and deletion, nothing
/// else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Opaque short code, URL-safe; doubles as the public link path segment.
    pub id: String,
    pub telegram_file_id: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub views: u64,
    pub metadata: MediaMetadata,
}

impl ImageRecord {
    /// Rebuild a record from the stored hash fields. Returns `None` when the
    /// hash is empty or lacks the file reference (e.g. a partially-written or
    /// deleted entry); callers treat that the same as a missing record.
    pub fn from_hash(id: &str, entries: &[(String, String)]) -> Option<Self> {
        let field = |name: &str| {
            entries
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        let telegram_file_id = field("telegram_file_id")?.to_string();
        let created_at = field("created_at").and_then(|v| v.parse().ok()).unwrap_or(0);
        let views = field("views").and_then(|v| v.parse().ok()).unwrap_or(0);
        let metadata = field("metadata")
            .and_then(|v| serde_json::from_str(v).ok())
            .unwrap_or(MediaMetadata {
                size: 0,
                mime_type: String::new(),
            });
        Some(ImageRecord {
            id: id.to_string(),
            telegram_file_id,
            created_at,
            views,
            metadata,
        })
    }
}

/// A new upload before persistence; `views` always starts at zero.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub id: String,
    pub telegram_file_id: String,
    pub created_at: i64,
    pub metadata: MediaMetadata,
}

/// Aggregate counters plus the round-trip latency of reading them.
/// Counters are monotonic; deletion never rolls them back.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub total_uploads: u64,
    pub total_users: u64,
    pub web_uploads: u64,
    pub bot_uploads: u64,
    pub total_images: u64,
    pub total_videos: u64,
    pub ping_ms: u64,
}

/// Outcome of a fixed-window rate-limit check.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gif_classifies_as_video() {
        assert_eq!(MediaClass::from_mime("image/gif"), MediaClass::Video);
        assert_eq!(MediaClass::from_mime("video/mp4"), MediaClass::Video);
        assert_eq!(MediaClass::from_mime("image/png"), MediaClass::Image);
        assert_eq!(MediaClass::from_mime("image/jpeg"), MediaClass::Image);
    }

    #[test]
    fn record_requires_file_reference() {
        // A hash holding only a stray views counter is not a record.
        let entries = vec![("views".to_string(), "3".to_string())];
        assert!(ImageRecord::from_hash("abc", &entries).is_none());
    }

    #[test]
    fn record_parses_stored_fields() {
        let entries = vec![
            ("telegram_file_id".to_string(), "file-123".to_string()),
            ("created_at".to_string(), "1700000000000".to_string()),
            ("views".to_string(), "7".to_string()),
            (
                "metadata".to_string(),
                r#"{"size":2048,"type":"image/png"}"#.to_string(),
            ),
        ];
        let record = ImageRecord::from_hash("abc", &entries).unwrap();
        assert_eq!(record.telegram_file_id, "file-123");
        assert_eq!(record.created_at, 1_700_000_000_000);
        assert_eq!(record.views, 7);
        assert_eq!(record.metadata.size, 2048);
        assert_eq!(record.metadata.mime_type, "image/png");
    }
}
