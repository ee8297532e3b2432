use std::sync::Arc;

use pixedge::kv::{Kv, MemoryKv};
use pixedge::store::models::{MediaMetadata, NewImage, UploadSource};
use pixedge::store::UploadLedger;

fn test_ledger() -> UploadLedger {
    let kv: Arc<dyn Kv> = Arc::new(MemoryKv::new());
    UploadLedger::new(kv)
}

fn sample_image(id: &str, mime_type: &str) -> NewImage {
    NewImage {
        id: id.to_string(),
        telegram_file_id: format!("tg-{id}"),
        created_at: 1_700_000_000_000,
        metadata: MediaMetadata {
            size: 1024,
            mime_type: mime_type.to_string(),
        },
    }
}

#[tokio::test]
async fn test_save_and_fetch_counts_views() {
    let ledger = test_ledger();
    let image = sample_image("abc12345", "image/png");
    ledger
        .save_image(&image, UploadSource::Web, Some("alice"))
        .await
        .unwrap();

    let first = ledger
        .fetch_and_count("abc12345")
        .await
        .unwrap()
        .expect("record should exist");
    assert_eq!(first.views, 1);
    assert_eq!(first.telegram_file_id, "tg-abc12345");
    assert_eq!(first.created_at, 1_700_000_000_000);
    assert_eq!(first.metadata.mime_type, "image/png");

    ledger.fetch_and_count("abc12345").await.unwrap();
    let third = ledger.fetch_and_count("abc12345").await.unwrap().unwrap();
    assert_eq!(third.views, 3);
}

#[tokio::test]
async fn test_missing_record_is_not_created_by_fetch() {
    let ledger = test_ledger();

    assert!(ledger.fetch_and_count("nothere1").await.unwrap().is_none());
    // The failed fetch must not leave a stray record behind.
    assert!(!ledger.id_exists("nothere1").await.unwrap());
    assert!(ledger.fetch_and_count("nothere1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_counters_split_by_source_and_class() {
    let ledger = test_ledger();
    ledger
        .save_image(&sample_image("gif00001", "image/gif"), UploadSource::Bot, Some("42"))
        .await
        .unwrap();
    ledger
        .save_image(&sample_image("png00001", "image/png"), UploadSource::Web, Some("alice"))
        .await
        .unwrap();

    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.total_uploads, 2);
    assert_eq!(stats.web_uploads, 1);
    assert_eq!(stats.bot_uploads, 1);
    // GIFs count as video.
    assert_eq!(stats.total_videos, 1);
    assert_eq!(stats.total_images, 1);
    assert_eq!(stats.total_users, 2);
}

#[tokio::test]
async fn test_user_uploads_most_recent_first() {
    let ledger = test_ledger();
    ledger
        .save_image(&sample_image("first111", "image/png"), UploadSource::Web, Some("alice"))
        .await
        .unwrap();
    ledger
        .save_image(&sample_image("second22", "image/png"), UploadSource::Web, Some("alice"))
        .await
        .unwrap();

    let uploads = ledger.user_uploads("alice").await.unwrap();
    let ids: Vec<&str> = uploads.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["second22", "first111"]);
}

#[tokio::test]
async fn test_user_uploads_skips_deleted_records() {
    let ledger = test_ledger();
    ledger
        .save_image(&sample_image("keep1234", "image/png"), UploadSource::Web, Some("alice"))
        .await
        .unwrap();
    ledger
        .save_image(&sample_image("gone1234", "image/png"), UploadSource::Web, Some("alice"))
        .await
        .unwrap();

    assert!(ledger.delete_image("gone1234").await.unwrap());

    let uploads = ledger.user_uploads("alice").await.unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].id, "keep1234");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let ledger = test_ledger();
    ledger
        .save_image(&sample_image("once1234", "image/png"), UploadSource::Web, None)
        .await
        .unwrap();

    assert!(ledger.delete_image("once1234").await.unwrap());
    assert!(!ledger.delete_image("once1234").await.unwrap());
}

#[tokio::test]
async fn test_deletion_does_not_roll_back_counters() {
    let ledger = test_ledger();
    ledger
        .save_image(&sample_image("temp1234", "image/png"), UploadSource::Web, Some("alice"))
        .await
        .unwrap();
    ledger.delete_image("temp1234").await.unwrap();

    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.total_uploads, 1);
    assert_eq!(stats.total_images, 1);
}

#[tokio::test]
async fn test_ownership_check() {
    let ledger = test_ledger();
    ledger
        .save_image(&sample_image("mine1234", "image/png"), UploadSource::Web, Some("alice"))
        .await
        .unwrap();

    assert!(ledger.user_owns("alice", "mine1234").await.unwrap());
    assert!(!ledger.user_owns("bob", "mine1234").await.unwrap());
    assert!(!ledger.user_owns("alice", "other123").await.unwrap());
}

#[tokio::test]
async fn test_suggestions_avoid_taken_ids() {
    let ledger = test_ledger();
    ledger
        .save_image(&sample_image("name-1", "image/png"), UploadSource::Web, None)
        .await
        .unwrap();

    let suggestions = ledger.suggest_ids("Name").await.unwrap();
    assert_eq!(suggestions.len(), 3);
    for candidate in &suggestions {
        assert_ne!(candidate, "name-1");
        assert!(!ledger.id_exists(candidate).await.unwrap());
        assert!(candidate
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }
    // All three must be distinct.
    assert_ne!(suggestions[0], suggestions[1]);
    assert_ne!(suggestions[1], suggestions[2]);
    assert_ne!(suggestions[0], suggestions[2]);
}

#[tokio::test]
async fn test_stats_on_a_fresh_store_are_all_zero() {
    let ledger = test_ledger();
    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.total_uploads, 0);
    assert_eq!(stats.web_uploads, 0);
    assert_eq!(stats.bot_uploads, 0);
    assert_eq!(stats.total_images, 0);
    assert_eq!(stats.total_videos, 0);
    assert_eq!(stats.total_users, 0);
}

#[tokio::test]
async fn test_register_user_counts_once() {
    let ledger = test_ledger();
    ledger.register_user("42").await.unwrap();
    ledger.register_user("42").await.unwrap();

    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.total_users, 1);
    assert_eq!(stats.total_uploads, 0);
}
