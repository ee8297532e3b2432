//! Without a configured backend the services run over the no-op store.
//! Nothing persists, and every read-side answer is the safe default.

use std::sync::Arc;

use pixedge::kv::{Kv, NoopKv};
use pixedge::store::models::{MediaMetadata, NewImage, UploadSource};
use pixedge::store::{LinkService, RateLimiter, UploadLedger};

fn noop_kv() -> Arc<dyn Kv> {
    Arc::new(NoopKv)
}

#[tokio::test]
async fn test_uploads_do_not_error_but_do_not_persist() {
    let ledger = UploadLedger::new(noop_kv());
    let image = NewImage {
        id: "abc12345".to_string(),
        telegram_file_id: "tg-1".to_string(),
        created_at: 1_700_000_000_000,
        metadata: MediaMetadata {
            size: 10,
            mime_type: "image/png".to_string(),
        },
    };

    ledger
        .save_image(&image, UploadSource::Web, Some("alice"))
        .await
        .unwrap();
    assert!(ledger.fetch_and_count("abc12345").await.unwrap().is_none());
    assert!(ledger.user_uploads("alice").await.unwrap().is_empty());

    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.total_uploads, 0);
    assert_eq!(stats.total_users, 0);
}

#[tokio::test]
async fn test_rate_limiter_always_allows() {
    let limiter = RateLimiter::new(noop_kv());
    for _ in 0..100 {
        let decision = limiter.check("info:1.2.3.4", 3, 60).await.unwrap();
        assert!(decision.allowed);
    }
}

#[tokio::test]
async fn test_links_resolve_to_nothing() {
    let links = LinkService::new(noop_kv());
    let token = links.create_link_token(42).await.unwrap();

    assert_eq!(links.redeem_link_token(&token).await.unwrap(), None);
    assert!(!links.is_linked(42).await.unwrap());
    assert_eq!(links.linked_web_account(42).await.unwrap(), None);
}
