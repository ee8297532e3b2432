use std::sync::Arc;

use pixedge::kv::{Kv, MemoryKv};
use pixedge::store::LinkService;

fn test_links() -> LinkService {
    let kv: Arc<dyn Kv> = Arc::new(MemoryKv::new());
    LinkService::new(kv)
}

#[tokio::test]
async fn test_token_redeems_exactly_once() {
    let links = test_links();
    let token = links.create_link_token(42).await.unwrap();

    assert_eq!(links.redeem_link_token(&token).await.unwrap(), Some(42));
    // Consumed on first redemption.
    assert_eq!(links.redeem_link_token(&token).await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_token_redeems_to_none() {
    let links = test_links();
    assert_eq!(links.redeem_link_token("bogus123").await.unwrap(), None);
}

#[tokio::test]
async fn test_link_resolves_both_directions() {
    let links = test_links();
    links.link_accounts(42, "alice").await.unwrap();

    assert!(links.is_linked(42).await.unwrap());
    assert_eq!(
        links.linked_web_account(42).await.unwrap(),
        Some("alice".to_string())
    );
    assert_eq!(links.linked_telegram("alice").await.unwrap(), Some(42));
}

#[tokio::test]
async fn test_unlink_clears_both_directions() {
    let links = test_links();
    links.link_accounts(42, "alice").await.unwrap();

    assert!(links.unlink(42).await.unwrap());
    assert!(!links.is_linked(42).await.unwrap());
    assert_eq!(links.linked_web_account(42).await.unwrap(), None);
    assert_eq!(links.linked_telegram("alice").await.unwrap(), None);

    // A second unlink finds nothing and reports it.
    assert!(!links.unlink(42).await.unwrap());
}

#[tokio::test]
async fn test_relink_is_last_writer_wins() {
    let links = test_links();
    links.link_accounts(42, "alice").await.unwrap();
    links.link_accounts(42, "bob").await.unwrap();

    assert_eq!(
        links.linked_web_account(42).await.unwrap(),
        Some("bob".to_string())
    );
    assert_eq!(links.linked_telegram("bob").await.unwrap(), Some(42));
    // The displaced mapping is orphaned, not cleaned up.
    assert_eq!(links.linked_telegram("alice").await.unwrap(), Some(42));
}

#[tokio::test]
async fn test_fresh_token_survives_an_older_redemption() {
    let links = test_links();
    let first = links.create_link_token(42).await.unwrap();
    let second = links.create_link_token(42).await.unwrap();

    assert_eq!(links.redeem_link_token(&first).await.unwrap(), Some(42));
    assert_eq!(links.redeem_link_token(&second).await.unwrap(), Some(42));
}
