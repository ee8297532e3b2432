use std::sync::Arc;

use pixedge::kv::{Kv, MemoryKv};
use pixedge::store::ApiKeyService;

fn test_keys() -> ApiKeyService {
    let kv: Arc<dyn Kv> = Arc::new(MemoryKv::new());
    ApiKeyService::new(kv)
}

#[tokio::test]
async fn test_issued_key_verifies_to_its_owner() {
    let keys = test_keys();
    let key = keys.create("alice").await.unwrap();

    assert!(key.starts_with("pe_"));
    assert_eq!(keys.verify(&key).await.unwrap(), Some("alice".to_string()));
    assert_eq!(keys.user_key("alice").await.unwrap(), Some(key));
}

#[tokio::test]
async fn test_unknown_or_unprefixed_keys_fail() {
    let keys = test_keys();
    keys.create("alice").await.unwrap();

    assert_eq!(keys.verify("pe_doesnotexist").await.unwrap(), None);
    // A session-shaped token never reaches the key lookup.
    assert_eq!(keys.verify("sessiontoken").await.unwrap(), None);
}

#[tokio::test]
async fn test_no_key_before_first_issue() {
    let keys = test_keys();
    assert_eq!(keys.user_key("alice").await.unwrap(), None);
}

#[tokio::test]
async fn test_rotation_keeps_the_old_key_valid() {
    let keys = test_keys();
    let old = keys.create("alice").await.unwrap();
    let new = keys.create("alice").await.unwrap();
    assert_ne!(old, new);

    // The account now reports the new key...
    assert_eq!(keys.user_key("alice").await.unwrap(), Some(new.clone()));
    assert_eq!(keys.verify(&new).await.unwrap(), Some("alice".to_string()));
    // ...but the old forward mapping is never removed, so it still verifies.
    assert_eq!(keys.verify(&old).await.unwrap(), Some("alice".to_string()));
}
