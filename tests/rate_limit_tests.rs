use std::sync::Arc;

use pixedge::kv::{Kv, MemoryKv};
use pixedge::store::RateLimiter;

fn test_limiter() -> RateLimiter {
    let kv: Arc<dyn Kv> = Arc::new(MemoryKv::new());
    RateLimiter::new(kv)
}

#[tokio::test]
async fn test_counts_down_then_blocks() {
    let limiter = test_limiter();

    let first = limiter.check("info:1.2.3.4", 3, 60).await.unwrap();
    assert!(first.allowed);
    assert_eq!(first.remaining, 2);

    let second = limiter.check("info:1.2.3.4", 3, 60).await.unwrap();
    assert!(second.allowed);
    assert_eq!(second.remaining, 1);

    let third = limiter.check("info:1.2.3.4", 3, 60).await.unwrap();
    assert!(third.allowed);
    assert_eq!(third.remaining, 0);

    let fourth = limiter.check("info:1.2.3.4", 3, 60).await.unwrap();
    assert!(!fourth.allowed);
    assert_eq!(fourth.remaining, 0);
    assert_eq!(fourth.count, 4);
}

#[tokio::test]
async fn test_keys_are_independent() {
    let limiter = test_limiter();

    for _ in 0..3 {
        limiter.check("upload:alice", 2, 60).await.unwrap();
    }
    let alice = limiter.check("upload:alice", 2, 60).await.unwrap();
    assert!(!alice.allowed);

    let bob = limiter.check("upload:bob", 2, 60).await.unwrap();
    assert!(bob.allowed);
    assert_eq!(bob.remaining, 1);
}

#[tokio::test]
async fn test_decision_reports_the_limit() {
    let limiter = test_limiter();
    let decision = limiter.check("info:5.6.7.8", 60, 60).await.unwrap();
    assert_eq!(decision.limit, 60);
    assert_eq!(decision.remaining, 59);
}
