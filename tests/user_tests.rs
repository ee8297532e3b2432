use std::sync::Arc;

use pixedge::kv::{Kv, MemoryKv};
use pixedge::store::{UserDirectory, UserError};

fn test_users() -> UserDirectory {
    let kv: Arc<dyn Kv> = Arc::new(MemoryKv::new());
    UserDirectory::new(kv)
}

#[tokio::test]
async fn test_register_then_login() {
    let users = test_users();
    let record = users
        .register("alice@example.com", "hunter2hunter2", Some("Alice"))
        .await
        .unwrap();
    assert_eq!(record.email, "alice@example.com");
    assert_eq!(record.name, "Alice");

    let verified = users
        .verify_credentials("alice@example.com", "hunter2hunter2")
        .await
        .unwrap()
        .expect("credentials should verify");
    assert_eq!(verified.id, record.id);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let users = test_users();
    users
        .register("alice@example.com", "hunter2hunter2", None)
        .await
        .unwrap();

    let err = users
        .register("ALICE@example.com", "differentpass", None)
        .await
        .unwrap_err();
    assert!(matches!(err, UserError::AlreadyExists));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email() {
    let users = test_users();
    users
        .register("alice@example.com", "hunter2hunter2", None)
        .await
        .unwrap();

    assert!(users
        .verify_credentials("alice@example.com", "wrongpassword")
        .await
        .unwrap()
        .is_none());
    assert!(users
        .verify_credentials("nobody@example.com", "hunter2hunter2")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_email_is_normalized() {
    let users = test_users();
    users
        .register("  Alice@Example.COM ", "hunter2hunter2", None)
        .await
        .unwrap();

    // Login matches case-insensitively on the normalized form.
    assert!(users
        .verify_credentials("alice@example.com", "hunter2hunter2")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_name_defaults_to_email_local_part() {
    let users = test_users();
    let record = users
        .register("bob@example.com", "hunter2hunter2", None)
        .await
        .unwrap();
    assert_eq!(record.name, "bob");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let users = test_users();
    let record = users
        .register("alice@example.com", "hunter2hunter2", None)
        .await
        .unwrap();

    let token = users.create_session(&record.id).await.unwrap();
    assert_eq!(users.session_user(&token).await.unwrap(), Some(record.id));

    assert!(users.destroy_session(&token).await.unwrap());
    assert_eq!(users.session_user(&token).await.unwrap(), None);
    assert!(!users.destroy_session(&token).await.unwrap());
}
