//! Lock discipline tests. Require a Redis instance; set REDIS_TEST_URL or
//! these tests are skipped.

use pulsenorth_coord::{ingest_lock_key, CoordClient};
use uuid::Uuid;

async fn test_client() -> Option<CoordClient> {
    let url = match std::env::var("REDIS_TEST_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("REDIS_TEST_URL not set; skipping lock tests");
            return None;
        }
    };
    Some(CoordClient::connect(&url).await.expect("Redis connect failed"))
}

#[tokio::test]
async fn lock_is_mutually_exclusive() {
    let Some(coord) = test_client().await else { return };
    let key = ingest_lock_key(&format!("test_{}", Uuid::new_v4().simple()));
    let token_a = Uuid::new_v4().to_string();
    let token_b = Uuid::new_v4().to_string();

    assert!(coord.try_acquire_lock(&key, &token_a, 30).await.unwrap());
    // Second holder is refused while the first still owns the key.
    assert!(!coord.try_acquire_lock(&key, &token_b, 30).await.unwrap());

    assert!(coord.release_lock(&key, &token_a).await.unwrap());
    assert!(coord.try_acquire_lock(&key, &token_b, 30).await.unwrap());
    coord.release_lock(&key, &token_b).await.unwrap();
}

#[tokio::test]
async fn release_never_deletes_a_foreign_token() {
    let Some(coord) = test_client().await else { return };
    let key = ingest_lock_key(&format!("test_{}", Uuid::new_v4().simple()));
    let owner = Uuid::new_v4().to_string();
    let stale = Uuid::new_v4().to_string();

    assert!(coord.try_acquire_lock(&key, &owner, 30).await.unwrap());
    // A stale runner releasing after TTL expiry must not free the new lock.
    assert!(!coord.release_lock(&key, &stale).await.unwrap());
    // The owner still holds it.
    assert!(!coord.try_acquire_lock(&key, &stale, 30).await.unwrap());
    assert!(coord.release_lock(&key, &owner).await.unwrap());
}

#[tokio::test]
async fn json_blobs_roundtrip_and_tolerate_absence() {
    let Some(coord) = test_client().await else { return };
    let key = format!("test:blob:{}", Uuid::new_v4().simple());

    assert!(coord.get_json(&key).await.unwrap().is_none());

    let value = serde_json::json!({"state": "running", "scanned": 42});
    coord.set_json(&key, &value).await.unwrap();
    assert_eq!(coord.get_json(&key).await.unwrap(), Some(value));
}
