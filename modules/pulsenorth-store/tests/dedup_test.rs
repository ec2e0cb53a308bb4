//! Dedup writer tests. Require a Postgres instance; set DATABASE_TEST_URL or
//! these tests are skipped.

use chrono::Utc;
use pulsenorth_common::relevance::fingerprint;
use pulsenorth_common::types::{Candidate, Category, Language, SourceType};
use pulsenorth_store::{connect, DevelopmentStore, WriteOutcome};
use uuid::Uuid;

async fn test_store() -> Option<DevelopmentStore> {
    let url = match std::env::var("DATABASE_TEST_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_TEST_URL not set; skipping dedup tests");
            return None;
        }
    };
    let pool = connect(&url).await.expect("Postgres connect failed");
    let store = DevelopmentStore::new(pool);
    store.migrate().await.expect("Migrations failed");
    Some(store)
}

fn candidate() -> Candidate {
    let published_at = Utc::now() - chrono::Duration::hours(1);
    let source_id = format!("test-{}", Uuid::new_v4().simple());
    let url = format!("https://example.org/{source_id}");
    let hash = fingerprint(&source_id, &url, published_at);
    Candidate {
        source_id,
        source_type: SourceType::Media,
        category: Category::News,
        title: "Canadian AI lab announces benchmark".into(),
        description: String::new(),
        url,
        publisher: "Test Wire".into(),
        published_at,
        language: Language::En,
        jurisdiction: "Canada".into(),
        entities: vec!["Mila".into()],
        tags: vec!["benchmark".into()],
        hash,
        confidence: 0.9,
        relevance: 0.8,
    }
}

#[tokio::test]
async fn writing_the_same_record_twice_yields_one_row() {
    let Some(store) = test_store().await else { return };
    let candidate = candidate();

    let first = store.insert(&candidate).await;
    let inserted = match first {
        WriteOutcome::Inserted(dev) => dev,
        other => panic!("first write should insert, got {other:?}"),
    };
    assert!(candidate.published_at <= inserted.ingested_at);

    let second = store.insert(&candidate).await;
    assert!(matches!(second, WriteOutcome::Duplicate));

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM ai_developments WHERE hash = $1")
            .bind(&candidate.hash)
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn identical_identity_produces_identical_hash() {
    let at = Utc::now();
    let a = fingerprint("id", "https://example.org/x", at);
    let b = fingerprint("id", "https://example.org/x", at);
    assert_eq!(a, b);
}
