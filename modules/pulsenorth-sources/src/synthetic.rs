//! Synthetic fallback generator for dev environments. Only runs when
//! `enable_synthetic_fallback` is set and a batch would otherwise be empty.
//! Records live in the `https://example.com/` URL space so the maintenance
//! purge can find them later.

use chrono::{Duration, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use uuid::Uuid;

use pulsenorth_common::relevance::{fingerprint, round2};
use pulsenorth_common::types::{Candidate, Category, Language, SourceType};

const PUBLISHERS: &[(&str, SourceType, Category, &str)] = &[
    ("ISED", SourceType::Gov, Category::Policy, "Canada"),
    ("BetaKit", SourceType::Media, Category::News, "Canada"),
    ("Vector Institute", SourceType::Academic, Category::Research, "Ontario"),
    ("Mila", SourceType::Academic, Category::Research, "Quebec"),
    ("Amii", SourceType::Academic, Category::Research, "Alberta"),
    ("CIFAR", SourceType::Industry, Category::Industry, "Canada"),
];

const TITLE_STEMS: &[&str] = &[
    "New foundation model benchmark released for multilingual evaluation",
    "Federal consultation opens on AI procurement guardrails",
    "Canadian startup secures funding for sovereign compute orchestration",
    "AI safety incident taxonomy updated by industry coalition",
    "Hospital consortium pilots diagnostic copilots in bilingual workflows",
    "Open-source retrieval stack improves low-resource French performance",
];

const ENTITY_SETS: &[&[&str]] = &[
    &["Government of Canada", "ISED", "AIDA"],
    &["Mila", "Yoshua Bengio"],
    &["Vector Institute", "University of Toronto"],
    &["Amii", "University of Alberta"],
];

const TAG_BANK: &[&str] = &[
    "compute",
    "healthcare",
    "regulation",
    "safety",
    "evaluation",
    "bilingual",
    "infrastructure",
    "funding",
];

/// Generate one synthetic record. Confidence and relevance land above the
/// live gate thresholds so fallback batches are never filtered back out.
pub fn generate_item() -> Candidate {
    let mut rng = rand::rng();

    let (publisher, source_type, default_category, jurisdiction) = *PUBLISHERS
        .choose(&mut rng)
        .expect("publisher table is non-empty");
    let category = if source_type == SourceType::Funding {
        Category::Funding
    } else {
        default_category
    };
    let title = *TITLE_STEMS.choose(&mut rng).expect("title table is non-empty");

    let published_at = Utc::now() - Duration::minutes(rng.random_range(0..=240));
    let source_id = format!(
        "{}-{}",
        publisher.to_lowercase().replace(' ', "-"),
        &Uuid::new_v4().simple().to_string()[..12]
    );
    let url = format!("https://example.com/{source_id}");
    let language = *[Language::En, Language::Fr, Language::En]
        .choose(&mut rng)
        .expect("language table is non-empty");
    let entities: Vec<String> = ENTITY_SETS
        .choose(&mut rng)
        .expect("entity table is non-empty")
        .iter()
        .map(|e| e.to_string())
        .collect();
    let tag_count = rng.random_range(2..=4);
    let tags: Vec<String> = TAG_BANK
        .choose_multiple(&mut rng, tag_count)
        .map(|t| t.to_string())
        .collect();

    Candidate {
        hash: fingerprint(&source_id, &url, published_at),
        source_id,
        source_type,
        category,
        title: title.to_string(),
        description: String::new(),
        url,
        publisher: publisher.to_string(),
        published_at,
        language,
        jurisdiction: jurisdiction.to_string(),
        entities,
        tags,
        confidence: round2(rng.random_range(0.84..0.98)),
        relevance: round2(rng.random_range(0.65..0.98)),
    }
}

/// Generate a small batch (1–3 records).
pub fn generate_batch() -> Vec<Candidate> {
    let count = rand::rng().random_range(1..=3);
    (0..count).map(|_| generate_item()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsenorth_common::gate::{is_accepted, GateThresholds};

    #[test]
    fn synthetic_records_pass_the_live_gate() {
        for _ in 0..50 {
            let item = generate_item();
            assert!(is_accepted(&item, GateThresholds::LIVE), "rejected: {item:?}");
        }
    }

    #[test]
    fn synthetic_records_are_purgeable_by_url() {
        let item = generate_item();
        assert!(item.url.starts_with("https://example.com/"));
    }

    #[test]
    fn synthetic_batches_are_small() {
        for _ in 0..20 {
            let batch = generate_batch();
            assert!((1..=3).contains(&batch.len()));
        }
    }
}
