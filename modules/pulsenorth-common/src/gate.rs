//! Acceptance gate between adapters and the writer. Confidence is a hard
//! floor; relevance can be satisfied by score, by a Canadian jurisdiction,
//! or by a Canada-focus entity mention.

use crate::types::Candidate;

/// Jurisdictions that satisfy the gate without a relevance score.
const CANADA_JURISDICTIONS: &[&str] =
    &["Canada", "Ontario", "Quebec", "Alberta", "British Columbia"];

/// Display-cased entity names that satisfy the gate on their own.
const CANADA_FOCUS_ENTITIES: &[&str] = &[
    "Government of Canada",
    "ISED",
    "CIFAR",
    "Mila",
    "Vector Institute",
    "Amii",
    "University of Toronto",
    "University of Alberta",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateThresholds {
    pub min_confidence: f64,
    pub min_relevance: f64,
}

impl GateThresholds {
    /// Thresholds for the live ingest path.
    pub const LIVE: GateThresholds =
        GateThresholds { min_confidence: 0.82, min_relevance: 0.45 };

    /// Looser thresholds for the historical backfill sweep.
    pub const BACKFILL: GateThresholds =
        GateThresholds { min_confidence: 0.72, min_relevance: 0.30 };
}

/// Accept a candidate iff confidence clears the floor AND any of: the
/// relevance score clears its floor, the jurisdiction is Canadian, or a
/// Canada-focus entity appears.
pub fn is_accepted(candidate: &Candidate, thresholds: GateThresholds) -> bool {
    if candidate.confidence < thresholds.min_confidence {
        return false;
    }
    if candidate.relevance >= thresholds.min_relevance {
        return true;
    }
    if CANADA_JURISDICTIONS.contains(&candidate.jurisdiction.as_str()) {
        return true;
    }
    candidate
        .entities
        .iter()
        .any(|entity| CANADA_FOCUS_ENTITIES.contains(&entity.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Language, SourceType};
    use chrono::Utc;

    fn candidate(confidence: f64, relevance: f64, jurisdiction: &str, entities: &[&str]) -> Candidate {
        Candidate {
            source_id: "test-1".into(),
            source_type: SourceType::Media,
            category: Category::News,
            title: "AI roundup".into(),
            description: String::new(),
            url: "https://example.org/ai".into(),
            publisher: "Test".into(),
            published_at: Utc::now(),
            language: Language::En,
            jurisdiction: jurisdiction.into(),
            entities: entities.iter().map(|e| e.to_string()).collect(),
            tags: vec!["ai".into()],
            hash: "h".into(),
            confidence,
            relevance,
        }
    }

    #[test]
    fn confidence_floor_is_hard() {
        assert!(!is_accepted(&candidate(0.5, 0.9, "Canada", &["Mila"]), GateThresholds::LIVE));
        assert!(is_accepted(&candidate(0.82, 0.45, "Global", &[]), GateThresholds::LIVE));
    }

    #[test]
    fn entity_clause_admits_low_relevance() {
        // Accepted via the Canada-focus entity despite Global jurisdiction
        // and a relevance score below threshold.
        let with_entity = candidate(0.9, 0.2, "Global", &["Mila"]);
        assert!(is_accepted(&with_entity, GateThresholds::LIVE));

        let without_entity = candidate(0.9, 0.2, "Global", &[]);
        assert!(!is_accepted(&without_entity, GateThresholds::LIVE));
    }

    #[test]
    fn jurisdiction_clause_admits_provinces() {
        for j in ["Canada", "Ontario", "Quebec", "Alberta", "British Columbia"] {
            assert!(is_accepted(&candidate(0.85, 0.0, j, &[]), GateThresholds::LIVE));
        }
        assert!(!is_accepted(&candidate(0.85, 0.0, "Global", &[]), GateThresholds::LIVE));
    }

    #[test]
    fn acceptance_is_monotone_in_relevance() {
        // If B is accepted and A only differs by higher relevance, A is too.
        let b = candidate(0.85, 0.45, "Global", &[]);
        let a = candidate(0.85, 0.80, "Global", &[]);
        assert!(is_accepted(&b, GateThresholds::LIVE));
        assert!(is_accepted(&a, GateThresholds::LIVE));
    }

    #[test]
    fn backfill_thresholds_are_looser() {
        let c = candidate(0.75, 0.35, "Global", &[]);
        assert!(!is_accepted(&c, GateThresholds::LIVE));
        assert!(is_accepted(&c, GateThresholds::BACKFILL));
    }
}
