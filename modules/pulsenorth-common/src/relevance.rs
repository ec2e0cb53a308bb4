//! Normalization heuristics shared by every source adapter: the AI keyword
//! gate, Canada-relevance scoring, jurisdiction and language inference, tag
//! extraction, and the content fingerprint.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::types::Language;

/// A record is only considered at all if its text matches one of these.
pub const AI_KEYWORDS: &[&str] = &[
    "ai",
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "llm",
    "generative",
];

pub const CANADA_KEYWORDS: &[&str] = &[
    "canada",
    "canadian",
    "ottawa",
    "quebec",
    "ontario",
    "alberta",
    "british columbia",
    "manitoba",
    "saskatchewan",
    "nova scotia",
    "new brunswick",
    "newfoundland",
    "pei",
];

/// Lowercased names of Canada-focused organizations used for relevance
/// scoring. The gate's entity clause uses the display-cased variant in
/// `crate::gate`.
pub const CANADA_ENTITIES: &[&str] = &[
    "government of canada",
    "ised",
    "cifar",
    "mila",
    "vector institute",
    "amii",
    "university of toronto",
    "university of alberta",
    "mcgill",
    "ubc",
];

/// Token → province. Order matters: first hit wins, as a stable tiebreak.
const PROVINCE_TOKENS: &[(&str, &str)] = &[
    ("ontario", "Ontario"),
    ("toronto", "Ontario"),
    ("waterloo", "Ontario"),
    ("quebec", "Quebec"),
    ("montreal", "Quebec"),
    ("alberta", "Alberta"),
    ("edmonton", "Alberta"),
    ("calgary", "Alberta"),
    ("british columbia", "British Columbia"),
    ("vancouver", "British Columbia"),
];

/// Closed set of French function-word markers. Three or more hits flags the
/// text as French regardless of what the upstream claims.
const FRENCH_MARKERS: &[&str] = &[
    " des ", " dans ", " pour ", " l'", " d'", " les ", " une ", " avec ", " sur ", " est ",
];

const TAG_STOPWORDS: &[&str] = &[
    "with", "from", "that", "this", "have", "into", "their", "about", "across", "opens",
];

/// Upstream identifiers longer than this are collapsed to a hashed form.
pub const MAX_SOURCE_ID_LEN: usize = 240;

/// True if the text mentions any AI keyword (case-insensitive substring).
pub fn contains_ai(text: &str) -> bool {
    let low = text.to_lowercase();
    AI_KEYWORDS.iter().any(|keyword| low.contains(keyword))
}

/// Heuristic Canada-relevance score in [0, 1] over the joined text parts.
pub fn canada_relevance_score(parts: &[&str]) -> f64 {
    let blob = parts.join(" ").to_lowercase();
    let mut score = 0.0;

    if CANADA_KEYWORDS.iter().any(|keyword| blob.contains(keyword)) {
        score += 0.35;
    }
    let entity_hits = CANADA_ENTITIES.iter().filter(|ent| blob.contains(*ent)).count();
    score += (entity_hits as f64 * 0.2).min(0.4);
    if blob.contains("government of canada") || blob.contains("canada.ca") {
        score += 0.25;
    }
    if blob.contains("openalex.org") {
        score += 0.05;
    }

    score.min(1.0)
}

/// Scan the joined parts for a province token, then a Canada mention, else
/// fall back to `default` (the catalog-level jurisdiction, usually "Global").
pub fn infer_jurisdiction(parts: &[&str], default: &str) -> String {
    let blob = parts.join(" ").to_lowercase();
    for (token, province) in PROVINCE_TOKENS {
        if blob.contains(token) {
            return (*province).to_string();
        }
    }
    if blob.contains("canada") || blob.contains("canadian") {
        return "Canada".to_string();
    }
    default.to_string()
}

/// Language detection: the French-marker scan wins over the upstream claim,
/// then a claimed `en`/`fr` is trusted, everything else is `other`.
pub fn detect_language(claimed: Option<&str>, text: &str) -> Language {
    let low = text.to_lowercase();
    let marker_hits = FRENCH_MARKERS.iter().filter(|m| low.contains(*m)).count();
    if marker_hits >= 3 {
        return Language::Fr;
    }
    match claimed {
        Some("en") => Language::En,
        Some("fr") => Language::Fr,
        _ => Language::Other,
    }
}

/// Up to five lowercase 4+ letter tokens from the title, stopwords removed,
/// insertion order preserved. Falls back to `["ai"]` so the column is never
/// empty.
pub fn extract_tags(title: &str) -> Vec<String> {
    let pattern = regex::Regex::new(r"[a-zA-Z]{4,}").expect("Invalid tag token regex");
    let lowered = title.to_lowercase();
    let mut unique: Vec<String> = Vec::new();
    for token in pattern.find_iter(&lowered) {
        let token = token.as_str();
        if TAG_STOPWORDS.contains(&token) {
            continue;
        }
        if !unique.iter().any(|t| t == token) {
            unique.push(token.to_string());
        }
    }
    unique.truncate(5);
    if unique.is_empty() {
        unique.push("ai".to_string());
    }
    unique
}

/// Trim an upstream identifier and collapse over-long values to
/// `{prefix}-{sha256[0..24]}` so the column stays bounded while remaining
/// stable for a given input.
pub fn canonical_source_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() <= MAX_SOURCE_ID_LEN {
        return trimmed.to_string();
    }
    let digest = hex::encode(Sha256::digest(trimmed.as_bytes()));
    let prefix: String = trimmed.chars().take(200).collect();
    format!("{prefix}-{}", &digest[..24])
}

/// Content identity: SHA-256 over `source_id|url|published_at` (ISO-8601).
/// Identical inputs always produce the identical hex digest.
pub fn fingerprint(source_id: &str, url: &str, published_at: DateTime<Utc>) -> String {
    let material = format!("{source_id}|{url}|{}", published_at.to_rfc3339());
    hex::encode(Sha256::digest(material.as_bytes()))
}

/// Publication dates are never allowed to be in the future.
pub fn clamp_future(published_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    published_at.min(now)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Recency adjustment for slow-moving policy feeds (CRTC, Canada Gazette).
/// Fresh items get a confidence/relevance boost; stale items are dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecencyAdjustment {
    Boost { confidence: f64, relevance: f64 },
    Keep,
    Drop,
}

pub fn policy_recency_adjustment(
    published_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> RecencyAdjustment {
    let age_days = (now - published_at).num_days();
    if age_days > 540 {
        return RecencyAdjustment::Drop;
    }
    if age_days <= 14 {
        RecencyAdjustment::Boost { confidence: 0.09, relevance: 0.14 }
    } else if age_days <= 45 {
        RecencyAdjustment::Boost { confidence: 0.06, relevance: 0.10 }
    } else if age_days <= 120 {
        RecencyAdjustment::Boost { confidence: 0.03, relevance: 0.06 }
    } else {
        RecencyAdjustment::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn ai_gate_matches_substrings_case_insensitive() {
        assert!(contains_ai("New LLM benchmark released"));
        assert!(contains_ai("Advances in Machine Learning for health"));
        assert!(contains_ai("generative models in production"));
        assert!(!contains_ai("Quantum computing update"));
    }

    #[test]
    fn relevance_scores_keyword_and_entities() {
        // Keyword only
        assert_eq!(canada_relevance_score(&["research in canada"]), 0.35);
        // Keyword + one entity
        let score = canada_relevance_score(&["Mila lab expands in Quebec"]);
        assert!((score - 0.55).abs() < 1e-9);
        // Entity hits cap at 0.4
        let score = canada_relevance_score(&["mila vector institute amii cifar"]);
        assert!((score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn relevance_gc_domain_bonus_and_cap() {
        let score =
            canada_relevance_score(&["Government of Canada announcement", "https://canada.ca/x"]);
        // 0.35 keyword + 0.2 entity + 0.25 domain
        assert!((score - 0.8).abs() < 1e-9);
        let score = canada_relevance_score(&[
            "government of canada ised cifar mila canada",
            "https://canada.ca",
            "openalex.org",
        ]);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn jurisdiction_prefers_province_over_country() {
        assert_eq!(infer_jurisdiction(&["AI hub opens in Toronto, Canada"], "Global"), "Ontario");
        assert_eq!(infer_jurisdiction(&["Canadian startup funding"], "Global"), "Canada");
        assert_eq!(infer_jurisdiction(&["AI policy in the EU"], "Global"), "Global");
        assert_eq!(infer_jurisdiction(&["AI policy in the EU"], "Canada"), "Canada");
    }

    #[test]
    fn language_french_markers_win() {
        let fr = "Nouvelles mesures pour l'encadrement des algorithmes dans les services publics";
        assert_eq!(detect_language(Some("en"), fr), Language::Fr);
        assert_eq!(detect_language(Some("en"), "An English title"), Language::En);
        assert_eq!(detect_language(Some("fr"), "courte"), Language::Fr);
        assert_eq!(detect_language(None, "short"), Language::Other);
        assert_eq!(detect_language(Some("de"), "kurz"), Language::Other);
    }

    #[test]
    fn tags_dedup_and_stopwords() {
        let tags = extract_tags("Canada opens consultation about AI safety with safety experts");
        assert_eq!(tags, vec!["canada", "consultation", "safety", "experts"]);
    }

    #[test]
    fn tags_cap_at_five_and_fall_back() {
        let tags = extract_tags("alpha bravo charlie delta echo foxtrot golf");
        assert_eq!(tags.len(), 5);
        assert_eq!(extract_tags("an ai op"), vec!["ai"]);
    }

    #[test]
    fn source_id_collapse_is_bounded_and_stable() {
        let short = canonical_source_id("  https://openalex.org/W123  ");
        assert_eq!(short, "https://openalex.org/W123");

        let long = "x".repeat(512);
        let collapsed = canonical_source_id(&long);
        assert!(collapsed.len() <= MAX_SOURCE_ID_LEN);
        assert_eq!(collapsed, canonical_source_id(&long));
        assert!(collapsed.starts_with(&"x".repeat(200)));
    }

    #[test]
    fn fingerprint_is_stable_for_identical_inputs() {
        let at = Utc.with_ymd_and_hms(2026, 2, 17, 12, 0, 0).unwrap();
        let a = fingerprint("id-1", "https://example.org/a", at);
        let b = fingerprint("id-1", "https://example.org/a", at);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let c = fingerprint("id-2", "https://example.org/a", at);
        assert_ne!(a, c);
    }

    #[test]
    fn future_dates_clamp_to_now() {
        let now = Utc::now();
        let future = now + Duration::days(3);
        assert_eq!(clamp_future(future, now), now);
        let past = now - Duration::days(3);
        assert_eq!(clamp_future(past, now), past);
    }

    #[test]
    fn recency_adjustment_tiers() {
        let now = Utc::now();
        assert_eq!(
            policy_recency_adjustment(now - Duration::days(7), now),
            RecencyAdjustment::Boost { confidence: 0.09, relevance: 0.14 }
        );
        assert_eq!(
            policy_recency_adjustment(now - Duration::days(30), now),
            RecencyAdjustment::Boost { confidence: 0.06, relevance: 0.10 }
        );
        assert_eq!(
            policy_recency_adjustment(now - Duration::days(100), now),
            RecencyAdjustment::Boost { confidence: 0.03, relevance: 0.06 }
        );
        assert_eq!(policy_recency_adjustment(now - Duration::days(400), now), RecencyAdjustment::Keep);
        assert_eq!(policy_recency_adjustment(now - Duration::days(600), now), RecencyAdjustment::Drop);
    }
}
