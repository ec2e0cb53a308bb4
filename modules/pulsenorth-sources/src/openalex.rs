//! OpenAlex works API adapter: the live academic source and the
//! month-windowed historical fetch used by the backfill engine.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use pulsenorth_common::relevance::{
    canada_relevance_score, canonical_source_id, clamp_future, contains_ai, detect_language,
    extract_tags, fingerprint, infer_jurisdiction, round2,
};
use pulsenorth_common::types::{Candidate, Category, SourceType};

use crate::adapter::{http_client, SourceAdapter};

const OPENALEX_URL: &str = "https://api.openalex.org/works";

pub struct OpenAlexAdapter {
    client: reqwest::Client,
}

impl OpenAlexAdapter {
    pub fn new() -> Self {
        Self { client: http_client(15) }
    }

    /// Historical fetch for one month window, filtered to works with a
    /// Canadian author institution. Used by the backfill engine.
    pub async fn fetch_month(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        per_page: u32,
        max_pages: u32,
    ) -> Result<Vec<Candidate>> {
        let filter = format!(
            "from_publication_date:{start_date},to_publication_date:{end_date},authorships.institutions.country_code:CA"
        );
        let mut records = Vec::new();
        for page in 1..=max_pages {
            let payload: Value = self
                .client
                .get(OPENALEX_URL)
                .query(&[
                    ("filter", filter.as_str()),
                    ("search", "artificial intelligence OR machine learning OR generative"),
                    ("per-page", &per_page.to_string()),
                    ("sort", "publication_date:desc"),
                    ("page", &page.to_string()),
                ])
                .send()
                .await
                .context("OpenAlex month fetch failed")?
                .error_for_status()
                .context("OpenAlex returned non-success status")?
                .json()
                .await
                .context("OpenAlex returned malformed JSON")?;

            let results = payload["results"].as_array().cloned().unwrap_or_default();
            if results.is_empty() {
                break;
            }
            for result in &results {
                if let Some(candidate) = normalize_work(result, WorkMode::Backfill) {
                    records.push(candidate);
                }
            }
        }
        Ok(records)
    }
}

impl Default for OpenAlexAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for OpenAlexAdapter {
    fn key(&self) -> &'static str {
        "openalex"
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Candidate>> {
        let payload: Value = self
            .client
            .get(OPENALEX_URL)
            .query(&[
                ("search", "artificial intelligence Canada"),
                ("per-page", &limit.to_string()),
                ("sort", "publication_date:desc"),
            ])
            .send()
            .await
            .context("OpenAlex fetch failed")?
            .error_for_status()
            .context("OpenAlex returned non-success status")?
            .json()
            .await
            .context("OpenAlex returned malformed JSON")?;

        let results = payload["results"].as_array().cloned().unwrap_or_default();
        Ok(results
            .iter()
            .filter_map(|result| normalize_work(result, WorkMode::Live))
            .collect())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum WorkMode {
    Live,
    Backfill,
}

/// Map one OpenAlex work to a candidate. Backfill mode requires a real
/// publication date and boosts relevance for Canadian institutions.
fn normalize_work(result: &Value, mode: WorkMode) -> Option<Candidate> {
    let title = result["display_name"].as_str().unwrap_or("").trim().to_string();
    if title.is_empty() || !contains_ai(&title) {
        return None;
    }

    let source_id = match result["id"].as_str() {
        Some(id) => id.to_string(),
        None => format!("openalex-{}", &Uuid::new_v4().simple().to_string()[..10]),
    };
    let source_id = canonical_source_id(&source_id);

    let now = Utc::now();
    let published_at = match result["publication_date"].as_str() {
        Some(raw) => parse_publication_date(raw)?,
        None if mode == WorkMode::Backfill => return None,
        None => now,
    };
    let published_at = clamp_future(published_at, now);

    let url = result["primary_location"]["landing_page_url"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://openalex.org/{source_id}"));

    let mut institutions: Vec<String> = Vec::new();
    let mut has_canadian_institution = false;
    for auth in result["authorships"].as_array().unwrap_or(&Vec::new()) {
        for inst in auth["institutions"].as_array().unwrap_or(&Vec::new()) {
            if let Some(name) = inst["display_name"].as_str() {
                if !institutions.iter().any(|i| i == name) {
                    institutions.push(name.to_string());
                }
            }
            if inst["country_code"].as_str().map(str::to_uppercase).as_deref() == Some("CA") {
                has_canadian_institution = true;
            }
        }
    }

    let entity_blob = institutions
        .iter()
        .take(8)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    let mut relevance = canada_relevance_score(&[&title, &url, &entity_blob]);
    let confidence = match mode {
        WorkMode::Live => round2(0.65 + 0.3 * relevance),
        WorkMode::Backfill => {
            if has_canadian_institution {
                relevance = (relevance + 0.35).min(1.0);
            }
            round2(0.62 + 0.35 * relevance)
        }
    };

    let jurisdiction_hint = if has_canadian_institution { "canada" } else { "" };
    let jurisdiction = infer_jurisdiction(&[&title, &entity_blob, jurisdiction_hint], "Global");
    let language = detect_language(result["language"].as_str(), &title);

    institutions.truncate(5);
    Some(Candidate {
        hash: fingerprint(&source_id, &url, published_at),
        source_id,
        source_type: SourceType::Academic,
        category: Category::Research,
        tags: extract_tags(&title),
        title,
        description: String::new(),
        url,
        publisher: "OpenAlex".to_string(),
        published_at,
        language,
        jurisdiction,
        entities: institutions,
        confidence,
        relevance,
    })
}

fn parse_publication_date(raw: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(title: &str, date: Option<&str>, country: &str) -> Value {
        serde_json::json!({
            "id": "https://openalex.org/W1",
            "display_name": title,
            "publication_date": date,
            "language": "en",
            "primary_location": {"landing_page_url": "https://example.org/paper"},
            "authorships": [
                {"institutions": [
                    {"display_name": "University of Toronto", "country_code": country}
                ]}
            ]
        })
    }

    #[test]
    fn drops_non_ai_titles() {
        let w = work("Protein folding survey", Some("2024-01-10"), "CA");
        assert!(normalize_work(&w, WorkMode::Live).is_none());
    }

    #[test]
    fn live_mode_uses_openalex_confidence_formula() {
        let w = work("Machine learning for Canadian health data", Some("2024-01-10"), "CA");
        let c = normalize_work(&w, WorkMode::Live).unwrap();
        // relevance: keyword (canadian) 0.35 + entity (university of toronto) 0.2
        assert!((c.relevance - 0.55).abs() < 1e-9);
        assert_eq!(c.confidence, round2(0.65 + 0.3 * 0.55));
        assert_eq!(c.publisher, "OpenAlex");
        assert_eq!(c.jurisdiction, "Ontario");
    }

    #[test]
    fn backfill_mode_requires_publication_date() {
        let w = work("Deep learning benchmark", None, "CA");
        assert!(normalize_work(&w, WorkMode::Backfill).is_none());
        assert!(normalize_work(&w, WorkMode::Live).is_some());
    }

    #[test]
    fn backfill_mode_boosts_canadian_institutions() {
        let w = work("Deep learning benchmark", Some("2023-06-01"), "CA");
        let c = normalize_work(&w, WorkMode::Backfill).unwrap();
        // base relevance 0.2 (entity) + 0.35 CA boost
        assert!((c.relevance - 0.55).abs() < 1e-9);
        assert_eq!(c.confidence, round2(0.62 + 0.35 * 0.55));
        // CA hint maps to Canada even without a textual mention, but the
        // institution token wins first.
        assert_eq!(c.jurisdiction, "Ontario");

        let w_us = work("Deep learning benchmark", Some("2023-06-01"), "US");
        let c_us = normalize_work(&w_us, WorkMode::Backfill).unwrap();
        assert!((c_us.relevance - 0.2).abs() < 1e-9);
    }

    #[test]
    fn future_publication_dates_clamp() {
        let w = work("Generative models in 2199", Some("2199-01-01"), "CA");
        let c = normalize_work(&w, WorkMode::Live).unwrap();
        assert!(c.published_at <= Utc::now());
    }
}
