//! Crossref works API adapter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use pulsenorth_common::relevance::{
    canada_relevance_score, canonical_source_id, clamp, clamp_future, contains_ai,
    extract_tags, fingerprint, infer_jurisdiction, round2,
};
use pulsenorth_common::types::{Candidate, Category, Language, SourceType};

use crate::adapter::{http_client, SourceAdapter};

const CROSSREF_WORKS_URL: &str = "https://api.crossref.org/works";

pub struct CrossrefAdapter {
    client: reqwest::Client,
}

impl CrossrefAdapter {
    pub fn new() -> Self {
        Self { client: http_client(20) }
    }
}

impl Default for CrossrefAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for CrossrefAdapter {
    fn key(&self) -> &'static str {
        "crossref_ai_canada"
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Candidate>> {
        let payload: Value = self
            .client
            .get(CROSSREF_WORKS_URL)
            .query(&[
                ("query", "artificial intelligence canada"),
                ("rows", &limit.to_string()),
                ("sort", "published"),
                ("order", "desc"),
            ])
            .send()
            .await
            .context("Crossref fetch failed")?
            .error_for_status()
            .context("Crossref returned non-success status")?
            .json()
            .await
            .context("Crossref returned malformed JSON")?;

        let items = payload["message"]["items"].as_array().cloned().unwrap_or_default();
        Ok(items.iter().filter_map(normalize_item).collect())
    }
}

fn normalize_item(item: &Value) -> Option<Candidate> {
    let title = item["title"]
        .as_array()
        .and_then(|t| t.first())
        .and_then(|t| t.as_str())
        .map(|t| t.trim().to_string())?;
    if title.is_empty() || !contains_ai(&title) {
        return None;
    }

    let doi = item["DOI"].as_str()?;
    let source_id = canonical_source_id(&format!("crossref-{doi}"));
    let url = item["URL"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://doi.org/{doi}"));

    let now = Utc::now();
    let published_at = item["issued"]["date-parts"]
        .as_array()
        .and_then(|parts| parts.first())
        .and_then(|p| p.as_array())
        .and_then(|p| {
            let year = p.first()?.as_i64()? as i32;
            let month = p.get(1).and_then(|m| m.as_i64()).unwrap_or(1) as u32;
            let day = p.get(2).and_then(|d| d.as_i64()).unwrap_or(1) as u32;
            Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()
        })
        .unwrap_or(now);
    let published_at = clamp_future(published_at, now);

    let authors: Vec<String> = item["author"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|a| {
                    let family = a["family"].as_str()?;
                    match a["given"].as_str() {
                        Some(given) => Some(format!("{given} {family}")),
                        None => Some(family.to_string()),
                    }
                })
                .take(5)
                .collect()
        })
        .unwrap_or_default();
    let publisher_field = item["publisher"].as_str().unwrap_or("").to_string();
    let author_blob = authors.join(" ");

    let relevance = canada_relevance_score(&[&title, &url, &author_blob, &publisher_field]);
    let confidence = round2(clamp(0.5 + 0.4 * relevance, 0.6, 0.95));
    let jurisdiction = infer_jurisdiction(&[&title, &author_blob, &publisher_field], "Global");

    Some(Candidate {
        hash: fingerprint(&source_id, &url, published_at),
        source_id,
        source_type: SourceType::Academic,
        category: Category::Research,
        tags: extract_tags(&title),
        title,
        description: String::new(),
        url,
        publisher: "Crossref".to_string(),
        published_at,
        language: Language::En,
        jurisdiction,
        entities: authors,
        confidence,
        relevance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_a_typical_work() {
        let item = serde_json::json!({
            "DOI": "10.1234/abcd",
            "title": ["Generative models for Canadian climate data"],
            "URL": "https://doi.org/10.1234/abcd",
            "publisher": "Test Press",
            "issued": {"date-parts": [[2025, 11, 3]]},
            "author": [{"given": "Ada", "family": "Lovelace"}]
        });
        let c = normalize_item(&item).unwrap();
        assert_eq!(c.source_id, "crossref-10.1234/abcd");
        assert_eq!(c.entities, vec!["Ada Lovelace".to_string()]);
        assert_eq!(c.published_at, Utc.with_ymd_and_hms(2025, 11, 3, 0, 0, 0).unwrap());
        assert_eq!(c.jurisdiction, "Canada");
    }

    #[test]
    fn requires_title_and_ai_match() {
        let item = serde_json::json!({
            "DOI": "10.1234/efgh",
            "title": ["Bridge engineering retrospective"],
            "issued": {"date-parts": [[2025]]}
        });
        assert!(normalize_item(&item).is_none());
    }
}
