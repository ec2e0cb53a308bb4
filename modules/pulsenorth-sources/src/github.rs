//! GitHub repository search adapter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use pulsenorth_common::relevance::{
    canada_relevance_score, canonical_source_id, clamp, clamp_future, contains_ai,
    extract_tags, fingerprint, infer_jurisdiction, round2,
};
use pulsenorth_common::types::{Candidate, Category, Language, SourceType};

use crate::adapter::{http_client, SourceAdapter};

const GITHUB_SEARCH_URL: &str = "https://api.github.com/search/repositories";

pub struct GithubAdapter {
    client: reqwest::Client,
}

impl GithubAdapter {
    pub fn new() -> Self {
        Self { client: http_client(15) }
    }
}

impl Default for GithubAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for GithubAdapter {
    fn key(&self) -> &'static str {
        "github_ai_canada"
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Candidate>> {
        let payload: Value = self
            .client
            .get(GITHUB_SEARCH_URL)
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", "artificial intelligence canada"),
                ("sort", "updated"),
                ("order", "desc"),
                ("per_page", &limit.to_string()),
            ])
            .send()
            .await
            .context("GitHub search failed")?
            .error_for_status()
            .context("GitHub returned non-success status")?
            .json()
            .await
            .context("GitHub returned malformed JSON")?;

        let items = payload["items"].as_array().cloned().unwrap_or_default();
        Ok(items.iter().filter_map(normalize_repo).collect())
    }
}

fn normalize_repo(item: &Value) -> Option<Candidate> {
    let full_name = item["full_name"].as_str()?.trim().to_string();
    if full_name.is_empty() {
        return None;
    }
    let description = item["description"].as_str().unwrap_or("").to_string();
    if !contains_ai(&format!("{full_name} {description}")) {
        return None;
    }

    let url = item["html_url"].as_str()?.to_string();
    let source_id = canonical_source_id(&format!("github-{}", item["id"].as_i64().unwrap_or(0)));

    let now = Utc::now();
    let published_at = item["pushed_at"]
        .as_str()
        .or_else(|| item["updated_at"].as_str())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now);
    let published_at = clamp_future(published_at, now);

    let topics = item["topics"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let relevance = canada_relevance_score(&[&full_name, &description, &topics, &url]);
    let confidence = round2(clamp(0.4 + 0.5 * relevance, 0.5, 0.95));
    let jurisdiction = infer_jurisdiction(&[&full_name, &description, &topics], "Global");

    let owner = item["owner"]["login"].as_str().unwrap_or("").to_string();
    let entities = if owner.is_empty() { Vec::new() } else { vec![owner] };

    Some(Candidate {
        hash: fingerprint(&source_id, &url, published_at),
        source_id,
        source_type: SourceType::Repository,
        category: Category::Industry,
        tags: extract_tags(&full_name.replace(['/', '-', '_'], " ")),
        title: full_name,
        description,
        url,
        publisher: "GitHub".to_string(),
        published_at,
        language: Language::En,
        jurisdiction,
        entities,
        confidence,
        relevance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(full_name: &str, description: &str) -> Value {
        serde_json::json!({
            "id": 42,
            "full_name": full_name,
            "description": description,
            "html_url": "https://github.com/org/repo",
            "pushed_at": "2026-01-15T10:00:00Z",
            "owner": {"login": "org"},
            "topics": ["machine-learning"]
        })
    }

    #[test]
    fn repo_confidence_stays_in_band() {
        let c = normalize_repo(&repo("org/ml-toolkit", "Machine learning for Canadian datasets"))
            .unwrap();
        assert!(c.confidence >= 0.5 && c.confidence <= 0.95);
        assert_eq!(c.source_type, SourceType::Repository);
        assert_eq!(c.category, Category::Industry);
        assert_eq!(c.entities, vec!["org".to_string()]);
    }

    #[test]
    fn non_ai_repos_are_dropped() {
        assert!(normalize_repo(&repo("org/dotfiles", "my shell setup")).is_none());
    }
}
