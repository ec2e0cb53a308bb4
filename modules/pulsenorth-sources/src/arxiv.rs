//! arXiv API adapter. The API speaks Atom, so feed-rs does the parsing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;

use pulsenorth_common::relevance::{
    canada_relevance_score, canonical_source_id, clamp, clamp_future, contains_ai,
    detect_language, extract_tags, fingerprint, infer_jurisdiction, round2,
};
use pulsenorth_common::types::{Candidate, Category, SourceType};

use crate::adapter::{http_client, SourceAdapter, FEED_ACCEPT};

const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

pub struct ArxivAdapter {
    client: reqwest::Client,
}

impl ArxivAdapter {
    pub fn new() -> Self {
        Self { client: http_client(20) }
    }
}

impl Default for ArxivAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for ArxivAdapter {
    fn key(&self) -> &'static str {
        "arxiv_ai_canada"
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Candidate>> {
        let resp = self
            .client
            .get(ARXIV_API_URL)
            .header("Accept", FEED_ACCEPT)
            .query(&[
                ("search_query", "all:\"artificial intelligence\" AND all:canada"),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
                ("max_results", &limit.to_string()),
            ])
            .send()
            .await
            .context("arXiv fetch failed")?
            .error_for_status()
            .context("arXiv returned non-success status")?;
        let bytes = resp.bytes().await.context("Failed to read arXiv body")?;
        let feed = feed_rs::parser::parse(&bytes[..]).context("Failed to parse arXiv Atom feed")?;

        let now = Utc::now();
        let mut records = Vec::new();
        for entry in feed.entries {
            let title = match entry.title.as_ref().map(|t| t.content.trim().to_string()) {
                Some(t) if !t.is_empty() => t,
                _ => continue,
            };
            let summary = entry
                .summary
                .as_ref()
                .map(|s| s.content.clone())
                .unwrap_or_default();
            if !contains_ai(&format!("{title} {summary}")) {
                continue;
            }

            let url = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_else(|| entry.id.clone());
            let source_id = canonical_source_id(&entry.id);

            let published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(now);
            let published_at = clamp_future(published_at, now);

            let authors: Vec<String> = entry
                .authors
                .iter()
                .map(|a| a.name.clone())
                .filter(|n| !n.is_empty())
                .take(5)
                .collect();
            let author_blob = authors.join(" ");

            let relevance = canada_relevance_score(&[&title, &summary, &author_blob]);
            let confidence = round2(clamp(0.5 + 0.4 * relevance, 0.6, 0.95));
            let jurisdiction = infer_jurisdiction(&[&title, &summary, &author_blob], "Global");
            let language = detect_language(Some("en"), &format!("{title} {summary}"));

            records.push(Candidate {
                hash: fingerprint(&source_id, &url, published_at),
                source_id,
                source_type: SourceType::Academic,
                category: Category::Research,
                tags: extract_tags(&title),
                title,
                description: summary,
                url,
                publisher: "arXiv".to_string(),
                published_at,
                language,
                jurisdiction,
                entities: authors,
                confidence,
                relevance,
            });
        }
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use pulsenorth_common::relevance::{clamp, round2};

    #[test]
    fn arxiv_confidence_band() {
        // clamp(0.5 + 0.4·rel, [0.6, 0.95])
        assert_eq!(round2(clamp(0.5 + 0.4 * 0.0, 0.6, 0.95)), 0.6);
        assert_eq!(round2(clamp(0.5 + 0.4 * 0.5, 0.6, 0.95)), 0.7);
        assert_eq!(round2(clamp(0.5 + 0.4 * 1.0, 0.6, 0.95)), 0.9);
    }
}
