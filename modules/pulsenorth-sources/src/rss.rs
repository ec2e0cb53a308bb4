//! Generic RSS/Atom adapter. Each concrete feed is a `FeedSpec` row; the
//! fetch-and-normalize path is identical for all of them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use pulsenorth_common::relevance::{
    canada_relevance_score, canonical_source_id, clamp, clamp_future, contains_ai,
    detect_language, extract_tags, fingerprint, infer_jurisdiction,
    policy_recency_adjustment, round2, RecencyAdjustment,
};
use pulsenorth_common::types::{Candidate, Category, SourceType};

use crate::adapter::{http_client, SourceAdapter, FEED_ACCEPT};

/// How a feed's confidence is derived from its Canada-relevance score.
#[derive(Debug, Clone, Copy)]
pub enum ConfidenceModel {
    /// Government feeds: `max(0.9, relevance)`.
    Gov,
    /// Media feeds: `clamp(0.55 + 0.5·relevance, 0.84, 0.99)`.
    Media,
    /// Funding agency feeds: floored at 0.84.
    Funding,
    /// Canadian institute news feeds: floored at 0.84.
    AcademicFeed,
}

impl ConfidenceModel {
    pub fn confidence(&self, relevance: f64) -> f64 {
        let raw = match self {
            ConfidenceModel::Gov => (0.9f64).max(relevance),
            ConfidenceModel::Media => clamp(0.55 + 0.5 * relevance, 0.84, 0.99),
            ConfidenceModel::Funding => clamp(0.6 + 0.4 * relevance, 0.84, 0.99),
            ConfidenceModel::AcademicFeed => clamp(0.6 + 0.4 * relevance, 0.84, 0.98),
        };
        round2(raw)
    }
}

/// Static description of one RSS/Atom source.
pub struct FeedSpec {
    pub key: &'static str,
    pub feed_url: &'static str,
    pub publisher: &'static str,
    pub source_type: SourceType,
    pub category: Category,
    pub default_jurisdiction: &'static str,
    /// Entities attached to every record from this feed, display-cased.
    pub entities: &'static [&'static str],
    /// Language the upstream claims to publish in, if any.
    pub claimed_language: Option<&'static str>,
    pub confidence: ConfidenceModel,
    /// Slow-moving policy feeds get a freshness boost and a staleness drop.
    pub recency_boost: bool,
}

pub struct RssFeedAdapter {
    spec: FeedSpec,
    client: reqwest::Client,
}

impl RssFeedAdapter {
    pub fn new(spec: FeedSpec) -> Self {
        Self { spec, client: http_client(15) }
    }
}

#[async_trait]
impl SourceAdapter for RssFeedAdapter {
    fn key(&self) -> &'static str {
        self.spec.key
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Candidate>> {
        let resp = self
            .client
            .get(self.spec.feed_url)
            .header("Accept", FEED_ACCEPT)
            .send()
            .await
            .context("Feed fetch failed")?
            .error_for_status()
            .context("Feed returned non-success status")?;
        let bytes = resp.bytes().await.context("Failed to read feed body")?;
        let feed = feed_rs::parser::parse(&bytes[..]).context("Failed to parse RSS/Atom feed")?;

        let now = Utc::now();
        let mut records = Vec::new();

        for entry in feed.entries {
            if records.len() >= limit {
                break;
            }

            let title = match entry.title.as_ref().map(|t| t.content.trim().to_string()) {
                Some(t) if !t.is_empty() => t,
                _ => continue,
            };
            let summary = entry
                .summary
                .as_ref()
                .map(|s| s.content.clone())
                .unwrap_or_default();

            let entity_blob = self.spec.entities.join(" ");
            let gate_blob = format!("{title} {summary} {} {entity_blob}", self.spec.publisher);
            if !contains_ai(&gate_blob) {
                continue;
            }

            let url = match entry.links.first().map(|l| l.href.clone()) {
                Some(u) if !u.is_empty() => u,
                _ => continue,
            };
            let source_id = if entry.id.is_empty() { url.clone() } else { entry.id.clone() };
            let source_id = canonical_source_id(&source_id);

            let published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(now);
            let published_at = clamp_future(published_at, now);

            let mut relevance =
                canada_relevance_score(&[&title, &summary, &url, self.spec.publisher, &entity_blob]);
            let mut confidence = self.spec.confidence.confidence(relevance);

            if self.spec.recency_boost {
                match policy_recency_adjustment(published_at, now) {
                    RecencyAdjustment::Drop => continue,
                    RecencyAdjustment::Boost { confidence: dc, relevance: dr } => {
                        confidence = round2((confidence + dc).min(0.99));
                        relevance = (relevance + dr).min(1.0);
                    }
                    RecencyAdjustment::Keep => {}
                }
            }

            let language = detect_language(
                self.spec.claimed_language,
                &format!("{title} {summary}"),
            );
            let jurisdiction = infer_jurisdiction(
                &[&title, &summary, &entity_blob],
                self.spec.default_jurisdiction,
            );

            records.push(Candidate {
                hash: fingerprint(&source_id, &url, published_at),
                source_id,
                source_type: self.spec.source_type,
                category: self.spec.category,
                tags: extract_tags(&title),
                title,
                description: summary,
                url,
                publisher: self.spec.publisher.to_string(),
                published_at,
                language,
                jurisdiction,
                entities: self.spec.entities.iter().map(|e| e.to_string()).collect(),
                confidence,
                relevance,
            });
        }

        debug!(source = self.spec.key, records = records.len(), "Feed normalized");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gov_confidence_is_floored_at_point_nine() {
        assert_eq!(ConfidenceModel::Gov.confidence(0.2), 0.9);
        assert_eq!(ConfidenceModel::Gov.confidence(0.95), 0.95);
    }

    #[test]
    fn media_confidence_clamps_into_band() {
        assert_eq!(ConfidenceModel::Media.confidence(0.0), 0.84);
        assert_eq!(ConfidenceModel::Media.confidence(0.6), 0.85);
        assert_eq!(ConfidenceModel::Media.confidence(1.0), 0.99);
    }

    #[test]
    fn funding_confidence_never_drops_below_floor() {
        assert_eq!(ConfidenceModel::Funding.confidence(0.0), 0.84);
        assert_eq!(ConfidenceModel::Funding.confidence(1.0), 0.99);
    }
}
