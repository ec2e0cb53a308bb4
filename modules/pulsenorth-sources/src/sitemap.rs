//! Sitemap adapter for sites without a usable feed. Extracts URLs under a
//! configured path prefix, derives titles from slugs, and orders by lastmod.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pulsenorth_common::relevance::{
    canada_relevance_score, canonical_source_id, clamp, clamp_future, contains_ai,
    extract_tags, fingerprint, infer_jurisdiction, round2,
};
use pulsenorth_common::types::{Candidate, Category, Language, SourceType};

use crate::adapter::{http_client, SourceAdapter, FEED_ACCEPT};

/// Static description of one sitemap source.
pub struct SitemapSpec {
    pub key: &'static str,
    pub sitemap_url: &'static str,
    /// Only URLs whose path contains this prefix are article pages.
    pub path_prefix: &'static str,
    pub publisher: &'static str,
    pub default_jurisdiction: &'static str,
    pub entities: &'static [&'static str],
}

pub struct SitemapAdapter {
    spec: SitemapSpec,
    client: reqwest::Client,
}

impl SitemapAdapter {
    pub fn new(spec: SitemapSpec) -> Self {
        Self { spec, client: http_client(15) }
    }
}

/// One `<url>` element of a sitemap.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
}

/// Pull `<loc>`/`<lastmod>` pairs out of sitemap XML.
pub(crate) fn parse_sitemap(xml: &str) -> Vec<SitemapEntry> {
    let url_pattern = regex::Regex::new(r"(?s)<url>(.*?)</url>").expect("Invalid sitemap url regex");
    let loc_pattern = regex::Regex::new(r"<loc>\s*([^<]+?)\s*</loc>").expect("Invalid loc regex");
    let lastmod_pattern =
        regex::Regex::new(r"<lastmod>\s*([^<]+?)\s*</lastmod>").expect("Invalid lastmod regex");

    let mut entries = Vec::new();
    for block in url_pattern.captures_iter(xml) {
        let body = block.get(1).map(|m| m.as_str()).unwrap_or("");
        let loc = match loc_pattern.captures(body).and_then(|c| c.get(1)) {
            Some(m) => m.as_str().to_string(),
            None => continue,
        };
        let lastmod = lastmod_pattern
            .captures(body)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_lastmod(m.as_str()));
        entries.push(SitemapEntry { loc, lastmod });
    }
    entries
}

fn parse_lastmod(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Date-only form ("2026-01-15") is also common in sitemaps.
    let date = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(DateTime::from_naive_utc_and_offset(date.and_hms_opt(0, 0, 0)?, Utc))
}

/// Turn the last path segment into a readable title.
pub(crate) fn title_from_slug(url: &str) -> String {
    let slug = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
        .split('.')
        .next()
        .unwrap_or("");
    let words = slug.replace(['-', '_'], " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[async_trait]
impl SourceAdapter for SitemapAdapter {
    fn key(&self) -> &'static str {
        self.spec.key
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Candidate>> {
        let xml = self
            .client
            .get(self.spec.sitemap_url)
            .header("Accept", FEED_ACCEPT)
            .send()
            .await
            .context("Sitemap fetch failed")?
            .error_for_status()
            .context("Sitemap returned non-success status")?
            .text()
            .await
            .context("Failed to read sitemap body")?;

        let mut entries: Vec<SitemapEntry> = parse_sitemap(&xml)
            .into_iter()
            .filter(|e| e.loc.contains(self.spec.path_prefix))
            .collect();
        entries.sort_by(|a, b| b.lastmod.cmp(&a.lastmod));

        let now = Utc::now();
        let entity_blob = self.spec.entities.join(" ");
        let mut records = Vec::new();

        for entry in entries {
            if records.len() >= limit {
                break;
            }
            let title = title_from_slug(&entry.loc);
            if title.is_empty() {
                continue;
            }
            if !contains_ai(&format!("{title} {} {entity_blob}", self.spec.publisher)) {
                continue;
            }

            let published_at = clamp_future(entry.lastmod.unwrap_or(now), now);
            let source_id = canonical_source_id(&entry.loc);
            let relevance =
                canada_relevance_score(&[&title, &entry.loc, self.spec.publisher, &entity_blob]);
            let confidence = round2(clamp(0.6 + 0.4 * relevance, 0.84, 0.98));
            let jurisdiction =
                infer_jurisdiction(&[&title, &entity_blob], self.spec.default_jurisdiction);

            records.push(Candidate {
                hash: fingerprint(&source_id, &entry.loc, published_at),
                source_id,
                source_type: SourceType::Academic,
                category: Category::Research,
                tags: extract_tags(&title),
                title,
                description: String::new(),
                url: entry.loc,
                publisher: self.spec.publisher.to_string(),
                published_at,
                language: Language::En,
                jurisdiction,
                entities: self.spec.entities.iter().map(|e| e.to_string()).collect(),
                confidence,
                relevance,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://www.amii.ca/latest-from-amii/ai-week-recap</loc>
    <lastmod>2026-01-20</lastmod>
  </url>
  <url>
    <loc>https://www.amii.ca/about/</loc>
    <lastmod>2025-06-01</lastmod>
  </url>
  <url>
    <loc>https://www.amii.ca/latest-from-amii/machine-learning-residency</loc>
    <lastmod>2026-02-02T08:30:00Z</lastmod>
  </url>
</urlset>"#;

    #[test]
    fn parses_loc_and_lastmod_pairs() {
        let entries = parse_sitemap(SITEMAP);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].loc, "https://www.amii.ca/latest-from-amii/ai-week-recap");
        assert!(entries[0].lastmod.is_some());
        assert!(entries[2].lastmod.is_some());
    }

    #[test]
    fn slug_titles_are_readable() {
        assert_eq!(
            title_from_slug("https://www.amii.ca/latest-from-amii/ai-week-recap"),
            "Ai week recap"
        );
        assert_eq!(
            title_from_slug("https://example.org/posts/machine_learning_update/"),
            "Machine learning update"
        );
    }

    #[test]
    fn prefix_filter_drops_non_article_pages() {
        let entries: Vec<_> = parse_sitemap(SITEMAP)
            .into_iter()
            .filter(|e| e.loc.contains("/latest-from-amii/"))
            .collect();
        assert_eq!(entries.len(), 2);
    }
}
