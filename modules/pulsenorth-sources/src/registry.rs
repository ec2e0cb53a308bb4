//! Static source catalog and the adapter table. Definitions are immutable
//! at runtime; the scheduler consumes enabled entries, the health endpoint
//! consumes all of them.

use pulsenorth_common::types::{AcquisitionMode, Category, SourceDefinition, SourceType};

use crate::adapter::SourceAdapter;
use crate::arxiv::ArxivAdapter;
use crate::crossref::CrossrefAdapter;
use crate::github::GithubAdapter;
use crate::openalex::OpenAlexAdapter;
use crate::rss::{ConfidenceModel, FeedSpec, RssFeedAdapter};
use crate::sitemap::{SitemapAdapter, SitemapSpec};

pub const SOURCE_DEFINITIONS: &[SourceDefinition] = &[
    SourceDefinition {
        key: "openalex",
        display_name: "OpenAlex",
        source_type: SourceType::Academic,
        acquisition_mode: AcquisitionMode::Api,
        cadence_minutes: 30,
        enabled: true,
    },
    SourceDefinition {
        key: "canada_gov_ised",
        display_name: "Government of Canada (ISED)",
        source_type: SourceType::Gov,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 30,
        enabled: true,
    },
    SourceDefinition {
        key: "betakit_ai",
        display_name: "BetaKit AI",
        source_type: SourceType::Media,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 30,
        enabled: true,
    },
    SourceDefinition {
        key: "google_news_canada_ai",
        display_name: "Google News (Canada AI)",
        source_type: SourceType::Media,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 45,
        enabled: true,
    },
    SourceDefinition {
        key: "github_ai_canada",
        display_name: "GitHub (AI Canada)",
        source_type: SourceType::Repository,
        acquisition_mode: AcquisitionMode::Api,
        cadence_minutes: 45,
        enabled: true,
    },
    SourceDefinition {
        key: "arxiv_ai_canada",
        display_name: "arXiv (AI Canada)",
        source_type: SourceType::Academic,
        acquisition_mode: AcquisitionMode::Api,
        cadence_minutes: 45,
        enabled: true,
    },
    SourceDefinition {
        key: "treasury_board_canada",
        display_name: "Treasury Board of Canada",
        source_type: SourceType::Gov,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 60,
        enabled: true,
    },
    SourceDefinition {
        key: "opc_canada",
        display_name: "Office of the Privacy Commissioner (Canada)",
        source_type: SourceType::Gov,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 60,
        enabled: true,
    },
    SourceDefinition {
        key: "crtc_canada",
        display_name: "CRTC",
        source_type: SourceType::Gov,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 60,
        enabled: true,
    },
    SourceDefinition {
        key: "canada_gazette_ai",
        display_name: "Canada Gazette (AI)",
        source_type: SourceType::Gov,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 60,
        enabled: true,
    },
    SourceDefinition {
        key: "pspc_procurement_ai",
        display_name: "PSPC Procurement (AI)",
        source_type: SourceType::Industry,
        acquisition_mode: AcquisitionMode::Crawler,
        cadence_minutes: 60,
        enabled: false,
    },
    SourceDefinition {
        key: "semantic_scholar_ai_canada",
        display_name: "Semantic Scholar (AI Canada)",
        source_type: SourceType::Academic,
        acquisition_mode: AcquisitionMode::Api,
        cadence_minutes: 45,
        enabled: false,
    },
    SourceDefinition {
        key: "crossref_ai_canada",
        display_name: "Crossref (AI Canada)",
        source_type: SourceType::Academic,
        acquisition_mode: AcquisitionMode::Api,
        cadence_minutes: 45,
        enabled: true,
    },
    SourceDefinition {
        key: "mila_news",
        display_name: "Mila News",
        source_type: SourceType::Academic,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 60,
        enabled: true,
    },
    SourceDefinition {
        key: "vector_news",
        display_name: "Vector Institute News",
        source_type: SourceType::Academic,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 60,
        enabled: true,
    },
    SourceDefinition {
        key: "amii_news",
        display_name: "Amii News",
        source_type: SourceType::Academic,
        acquisition_mode: AcquisitionMode::Sitemap,
        cadence_minutes: 60,
        enabled: true,
    },
    SourceDefinition {
        key: "cifar_ai",
        display_name: "CIFAR AI",
        source_type: SourceType::Academic,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 60,
        enabled: true,
    },
    SourceDefinition {
        key: "nserc_ai",
        display_name: "NSERC (AI Programs)",
        source_type: SourceType::Funding,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 60,
        enabled: true,
    },
    SourceDefinition {
        key: "cihr_ai",
        display_name: "CIHR (AI Programs)",
        source_type: SourceType::Funding,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 60,
        enabled: true,
    },
    SourceDefinition {
        key: "cfi_ai",
        display_name: "CFI (AI Programs)",
        source_type: SourceType::Funding,
        acquisition_mode: AcquisitionMode::Rss,
        cadence_minutes: 60,
        enabled: true,
    },
];

pub fn list_definitions(include_disabled: bool) -> Vec<SourceDefinition> {
    SOURCE_DEFINITIONS
        .iter()
        .filter(|source| include_disabled || source.enabled)
        .copied()
        .collect()
}

pub fn get_definition(source_key: &str) -> Option<SourceDefinition> {
    SOURCE_DEFINITIONS.iter().find(|source| source.key == source_key).copied()
}

/// Instantiate the adapter for a source key. Returns None for keys without
/// an implementation (disabled catalog entries).
pub fn adapter_for(source_key: &str) -> Option<Box<dyn SourceAdapter>> {
    let adapter: Box<dyn SourceAdapter> = match source_key {
        "openalex" => Box::new(OpenAlexAdapter::new()),
        "github_ai_canada" => Box::new(GithubAdapter::new()),
        "arxiv_ai_canada" => Box::new(ArxivAdapter::new()),
        "crossref_ai_canada" => Box::new(CrossrefAdapter::new()),
        "amii_news" => Box::new(SitemapAdapter::new(SitemapSpec {
            key: "amii_news",
            sitemap_url: "https://www.amii.ca/sitemap.xml",
            path_prefix: "/latest-from-amii/",
            publisher: "Amii",
            default_jurisdiction: "Alberta",
            entities: &["Amii", "University of Alberta"],
        })),
        "canada_gov_ised" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "canada_gov_ised",
            feed_url: "https://www.canada.ca/en/news/advanced-news-search/news-results.html?dprtmnt=departmentofindustry&typ=newsreleases&rss",
            publisher: "Government of Canada",
            source_type: SourceType::Gov,
            category: Category::Policy,
            default_jurisdiction: "Canada",
            entities: &["Government of Canada", "ISED"],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::Gov,
            recency_boost: false,
        })),
        "betakit_ai" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "betakit_ai",
            feed_url: "https://betakit.com/tag/artificial-intelligence/feed/",
            publisher: "BetaKit",
            source_type: SourceType::Media,
            category: Category::News,
            default_jurisdiction: "Canada",
            entities: &[],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::Media,
            recency_boost: false,
        })),
        "google_news_canada_ai" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "google_news_canada_ai",
            feed_url: "https://news.google.com/rss/search?q=artificial+intelligence+canada&hl=en-CA&gl=CA&ceid=CA:en",
            publisher: "Google News",
            source_type: SourceType::Media,
            category: Category::News,
            default_jurisdiction: "Canada",
            entities: &[],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::Media,
            recency_boost: false,
        })),
        "treasury_board_canada" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "treasury_board_canada",
            feed_url: "https://www.canada.ca/en/news/advanced-news-search/news-results.html?dprtmnt=treasuryboardofcanadasecretariat&typ=newsreleases&rss",
            publisher: "Treasury Board of Canada",
            source_type: SourceType::Gov,
            category: Category::Policy,
            default_jurisdiction: "Canada",
            entities: &["Government of Canada", "Treasury Board"],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::Gov,
            recency_boost: false,
        })),
        "opc_canada" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "opc_canada",
            feed_url: "https://www.priv.gc.ca/en/opc-news/news-and-announcements/rss/",
            publisher: "Office of the Privacy Commissioner of Canada",
            source_type: SourceType::Gov,
            category: Category::Policy,
            default_jurisdiction: "Canada",
            entities: &["Government of Canada", "Office of the Privacy Commissioner"],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::Gov,
            recency_boost: false,
        })),
        "crtc_canada" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "crtc_canada",
            feed_url: "https://www.crtc.gc.ca/eng/rss/news.xml",
            publisher: "CRTC",
            source_type: SourceType::Gov,
            category: Category::Policy,
            default_jurisdiction: "Canada",
            entities: &["Government of Canada", "CRTC"],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::Gov,
            recency_boost: true,
        })),
        "canada_gazette_ai" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "canada_gazette_ai",
            feed_url: "https://gazette.gc.ca/rss/p1-eng.xml",
            publisher: "Canada Gazette",
            source_type: SourceType::Gov,
            category: Category::Policy,
            default_jurisdiction: "Canada",
            entities: &["Government of Canada", "Canada Gazette"],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::Gov,
            recency_boost: true,
        })),
        "mila_news" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "mila_news",
            feed_url: "https://mila.quebec/en/feed/",
            publisher: "Mila",
            source_type: SourceType::Academic,
            category: Category::Research,
            default_jurisdiction: "Quebec",
            entities: &["Mila"],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::AcademicFeed,
            recency_boost: false,
        })),
        "vector_news" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "vector_news",
            feed_url: "https://vectorinstitute.ai/feed/",
            publisher: "Vector Institute",
            source_type: SourceType::Academic,
            category: Category::Research,
            default_jurisdiction: "Ontario",
            entities: &["Vector Institute", "University of Toronto"],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::AcademicFeed,
            recency_boost: false,
        })),
        "cifar_ai" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "cifar_ai",
            feed_url: "https://cifar.ca/feed/",
            publisher: "CIFAR",
            source_type: SourceType::Academic,
            category: Category::Research,
            default_jurisdiction: "Canada",
            entities: &["CIFAR"],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::AcademicFeed,
            recency_boost: false,
        })),
        "nserc_ai" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "nserc_ai",
            feed_url: "https://www.nserc-crsng.gc.ca/rss/news-nouvelles_eng.xml",
            publisher: "NSERC",
            source_type: SourceType::Funding,
            category: Category::Funding,
            default_jurisdiction: "Canada",
            entities: &["Government of Canada", "NSERC"],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::Funding,
            recency_boost: false,
        })),
        "cihr_ai" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "cihr_ai",
            feed_url: "https://cihr-irsc.gc.ca/rss/news_e.xml",
            publisher: "CIHR",
            source_type: SourceType::Funding,
            category: Category::Funding,
            default_jurisdiction: "Canada",
            entities: &["Government of Canada", "CIHR"],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::Funding,
            recency_boost: false,
        })),
        "cfi_ai" => Box::new(RssFeedAdapter::new(FeedSpec {
            key: "cfi_ai",
            feed_url: "https://www.innovation.ca/news/feed",
            publisher: "Canada Foundation for Innovation",
            source_type: SourceType::Funding,
            category: Category::Funding,
            default_jurisdiction: "Canada",
            entities: &["Government of Canada", "CFI"],
            claimed_language: Some("en"),
            confidence: ConfidenceModel::Funding,
            recency_boost: false,
        })),
        _ => return None,
    };
    Some(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_twenty_sources() {
        assert_eq!(SOURCE_DEFINITIONS.len(), 20);
        assert_eq!(list_definitions(true).len(), 20);
        // Two catalog entries ship disabled.
        assert_eq!(list_definitions(false).len(), 18);
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<&str> = SOURCE_DEFINITIONS.iter().map(|s| s.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), SOURCE_DEFINITIONS.len());
    }

    #[test]
    fn every_enabled_source_has_an_adapter() {
        for source in list_definitions(false) {
            assert!(
                adapter_for(source.key).is_some(),
                "no adapter registered for enabled source {}",
                source.key
            );
        }
    }

    #[test]
    fn disabled_sources_without_adapters_resolve_to_none() {
        assert!(adapter_for("pspc_procurement_ai").is_none());
        assert!(adapter_for("semantic_scholar_ai_canada").is_none());
        assert!(adapter_for("unknown_key").is_none());
    }

    #[test]
    fn adapter_keys_match_catalog_keys() {
        for source in list_definitions(false) {
            let adapter = adapter_for(source.key).unwrap();
            assert_eq!(adapter.key(), source.key);
        }
    }

    #[test]
    fn get_definition_resolves_known_keys() {
        let def = get_definition("openalex").unwrap();
        assert_eq!(def.cadence_minutes, 30);
        assert!(get_definition("nope").is_none());
    }
}
