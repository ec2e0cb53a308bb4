use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Record Enums ---

/// Where a record came from, at the taxonomy level (not the concrete feed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Gov,
    Academic,
    Media,
    Industry,
    Funding,
    Repository,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Gov => "gov",
            SourceType::Academic => "academic",
            SourceType::Media => "media",
            SourceType::Industry => "industry",
            SourceType::Funding => "funding",
            SourceType::Repository => "repository",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "gov" => Ok(Self::Gov),
            "academic" => Ok(Self::Academic),
            "media" => Ok(Self::Media),
            "industry" => Ok(Self::Industry),
            "funding" => Ok(Self::Funding),
            "repository" => Ok(Self::Repository),
            other => Err(format!("unknown SourceType: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Policy,
    Research,
    Industry,
    Funding,
    News,
    Incidents,
}

impl Category {
    /// Stable iteration order used for zero-filled series and alerts.
    pub const ALL: [Category; 6] = [
        Category::Policy,
        Category::Research,
        Category::Industry,
        Category::Funding,
        Category::News,
        Category::Incidents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Policy => "policy",
            Category::Research => "research",
            Category::Industry => "industry",
            Category::Funding => "funding",
            Category::News => "news",
            Category::Incidents => "incidents",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "policy" => Ok(Self::Policy),
            "research" => Ok(Self::Research),
            "industry" => Ok(Self::Industry),
            "funding" => Ok(Self::Funding),
            "news" => Ok(Self::News),
            "incidents" => Ok(Self::Incidents),
            other => Err(format!("unknown Category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    En,
    Fr,
    #[default]
    Other,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Other => "other",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::En),
            "fr" => Ok(Self::Fr),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown Language: {other}")),
        }
    }
}

// --- Source Catalog ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    Api,
    Rss,
    Sitemap,
    Crawler,
}

impl AcquisitionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionMode::Api => "api",
            AcquisitionMode::Rss => "rss",
            AcquisitionMode::Sitemap => "sitemap",
            AcquisitionMode::Crawler => "crawler",
        }
    }
}

impl std::fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A catalog entry for one upstream feed. Immutable at runtime.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SourceDefinition {
    pub key: &'static str,
    pub display_name: &'static str,
    pub source_type: SourceType,
    pub acquisition_mode: AcquisitionMode,
    pub cadence_minutes: u32,
    pub enabled: bool,
}

// --- Records ---

/// A normalized record produced by an adapter, not yet accepted for write.
/// Carries the Canada-relevance score alongside the persisted fields so the
/// gate can decide without re-scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub source_id: String,
    pub source_type: SourceType,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub url: String,
    pub publisher: String,
    pub published_at: DateTime<Utc>,
    pub language: Language,
    pub jurisdiction: String,
    pub entities: Vec<String>,
    pub tags: Vec<String>,
    pub hash: String,
    pub confidence: f64,
    pub relevance: f64,
}

/// A persisted AI development record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Development {
    pub id: Uuid,
    pub source_id: String,
    pub source_type: SourceType,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub url: String,
    pub publisher: String,
    pub published_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    pub language: Language,
    pub jurisdiction: String,
    pub entities: Vec<String>,
    pub tags: Vec<String>,
    pub hash: String,
    pub confidence: f64,
}

impl Development {
    /// The JSON payload published on the new-item channel and streamed over
    /// SSE. Enum fields use their lowercase short form; timestamps ISO-8601.
    pub fn event_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.to_string(),
            "source_id": &self.source_id,
            "source_type": self.source_type.as_str(),
            "category": self.category.as_str(),
            "title": &self.title,
            "description": &self.description,
            "url": &self.url,
            "publisher": &self.publisher,
            "published_at": self.published_at.to_rfc3339(),
            "ingested_at": self.ingested_at.to_rfc3339(),
            "language": self.language.as_str(),
            "jurisdiction": &self.jurisdiction,
            "entities": &self.entities,
            "tags": &self.tags,
            "hash": &self.hash,
            "confidence": self.confidence,
        })
    }
}

// --- Run Tracking ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Error,
    SkippedLock,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::Error => "error",
            RunStatus::SkippedLock => "skipped_lock",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "error" => Ok(Self::Error),
            "skipped_lock" => Ok(Self::SkippedLock),
            other => Err(format!("unknown RunStatus: {other}")),
        }
    }
}

/// In-memory summary of a single source run, merged into the cached health
/// snapshot. One entry per source key; merges are idempotent on `source`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEntry {
    pub source: String,
    pub status: RunStatus,
    pub fetched: u32,
    pub accepted: u32,
    pub inserted: u32,
    pub duplicates: u32,
    pub write_errors: u32,
    pub duration_ms: u64,
    pub error: String,
    pub last_run: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_serialize_to_short_form() {
        assert_eq!(
            serde_json::to_string(&SourceType::Repository).unwrap(),
            "\"repository\""
        );
        assert_eq!(
            serde_json::to_string(&Category::Incidents).unwrap(),
            "\"incidents\""
        );
        assert_eq!(serde_json::to_string(&Language::Fr).unwrap(), "\"fr\"");
        assert_eq!(
            serde_json::to_string(&RunStatus::SkippedLock).unwrap(),
            "\"skipped_lock\""
        );
    }

    #[test]
    fn enums_roundtrip_from_str() {
        for st in [
            SourceType::Gov,
            SourceType::Academic,
            SourceType::Media,
            SourceType::Industry,
            SourceType::Funding,
            SourceType::Repository,
        ] {
            assert_eq!(st.as_str().parse::<SourceType>().unwrap(), st);
        }
        for cat in Category::ALL {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        }
    }

    #[test]
    fn category_all_is_stable_order() {
        let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            vec!["policy", "research", "industry", "funding", "news", "incidents"]
        );
    }

    #[test]
    fn event_payload_uses_short_enum_forms() {
        let dev = Development {
            id: Uuid::new_v4(),
            source_id: "x".into(),
            source_type: SourceType::Gov,
            category: Category::Policy,
            title: "t".into(),
            description: String::new(),
            url: "https://example.org/x".into(),
            publisher: "p".into(),
            published_at: Utc::now(),
            ingested_at: Utc::now(),
            language: Language::En,
            jurisdiction: "Canada".into(),
            entities: vec!["ISED".into()],
            tags: vec!["ai".into()],
            hash: "h".into(),
            confidence: 0.9,
        };
        let payload = dev.event_payload();
        assert_eq!(payload["source_type"], "gov");
        assert_eq!(payload["category"], "policy");
        assert_eq!(payload["language"], "en");
    }
}
