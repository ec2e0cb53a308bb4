//! Postgres persistence for AI development records.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, QueryBuilder, Row};
use tracing::warn;
use uuid::Uuid;

use pulsenorth_common::types::{Candidate, Development};

/// Outcome of one dedup write. Duplicate detection is only the `hash`
/// unique constraint; there is no pre-read.
#[derive(Debug)]
pub enum WriteOutcome {
    Inserted(Development),
    Duplicate,
    Error(String),
}

/// Filters for feed listing and export. `since` is already resolved from
/// the caller's time window.
#[derive(Debug, Clone)]
pub struct FeedFilters {
    pub since: DateTime<Utc>,
    pub category: Option<String>,
    pub jurisdiction: Option<String>,
    pub language: Option<String>,
    pub search: Option<String>,
}

/// Open a connection pool with pre-ping semantics so stale connections are
/// discarded before use.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .test_before_acquire(true)
        .connect(database_url)
        .await
        .context("Failed to connect to Postgres")
}

#[derive(Clone)]
pub struct DevelopmentStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct DevelopmentRow {
    id: Uuid,
    source_id: String,
    source_type: String,
    category: String,
    title: String,
    description: String,
    url: String,
    publisher: String,
    published_at: DateTime<Utc>,
    ingested_at: DateTime<Utc>,
    language: String,
    jurisdiction: String,
    entities: sqlx::types::Json<Vec<String>>,
    tags: Vec<String>,
    hash: String,
    confidence: f64,
}

impl TryFrom<DevelopmentRow> for Development {
    type Error = anyhow::Error;

    fn try_from(row: DevelopmentRow) -> Result<Self> {
        Ok(Development {
            id: row.id,
            source_id: row.source_id,
            source_type: row
                .source_type
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?,
            category: row.category.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            title: row.title,
            description: row.description,
            url: row.url,
            publisher: row.publisher,
            published_at: row.published_at,
            ingested_at: row.ingested_at,
            language: row.language.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            jurisdiction: row.jurisdiction,
            entities: row.entities.0,
            tags: row.tags,
            hash: row.hash,
            confidence: row.confidence,
        })
    }
}

impl DevelopmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Migration failed")?;
        Ok(())
    }

    /// Insert one accepted candidate. Each insert is its own transaction so
    /// duplicate counting stays deterministic within a batch.
    pub async fn insert(&self, candidate: &Candidate) -> WriteOutcome {
        let id = Uuid::new_v4();
        let result = sqlx::query(
            r#"
            INSERT INTO ai_developments
                (id, source_id, source_type, category, title, description, url,
                 publisher, published_at, language, jurisdiction, entities, tags,
                 hash, confidence)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING ingested_at
            "#,
        )
        .bind(id)
        .bind(&candidate.source_id)
        .bind(candidate.source_type.as_str())
        .bind(candidate.category.as_str())
        .bind(&candidate.title)
        .bind(&candidate.description)
        .bind(&candidate.url)
        .bind(&candidate.publisher)
        .bind(candidate.published_at)
        .bind(candidate.language.as_str())
        .bind(&candidate.jurisdiction)
        .bind(sqlx::types::Json(&candidate.entities))
        .bind(&candidate.tags)
        .bind(&candidate.hash)
        .bind(candidate.confidence)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => {
                let ingested_at: DateTime<Utc> = row.get("ingested_at");
                WriteOutcome::Inserted(Development {
                    id,
                    source_id: candidate.source_id.clone(),
                    source_type: candidate.source_type,
                    category: candidate.category,
                    title: candidate.title.clone(),
                    description: candidate.description.clone(),
                    url: candidate.url.clone(),
                    publisher: candidate.publisher.clone(),
                    published_at: candidate.published_at,
                    ingested_at,
                    language: candidate.language,
                    jurisdiction: candidate.jurisdiction.clone(),
                    entities: candidate.entities.clone(),
                    tags: candidate.tags.clone(),
                    hash: candidate.hash.clone(),
                    confidence: candidate.confidence,
                })
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => WriteOutcome::Duplicate,
            Err(e) => {
                warn!(source_id = %candidate.source_id, error = %e, "Insert failed");
                WriteOutcome::Error(e.to_string())
            }
        }
    }

    /// Refresh both materialized summary views. Callers treat failure as
    /// non-fatal (log and continue).
    pub async fn refresh_views(&self) -> Result<()> {
        sqlx::query("REFRESH MATERIALIZED VIEW hourly_stats")
            .execute(&self.pool)
            .await
            .context("Failed to refresh hourly_stats")?;
        sqlx::query("REFRESH MATERIALIZED VIEW weekly_stats")
            .execute(&self.pool)
            .await
            .context("Failed to refresh weekly_stats")?;
        Ok(())
    }

    fn apply_filters<'a>(builder: &mut QueryBuilder<'a, sqlx::Postgres>, filters: &'a FeedFilters) {
        builder.push(" WHERE published_at >= ").push_bind(filters.since);
        if let Some(category) = &filters.category {
            builder.push(" AND category = ").push_bind(category);
        }
        if let Some(jurisdiction) = &filters.jurisdiction {
            builder.push(" AND jurisdiction = ").push_bind(jurisdiction);
        }
        if let Some(language) = &filters.language {
            builder.push(" AND language = ").push_bind(language);
        }
        if let Some(search) = &filters.search {
            let like = format!("%{search}%");
            builder
                .push(" AND (title ILIKE ")
                .push_bind(like.clone())
                .push(" OR publisher ILIKE ")
                .push_bind(like.clone())
                .push(" OR jurisdiction ILIKE ")
                .push_bind(like)
                .push(")");
        }
    }

    /// Paginated feed listing, newest first. Returns (rows, total).
    pub async fn feed(
        &self,
        filters: &FeedFilters,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Development>, i64)> {
        let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM ai_developments");
        Self::apply_filters(&mut count_builder, filters);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("Feed count failed")?;

        let offset = (page.saturating_sub(1) as i64) * page_size as i64;
        let mut builder = QueryBuilder::new("SELECT * FROM ai_developments");
        Self::apply_filters(&mut builder, filters);
        builder
            .push(" ORDER BY published_at DESC, ingested_at DESC LIMIT ")
            .push_bind(page_size as i64)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<DevelopmentRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("Feed query failed")?;
        let items = rows
            .into_iter()
            .map(Development::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    /// Bulk export rows, newest first, capped by `limit`.
    pub async fn export(&self, filters: &FeedFilters, limit: i64) -> Result<Vec<Development>> {
        let mut builder = QueryBuilder::new("SELECT * FROM ai_developments");
        Self::apply_filters(&mut builder, filters);
        builder
            .push(" ORDER BY published_at DESC, ingested_at DESC LIMIT ")
            .push_bind(limit);

        let rows: Vec<DevelopmentRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("Export query failed")?;
        rows.into_iter().map(Development::try_from).collect()
    }

    /// Count rows in the synthetic URL space (`https://example.com/`).
    pub async fn count_synthetic(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ai_developments WHERE url LIKE 'https://example.com/%'",
        )
        .fetch_one(&self.pool)
        .await
        .context("Synthetic count failed")?;
        Ok(count)
    }

    /// Delete synthetic rows. Returns the number deleted.
    pub async fn purge_synthetic(&self) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM ai_developments WHERE url LIKE 'https://example.com/%'")
                .execute(&self.pool)
                .await
                .context("Synthetic purge failed")?;
        Ok(result.rows_affected())
    }
}
