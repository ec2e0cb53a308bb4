//! The adapter capability. One implementation per acquisition shape; the
//! scheduler and runner treat all of them uniformly.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use pulsenorth_common::types::Candidate;

pub const USER_AGENT: &str = concat!("pulsenorth/", env!("CARGO_PKG_VERSION"));

/// Accept header sent to RSS/Atom/sitemap endpoints.
pub const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, */*;q=0.8";

/// Fetches and normalizes records for one source. Adapters are side-effect
/// free beyond outbound HTTP: no database, no cache.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn key(&self) -> &'static str;

    /// Fetch up to `limit` normalized candidates, newest first.
    async fn fetch(&self, limit: usize) -> Result<Vec<Candidate>>;
}

/// Shared HTTP client: hard timeout, redirect following, product UA.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(USER_AGENT)
        .build()
        .expect("Failed to build HTTP client")
}
