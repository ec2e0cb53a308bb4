//! Per-source scheduling. Each enabled source runs as an independent tokio
//! task on its own cadence, so a slow source never blocks another. Mutual
//! exclusion within one source key is the runner's distributed lock, not
//! the scheduler.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::info;

use pulsenorth_common::types::HealthEntry;
use pulsenorth_sources::list_definitions;

use crate::health::HealthStore;
use crate::runner::IngestRunner;

pub struct IngestScheduler {
    runner: Arc<IngestRunner>,
    health: HealthStore,
    handles: Vec<JoinHandle<()>>,
}

impl IngestScheduler {
    pub fn new(runner: Arc<IngestRunner>, health: HealthStore) -> Self {
        Self { runner, health, handles: Vec::new() }
    }

    /// Spawn one periodic task per enabled source. The first tick fires
    /// immediately; later ticks follow the cadence.
    pub fn start(&mut self) {
        for source in list_definitions(false) {
            let runner = self.runner.clone();
            let health = self.health.clone();
            let key = source.key;
            let cadence = Duration::from_secs(source.cadence_minutes as u64 * 60);

            self.handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(cadence);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let entry = runner.run_source(key).await;
                    health.merge(&[entry]).await;
                }
            }));
        }
        info!(sources = self.handles.len(), "Ingest scheduler started");
    }

    /// Run every enabled source once, concurrently, and merge the results
    /// into the health snapshot. Returns the per-source entries.
    pub async fn run_all_enabled(&self) -> Vec<HealthEntry> {
        let futures: Vec<_> = list_definitions(false)
            .into_iter()
            .map(|source| {
                let runner = self.runner.clone();
                async move { runner.run_source(source.key).await }
            })
            .collect();
        let entries = join_all(futures).await;
        self.health.merge(&entries).await;
        entries
    }

    /// Run a single source on demand.
    pub async fn run_one(&self, source_key: &str) -> HealthEntry {
        let entry = self.runner.run_source(source_key).await;
        self.health.merge(std::slice::from_ref(&entry)).await;
        entry
    }

    /// Abort all periodic tasks. In-flight runs stop at their next await
    /// point; locks expire via TTL if a release was cut short.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("Ingest scheduler stopped");
    }
}
