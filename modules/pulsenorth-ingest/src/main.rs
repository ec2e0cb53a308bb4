//! Ingest worker: runs the per-source scheduler until shutdown.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulsenorth_common::Config;
use pulsenorth_coord::CoordClient;
use pulsenorth_ingest::{HealthStore, IngestRunner, IngestScheduler, Writer};
use pulsenorth_store::{connect, DevelopmentStore, TrackingStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulsenorth=info".parse()?))
        .init();

    let config = Config::worker_from_env();

    let pool = connect(&config.database_url).await?;
    let store = DevelopmentStore::new(pool.clone());
    store.migrate().await?;
    let tracking = TrackingStore::new(pool);

    let coord = CoordClient::connect(&config.redis_url).await?;
    let writer = Writer::new(store, coord.clone(), config.sse_channel.clone());
    let runner = Arc::new(IngestRunner::new(tracking, writer, coord.clone(), config));
    let health = HealthStore::new(coord);

    let mut scheduler = IngestScheduler::new(runner, health);
    scheduler.start();

    info!("Worker running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    scheduler.shutdown();
    Ok(())
}
