//! Ingestion pipeline: the per-source runner, the cadence scheduler, the
//! dedup writer with fanout, the health snapshot, and the backfill engine.

pub mod backfill;
pub mod health;
pub mod runner;
pub mod scheduler;
pub mod writer;

pub use backfill::{month_windows, BackfillEngine, BackfillParams};
pub use health::{merge_snapshot, HealthStore};
pub use runner::{backoff_minutes, lock_ttl_secs, IngestRunner};
pub use scheduler::IngestScheduler;
pub use writer::Writer;
