//! Dedup writer with pub/sub fanout. Insert first, publish after; a failed
//! publish never rolls back the row.

use tracing::warn;

use pulsenorth_common::types::Candidate;
use pulsenorth_coord::CoordClient;
use pulsenorth_store::{DevelopmentStore, WriteOutcome};

#[derive(Clone)]
pub struct Writer {
    store: DevelopmentStore,
    coord: CoordClient,
    channel: String,
}

impl Writer {
    pub fn new(store: DevelopmentStore, coord: CoordClient, channel: String) -> Self {
        Self { store, coord, channel }
    }

    pub fn store(&self) -> &DevelopmentStore {
        &self.store
    }

    /// Write one candidate. On insert, publish the canonical JSON event on
    /// the new-item channel (best-effort).
    pub async fn write(&self, candidate: &Candidate) -> WriteOutcome {
        let outcome = self.store.insert(candidate).await;
        if let WriteOutcome::Inserted(development) = &outcome {
            let payload = development.event_payload().to_string();
            if let Err(e) = self.coord.publish(&self.channel, &payload).await {
                warn!(hash = %development.hash, error = %e, "Failed to publish new-item event");
            }
        }
        outcome
    }
}
