//! Redis coordination client: per-source ingest locks, the new-item pub/sub
//! channel, and small JSON blobs (backfill progress, health snapshot).
//!
//! Lock discipline: `SET key token NX EX ttl` to acquire, compare-and-delete
//! on the token to release. The token guard means a runner that outlived its
//! TTL can never delete a lock another runner now holds.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

/// Lua compare-and-delete: deletes the key only while it still holds the
/// caller's token. Atomic on the server, so the TTL race is closed.
const UNLOCK_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

/// Coordination-store key holding the backfill progress JSON.
pub const BACKFILL_STATUS_KEY: &str = "backfill:status";

/// Coordination-store key holding the cached source-health snapshot.
pub const SOURCE_HEALTH_KEY: &str = "source_health:latest";

/// Lock key for one source's ingest run.
pub fn ingest_lock_key(source_key: &str) -> String {
    format!("ingest_live:lock:{source_key}")
}

#[derive(Clone)]
pub struct CoordClient {
    client: redis::Client,
    manager: ConnectionManager,
}

impl CoordClient {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Invalid Redis URL")?;
        let manager = ConnectionManager::new(client.clone())
            .await
            .context("Failed to connect to Redis")?;
        Ok(Self { client, manager })
    }

    /// Atomically acquire `key` for `ttl_secs` if nobody holds it.
    /// Returns false when the lock is already held.
    pub async fn try_acquire_lock(&self, key: &str, token: &str, ttl_secs: u64) -> Result<bool> {
        let mut conn = self.manager.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .context("Lock acquire failed")?;
        Ok(reply.is_some())
    }

    /// Release `key` only if it still holds `token`. Returns true when the
    /// lock was actually deleted.
    pub async fn release_lock(&self, key: &str, token: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        let deleted: i64 = redis::Script::new(UNLOCK_SCRIPT)
            .key(key)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .context("Lock release failed")?;
        Ok(deleted == 1)
    }

    /// Publish a payload on a pub/sub channel. Best-effort delivery; the
    /// caller decides whether a failure matters.
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.publish::<_, _, ()>(channel, payload)
            .await
            .context("Publish failed")?;
        Ok(())
    }

    /// Overwrite a JSON blob at `key` (last write wins).
    pub async fn set_json(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(key, value.to_string())
            .await
            .with_context(|| format!("Failed to set {key}"))?;
        Ok(())
    }

    /// Read a JSON blob. Missing keys and unparseable payloads both come back
    /// as None; readers tolerate partial snapshots.
    pub async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn
            .get(key)
            .await
            .with_context(|| format!("Failed to read {key}"))?;
        Ok(raw.and_then(|s| match serde_json::from_str(&s) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Discarding unparseable coordination payload");
                None
            }
        }))
    }

    /// A dedicated pub/sub connection (one per SSE subscriber).
    pub async fn pubsub(&self) -> Result<redis::aio::PubSub> {
        let conn = self
            .client
            .get_async_connection()
            .await
            .context("Failed to open pub/sub connection")?;
        Ok(conn.into_pubsub())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_shape() {
        assert_eq!(ingest_lock_key("openalex"), "ingest_live:lock:openalex");
    }
}
