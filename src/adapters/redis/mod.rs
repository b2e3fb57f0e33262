//! Redis-backed lock store for multi-server deployments.
//!
//! Uses `SET key value NX PX ttl` - an atomic create-if-absent with
//! expiry. Ownership lapses when the TTL elapses; nothing ever deletes
//! the key early, so a crashed holder cannot deadlock other processes.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::warn;

use crate::ports::LockStore;

/// Redis-backed `LockStore`.
#[derive(Clone)]
pub struct RedisLockStore {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisLockStore {
    /// Create a new Redis lock store.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: "billing:lock:".to_string(),
        }
    }

    /// Set a custom key prefix (namespacing between environments).
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> bool {
        let redis_key = format!("{}{}", self.key_prefix, key);
        let ttl_ms = ttl.as_millis().max(1) as u64;
        let mut conn = self.conn.clone();

        let result: Result<Option<String>, redis::RedisError> = redis::cmd("SET")
            .arg(&redis_key)
            .arg(uuid::Uuid::new_v4().to_string())
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await;

        match result {
            // SET NX returns OK on acquisition, nil when the key exists.
            Ok(reply) => reply.is_some(),
            Err(e) => {
                // Store outage degrades to "not acquired"; the caller's
                // provider-side idempotency key remains the safety net.
                warn!(key = %redis_key, error = %e, "lock store unavailable, treating as contended");
                false
            }
        }
    }
}

impl std::fmt::Debug for RedisLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    // Redis integration tests require a running Redis instance and are
    // typically run separately from unit tests.
    //
    // Example test setup:
    //
    // #[tokio::test]
    // #[ignore] // Run with: cargo test -- --ignored
    // async fn lock_round_trip() {
    //     let client = redis::Client::open("redis://127.0.0.1/").unwrap();
    //     let conn = client.get_multiplexed_tokio_connection().await.unwrap();
    //     let store = RedisLockStore::new(conn);
    //     assert!(store.try_acquire("k", Duration::from_secs(5)).await);
    //     assert!(!store.try_acquire("k", Duration::from_secs(5)).await);
    // }
}
