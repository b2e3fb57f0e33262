//! LockStore port - cooperative mutual exclusion over a shared store.
//!
//! Implemented as an atomic "create key only if absent, with expiry".
//! There is no explicit release: the TTL is the sole liveness mechanism.
//! This trades a small window of unnecessary serialization for immunity
//! to crash-induced deadlock - a crashed holder cannot hold the lock past
//! its TTL.

use std::time::Duration;

use async_trait::async_trait;

/// Port for the distributed lock's backing store.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Attempt to acquire the lock.
    ///
    /// Returns `true` on exclusive ownership until `ttl` elapses.
    /// Callers must treat `false` as "someone else may be doing this
    /// work", not as a hard error; store outages degrade to `false`.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> bool;
}
