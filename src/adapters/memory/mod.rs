//! In-memory adapters for single-process deployments and tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::billing::BillingError;
use crate::ports::{CustomerRepository, LockStore};

/// In-memory lock store with TTL-only expiry.
///
/// Matches the shared-store contract: acquisition succeeds only when the
/// key is absent or its previous ownership has expired. There is no
/// release path.
#[derive(Debug, Default)]
pub struct InMemoryLockStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        entries.retain(|_, expires_at| *expires_at > now);

        if entries.contains_key(key) {
            return false;
        }
        entries.insert(key.to_string(), now + ttl);
        true
    }
}

/// In-memory customer-mapping repository.
#[derive(Debug, Default)]
pub struct InMemoryCustomerRepository {
    mappings: Mutex<HashMap<String, String>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a mapping (tests, migrations).
    pub fn insert(&self, scope_id: &str, provider_customer_id: &str) {
        self.mappings
            .lock()
            .unwrap()
            .insert(scope_id.to_string(), provider_customer_id.to_string());
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find(&self, scope_id: &str) -> Result<Option<String>, BillingError> {
        Ok(self.mappings.lock().unwrap().get(scope_id).cloned())
    }

    async fn save(&self, scope_id: &str, provider_customer_id: &str) -> Result<(), BillingError> {
        self.mappings
            .lock()
            .unwrap()
            .insert(scope_id.to_string(), provider_customer_id.to_string());
        Ok(())
    }

    async fn clear(&self, scope_id: &str) -> Result<(), BillingError> {
        self.mappings.lock().unwrap().remove(scope_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lock_is_exclusive_within_ttl() {
        let store = InMemoryLockStore::new();
        assert!(store.try_acquire("k", Duration::from_secs(30)).await);
        assert!(!store.try_acquire("k", Duration::from_secs(30)).await);
        // Different key is independent.
        assert!(store.try_acquire("other", Duration::from_secs(30)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn lock_becomes_acquirable_after_ttl_without_release() {
        let store = InMemoryLockStore::new();
        assert!(store.try_acquire("k", Duration::from_millis(100)).await);
        assert!(!store.try_acquire("k", Duration::from_millis(100)).await);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(store.try_acquire("k", Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn repository_round_trip_and_clear() {
        let repo = InMemoryCustomerRepository::new();
        assert_eq!(repo.find("t1").await.unwrap(), None);

        repo.save("t1", "cus_1").await.unwrap();
        assert_eq!(repo.find("t1").await.unwrap(), Some("cus_1".to_string()));

        repo.clear("t1").await.unwrap();
        assert_eq!(repo.find("t1").await.unwrap(), None);
    }
}
