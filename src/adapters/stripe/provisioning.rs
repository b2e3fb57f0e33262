//! Customer provisioning - idempotent find-or-create under contention.
//!
//! Multiple callers may race to provision the provider customer for the
//! same scope. The per-scope lock serializes creation in the common case;
//! after bounded lock retries the caller proceeds anyway, and the
//! scope-derived idempotency key is the final safety net against
//! duplicate creation during lock-store outages.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::GatewayConfig;
use crate::domain::billing::{BillingError, IdempotencyKey};
use crate::ports::{CustomerRepository, LockStore, ProviderRequest, ProviderTransport, ScopeNameResolver};
use crate::resilience::{retry_with_classifier, ErrorClassifier, RetryPolicy};

use super::types::StripeCustomer;

/// Find-or-create for the provider customer bound to a scope.
pub struct CustomerProvisioner {
    transport: Arc<dyn ProviderTransport>,
    repository: Arc<dyn CustomerRepository>,
    locks: Arc<dyn LockStore>,
    names: Arc<dyn ScopeNameResolver>,
    classifier: Arc<dyn ErrorClassifier>,
    retry: RetryPolicy,
    lock_ttl: Duration,
    lock_retry_attempts: u32,
    lock_retry_interval: Duration,
}

impl CustomerProvisioner {
    pub fn new(
        config: &GatewayConfig,
        transport: Arc<dyn ProviderTransport>,
        repository: Arc<dyn CustomerRepository>,
        locks: Arc<dyn LockStore>,
        names: Arc<dyn ScopeNameResolver>,
        classifier: Arc<dyn ErrorClassifier>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            repository,
            locks,
            names,
            classifier,
            retry,
            lock_ttl: config.lock_ttl(),
            lock_retry_attempts: config.lock_retry_attempts(),
            lock_retry_interval: config.lock_retry_interval(),
        }
    }

    /// Resolve the provider customer id for a scope, creating the remote
    /// record if none is mapped yet.
    ///
    /// Returns `None` on creation failure: checkout can proceed without a
    /// pre-bound customer (the provider creates one inline), so this is a
    /// soft degradation, not a hard failure.
    pub async fn ensure_customer_id(&self, scope_id: &str) -> Option<String> {
        // Fast path.
        if let Some(id) = self.find_mapped(scope_id).await {
            return Some(id);
        }

        let lock_key = format!("customer-create:{}", scope_id);
        let mut acquired = self.locks.try_acquire(&lock_key, self.lock_ttl).await;

        if !acquired {
            // Another holder may be mid-creation: wait bounded, re-check
            // the mapping, re-attempt the lock.
            for _ in 0..self.lock_retry_attempts {
                tokio::time::sleep(self.lock_retry_interval).await;
                if let Some(id) = self.find_mapped(scope_id).await {
                    return Some(id);
                }
                if self.locks.try_acquire(&lock_key, self.lock_ttl).await {
                    acquired = true;
                    break;
                }
            }
            if !acquired {
                warn!(
                    scope_id = %scope_id,
                    "proceeding without lock after bounded retries; idempotency key deduplicates creation"
                );
            }
        }

        // Closes the race between the checks above and actual creation.
        if let Some(id) = self.find_mapped(scope_id).await {
            return Some(id);
        }

        let customer_id = match self.create_remote_customer(scope_id).await {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    scope_id = %scope_id,
                    error = %e,
                    "customer provisioning failed; checkout will proceed without a pre-bound customer"
                );
                return None;
            }
        };

        if let Err(e) = self.repository.save(scope_id, &customer_id).await {
            warn!(
                scope_id = %scope_id,
                customer_id = %customer_id,
                error = %e,
                "failed to persist customer mapping"
            );
        }

        Some(customer_id)
    }

    async fn find_mapped(&self, scope_id: &str) -> Option<String> {
        match self.repository.find(scope_id).await {
            Ok(mapping) => mapping,
            Err(e) => {
                warn!(scope_id = %scope_id, error = %e, "customer mapping lookup failed");
                None
            }
        }
    }

    async fn create_remote_customer(&self, scope_id: &str) -> Result<String, BillingError> {
        let name = self.names.get_name(scope_id).await;

        retry_with_classifier(
            &self.retry,
            self.classifier.as_ref(),
            "create_customer",
            || {
                let name = name.clone();
                async move {
                    // Scope-derived key: concurrent creators converge on
                    // one remote object even if the lock was bypassed.
                    let mut request = ProviderRequest::post("/v1/customers")
                        .param("metadata[scope_id]", scope_id)
                        .idempotency_key(IdempotencyKey::customer_create(scope_id));
                    if let Some(name) = name {
                        request = request.param("name", name);
                    }

                    let value = self.transport.request(request).await?;
                    let customer: StripeCustomer = serde_json::from_value(value).map_err(|e| {
                        BillingError::transport(format!("unexpected customer shape: {}", e))
                    })?;
                    if customer.deleted {
                        return Err(BillingError::state(format!(
                            "provider returned deleted customer {}",
                            customer.id
                        )));
                    }
                    Ok(customer.id)
                }
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::adapters::memory::{InMemoryCustomerRepository, InMemoryLockStore};
    use crate::adapters::stripe::ScriptedTransport;
    use crate::ports::NoOpNameResolver;
    use crate::resilience::ProviderErrorClassifier;

    fn provisioner(
        transport: Arc<ScriptedTransport>,
        repository: Arc<InMemoryCustomerRepository>,
        locks: Arc<InMemoryLockStore>,
    ) -> CustomerProvisioner {
        let config = GatewayConfig::new("sk_test_abc")
            .with_lock_ttl(Duration::from_millis(500))
            .with_lock_retries(5, Duration::from_millis(20));
        CustomerProvisioner::new(
            &config,
            transport,
            repository,
            locks,
            Arc::new(NoOpNameResolver),
            Arc::new(ProviderErrorClassifier),
            RetryPolicy::default(),
        )
    }

    #[tokio::test]
    async fn fast_path_returns_existing_mapping_without_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let repository = Arc::new(InMemoryCustomerRepository::new());
        repository.insert("t1", "cus_existing");
        let p = provisioner(transport.clone(), repository, Arc::new(InMemoryLockStore::new()));

        let id = p.ensure_customer_id("t1").await;

        assert_eq!(id.as_deref(), Some("cus_existing"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn creates_and_persists_when_unmapped() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(json!({"id": "cus_new"}));
        let repository = Arc::new(InMemoryCustomerRepository::new());
        let p = provisioner(transport.clone(), repository.clone(), Arc::new(InMemoryLockStore::new()));

        let id = p.ensure_customer_id("t1").await;

        assert_eq!(id.as_deref(), Some("cus_new"));
        assert_eq!(repository.find("t1").await.unwrap().as_deref(), Some("cus_new"));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].idempotency_key.as_ref().unwrap().as_str(),
            "customer-create:t1"
        );
    }

    #[tokio::test]
    async fn creation_failure_soft_fails_to_none() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_err(BillingError::provider(400, "invalid request"));
        let repository = Arc::new(InMemoryCustomerRepository::new());
        let p = provisioner(transport, repository.clone(), Arc::new(InMemoryLockStore::new()));

        let id = p.ensure_customer_id("t1").await;

        assert_eq!(id, None);
        assert_eq!(repository.find("t1").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_converge_on_one_customer() {
        let transport = Arc::new(ScriptedTransport::new());
        // One response only: the single lock holder creates; waiters see
        // the persisted mapping on their next re-check.
        transport.push_ok(json!({"id": "cus_shared"}));
        let repository = Arc::new(InMemoryCustomerRepository::new());
        let locks = Arc::new(InMemoryLockStore::new());
        let p = Arc::new(provisioner(transport.clone(), repository, locks));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let p = p.clone();
                tokio::spawn(async move { p.ensure_customer_id("t1").await })
            })
            .collect();

        for handle in handles {
            let id = handle.await.unwrap();
            assert_eq!(id.as_deref(), Some("cus_shared"));
        }
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn proceeds_without_lock_after_bounded_retries() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(json!({"id": "cus_bypass"}));
        let repository = Arc::new(InMemoryCustomerRepository::new());
        let locks = Arc::new(InMemoryLockStore::new());
        // A stale holder keeps the lock for longer than all retries.
        assert!(locks.try_acquire("customer-create:t1", Duration::from_secs(60)).await);

        let p = provisioner(transport.clone(), repository, locks);
        let id = p.ensure_customer_id("t1").await;

        assert_eq!(id.as_deref(), Some("cus_bypass"));
        assert_eq!(transport.call_count(), 1);
    }
}
