//! CustomerRepository port - persisted scope -> provider-customer mapping.
//!
//! One mapping per (scope, provider). The gateway never assumes it is the
//! only writer and re-validates state after waiting on the lock.

use async_trait::async_trait;

use crate::domain::billing::BillingError;

/// Port for the customer-mapping repository.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Look up the provider customer id mapped to a scope.
    async fn find(&self, scope_id: &str) -> Result<Option<String>, BillingError>;

    /// Persist the mapping for a scope, replacing any existing one.
    async fn save(&self, scope_id: &str, provider_customer_id: &str) -> Result<(), BillingError>;

    /// Remove the mapping for a scope (stale provider id).
    async fn clear(&self, scope_id: &str) -> Result<(), BillingError>;
}
