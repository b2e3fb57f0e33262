//! Ports - interfaces for external collaborators.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the gateway core and the outside world. Adapters implement these ports.
//!
//! ## Collaborator ports
//!
//! - `CustomerRepository` - persisted scope -> provider-customer mapping
//! - `LockStore` - atomic set-if-absent-with-expiry for the distributed lock
//! - `ScopeNameResolver` - optional labelling of newly created customers
//! - `PlanMapper` - optional pre-mapped price lookup for topup amounts
//! - `RequestContext` - optional ambient correlation id for tracing headers
//!
//! ## Core ports
//!
//! - `ProviderTransport` - a single HTTP call to the provider
//! - `CircuitBreaker` - external service resilience pattern
//! - `BillingGateway` - the public operations exposed to callers

mod billing_gateway;
mod circuit_breaker;
mod customer_repository;
mod lock_store;
mod name_resolver;
mod plan_mapper;
mod request_context;
mod transport;

pub use billing_gateway::{
    BillingGateway, CheckoutSession, CreateCheckoutRequest, PortalSession, RefundRequest,
    RefundResult, RefundStatus, Subscription, SubscriptionItem, SubscriptionStatus,
    TopupCheckoutRequest,
};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
pub use customer_repository::CustomerRepository;
pub use lock_store::LockStore;
pub use name_resolver::{NoOpNameResolver, ScopeNameResolver};
pub use plan_mapper::{NoOpPlanMapper, PlanMapper};
pub use request_context::{NoOpRequestContext, RequestContext};
pub use transport::{HttpMethod, ProviderRequest, ProviderTransport};
