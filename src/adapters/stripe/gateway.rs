//! Stripe billing gateway.
//!
//! Implements `BillingGateway` with a single outer wrapper providing
//! retry-with-classification and circuit breaking uniformly across every
//! operation. Fast validation failures are raised before any network
//! call and bypass the wrapper.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::config::GatewayConfig;
use crate::domain::billing::{
    validate_metadata, validate_refund_amount, validate_topup, BillingError, IdempotencyKey,
};
use crate::adapters::memory::{InMemoryCustomerRepository, InMemoryLockStore};
use crate::ports::{
    BillingGateway, CheckoutSession, CircuitBreaker, CircuitBreakerConfig, CreateCheckoutRequest,
    CustomerRepository, LockStore, NoOpNameResolver, NoOpPlanMapper, PlanMapper, PortalSession,
    ProviderRequest, ProviderTransport, RefundRequest, RefundResult, RequestContext,
    ScopeNameResolver, Subscription, SubscriptionItem, TopupCheckoutRequest,
};
use crate::resilience::{
    retry_with_classifier, ErrorClassifier, ProviderCircuitBreaker, ProviderErrorClassifier,
    RetryPolicy,
};

use super::provisioning::CustomerProvisioner;
use super::transport::HttpTransport;
use super::types::{parse_checkout_session, parse_portal_session, parse_refund, parse_subscription};

/// Circuit-breaker operation group: the provider's API as a whole, so a
/// provider-wide outage trips once rather than per endpoint.
const OPERATION_GROUP: &str = "billing-provider";

/// Resilient Stripe billing gateway.
///
/// Collaborators are constructor-injected with no-op defaults; there is
/// no ambient global state.
pub struct StripeBillingGateway {
    config: GatewayConfig,
    transport: Arc<dyn ProviderTransport>,
    repository: Arc<dyn CustomerRepository>,
    locks: Arc<dyn LockStore>,
    names: Arc<dyn ScopeNameResolver>,
    plans: Arc<dyn PlanMapper>,
    breaker: Arc<dyn CircuitBreaker>,
    classifier: Arc<dyn ErrorClassifier>,
    retry: RetryPolicy,
}

impl StripeBillingGateway {
    /// Create a gateway with validated configuration and default
    /// collaborators (in-memory repository and lock store, no-op
    /// resolvers, reference classifier, payment-provider breaker).
    pub fn new(config: GatewayConfig) -> Result<Self, BillingError> {
        config.validate()?;
        let transport: Arc<dyn ProviderTransport> = Arc::new(HttpTransport::new(config.clone()));
        Ok(Self {
            config,
            transport,
            repository: Arc::new(InMemoryCustomerRepository::new()),
            locks: Arc::new(InMemoryLockStore::new()),
            names: Arc::new(NoOpNameResolver),
            plans: Arc::new(NoOpPlanMapper),
            breaker: Arc::new(ProviderCircuitBreaker::new(
                OPERATION_GROUP,
                CircuitBreakerConfig::for_payment_provider(),
            )),
            classifier: Arc::new(ProviderErrorClassifier),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_repository(mut self, repository: Arc<dyn CustomerRepository>) -> Self {
        self.repository = repository;
        self
    }

    pub fn with_lock_store(mut self, locks: Arc<dyn LockStore>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_name_resolver(mut self, names: Arc<dyn ScopeNameResolver>) -> Self {
        self.names = names;
        self
    }

    pub fn with_plan_mapper(mut self, plans: Arc<dyn PlanMapper>) -> Self {
        self.plans = plans;
        self
    }

    /// Route outbound calls through the ambient request context for
    /// correlation ids. Rebuilds the HTTP transport.
    pub fn with_request_context(mut self, context: Arc<dyn RequestContext>) -> Self {
        self.transport = Arc::new(HttpTransport::new(self.config.clone()).with_context(context));
        self
    }

    /// Replace the transport entirely (tests, custom providers).
    pub fn with_transport(mut self, transport: Arc<dyn ProviderTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: Arc<dyn CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resolve or provision the provider customer for a scope.
    ///
    /// `None` means provisioning soft-failed; checkout proceeds without
    /// a pre-bound customer.
    pub async fn ensure_customer_id(&self, scope_id: &str) -> Option<String> {
        self.provisioner().ensure_customer_id(scope_id).await
    }

    fn provisioner(&self) -> CustomerProvisioner {
        CustomerProvisioner::new(
            &self.config,
            self.transport.clone(),
            self.repository.clone(),
            self.locks.clone(),
            self.names.clone(),
            self.classifier.clone(),
            self.retry.clone(),
        )
    }

    /// The single outer wrapper: circuit-breaker check, then retry with
    /// classification. Every call outcome feeds the breaker.
    async fn call<T, F, Fut>(&self, operation: &str, f: F) -> Result<T, BillingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BillingError>>,
    {
        if !self.breaker.should_allow() {
            let retry_after = self
                .breaker
                .metrics()
                .time_until_half_open
                .unwrap_or_default();
            return Err(BillingError::CircuitOpen {
                group: OPERATION_GROUP.to_string(),
                retry_after,
            });
        }

        let result = retry_with_classifier(&self.retry, self.classifier.as_ref(), operation, f).await;
        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(_) => self.breaker.record_failure(),
        }
        result
    }

    async fn submit_checkout(
        &self,
        request: &CreateCheckoutRequest,
        customer_id: Option<&str>,
    ) -> Result<CheckoutSession, BillingError> {
        let mut req = ProviderRequest::post("/v1/checkout/sessions")
            .param("mode", "subscription")
            .param("line_items[0][price]", &request.price_id)
            .param("line_items[0][quantity]", request.quantity.to_string())
            .param("success_url", &request.success_url)
            .param("cancel_url", &request.cancel_url)
            .param("metadata[scope_id]", &request.scope_id);

        for (key, value) in &request.metadata {
            req = req.param(format!("metadata[{}]", key), value);
        }

        match customer_id {
            Some(id) => req = req.param("customer", id),
            None => {
                if let Some(email) = &request.customer_email {
                    req = req.param("customer_email", email);
                }
            }
        }

        parse_checkout_session(self.transport.request(req).await?)
    }

    async fn fetch_subscription(&self, subscription_id: &str) -> Result<Subscription, BillingError> {
        let value = self
            .transport
            .request(ProviderRequest::get(format!(
                "/v1/subscriptions/{}",
                subscription_id
            )))
            .await?;
        parse_subscription(value)
    }

    /// Resolve the item billing operations act on.
    ///
    /// Zero items is a hard error; more than one is a documented
    /// limitation - we proceed against the first and warn.
    fn first_billable_item<'a>(
        &self,
        subscription: &'a Subscription,
    ) -> Result<&'a SubscriptionItem, BillingError> {
        match subscription.items.as_slice() {
            [] => Err(BillingError::state(format!(
                "subscription {} has no billable items",
                subscription.id
            ))),
            [only] => Ok(only),
            [first, ..] => {
                warn!(
                    subscription_id = %subscription.id,
                    item_count = subscription.items.len(),
                    "subscription has multiple items; operating on the first"
                );
                Ok(first)
            }
        }
    }
}

#[async_trait]
impl BillingGateway for StripeBillingGateway {
    async fn create_checkout(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        validate_metadata(&request.metadata)?;
        if request.quantity == 0 {
            return Err(BillingError::validation("quantity must be positive"));
        }

        let customer_id = self.provisioner().ensure_customer_id(&request.scope_id).await;

        let first = self
            .call("create_checkout", || {
                self.submit_checkout(&request, customer_id.as_deref())
            })
            .await;

        match first {
            Err(error) if customer_id.is_some() && error.is_customer_missing() => {
                // Stale mapping: the provider no longer knows the bound
                // customer (e.g. account migrated). Clear it, resubmit
                // once without the hint, persist whatever the provider
                // returns. Exactly one compensation attempt.
                warn!(
                    scope_id = %request.scope_id,
                    error = %error,
                    "provider rejected mapped customer; clearing stale mapping and resubmitting"
                );
                if let Err(e) = self.repository.clear(&request.scope_id).await {
                    warn!(scope_id = %request.scope_id, error = %e, "failed to clear stale mapping");
                }

                let session = self
                    .call("create_checkout", || self.submit_checkout(&request, None))
                    .await?;

                if let Some(new_id) = &session.customer_id {
                    if let Err(e) = self.repository.save(&request.scope_id, new_id).await {
                        warn!(
                            scope_id = %request.scope_id,
                            customer_id = %new_id,
                            error = %e,
                            "failed to persist replacement customer mapping"
                        );
                    }
                }
                Ok(session)
            }
            other => other,
        }
    }

    async fn create_topup_checkout(
        &self,
        request: TopupCheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        validate_topup(request.amount_minor, request.credits)?;
        let currency = request.currency.to_lowercase();
        let request = &request;
        let currency = &currency;

        self.call("create_topup_checkout", move || {
            async move {
                let mut req = ProviderRequest::post("/v1/checkout/sessions")
                    .param("mode", "payment")
                    .param("success_url", &request.success_url)
                    .param("cancel_url", &request.cancel_url)
                    .param("metadata[scope_id]", &request.scope_id)
                    .param("metadata[credits]", request.credits.to_string())
                    .param("line_items[0][quantity]", "1");

                // Prefer a pre-mapped price for this amount/currency;
                // fall back to an inline ad-hoc price.
                match self.plans.topup_price_id(request.amount_minor, currency) {
                    Some(price_id) => {
                        req = req.param("line_items[0][price]", price_id);
                    }
                    None => {
                        req = req
                            .param("line_items[0][price_data][currency]", &currency)
                            .param(
                                "line_items[0][price_data][unit_amount]",
                                request.amount_minor.to_string(),
                            )
                            .param(
                                "line_items[0][price_data][product_data][name]",
                                format!("{} credits", request.credits),
                            );
                    }
                }

                parse_checkout_session(self.transport.request(req).await?)
            }
        })
        .await
    }

    async fn create_portal_session(
        &self,
        scope_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError> {
        // No customer means nothing to manage: a hard error, not a
        // provisioning trigger.
        let customer_id = self
            .repository
            .find(scope_id)
            .await?
            .ok_or_else(|| {
                BillingError::state(format!("no provider customer mapped for scope {}", scope_id))
            })?;

        self.call("create_portal_session", || {
            let customer_id = customer_id.clone();
            async move {
                let req = ProviderRequest::post("/v1/billing_portal/sessions")
                    .param("customer", customer_id)
                    .param("return_url", return_url);
                parse_portal_session(self.transport.request(req).await?)
            }
        })
        .await
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, BillingError> {
        self.call("get_subscription", || self.fetch_subscription(subscription_id))
            .await
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> Result<Subscription, BillingError> {
        self.call("cancel_subscription", || async move {
            let req = if at_period_end {
                ProviderRequest::post(format!("/v1/subscriptions/{}", subscription_id))
                    .param("cancel_at_period_end", "true")
            } else {
                ProviderRequest::delete(format!("/v1/subscriptions/{}", subscription_id))
            };
            parse_subscription(self.transport.request(req).await?)
        })
        .await
    }

    async fn update_subscription_plan(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> Result<Subscription, BillingError> {
        self.call("update_subscription_plan", || async move {
            let current = self.fetch_subscription(subscription_id).await?;
            let item = self.first_billable_item(&current)?;

            let req = ProviderRequest::post(format!("/v1/subscriptions/{}", subscription_id))
                .param("items[0][id]", &item.id)
                .param("items[0][price]", price_id)
                .param("items[0][quantity]", item.quantity.to_string())
                .param("proration_behavior", "create_prorations")
                .idempotency_key(IdempotencyKey::subscription_update(
                    subscription_id,
                    price_id,
                    item.quantity,
                ));
            parse_subscription(self.transport.request(req).await?)
        })
        .await
    }

    async fn update_subscription_quantity(
        &self,
        subscription_id: &str,
        quantity: u64,
    ) -> Result<Subscription, BillingError> {
        if quantity == 0 {
            return Err(BillingError::validation("quantity must be positive"));
        }

        self.call("update_subscription_quantity", || async move {
            let current = self.fetch_subscription(subscription_id).await?;
            let item = self.first_billable_item(&current)?;

            let req = ProviderRequest::post(format!("/v1/subscriptions/{}", subscription_id))
                .param("items[0][id]", &item.id)
                .param("items[0][quantity]", quantity.to_string())
                .param("proration_behavior", "create_prorations")
                .idempotency_key(IdempotencyKey::subscription_update(
                    subscription_id,
                    &item.price_id,
                    quantity,
                ));
            parse_subscription(self.transport.request(req).await?)
        })
        .await
    }

    async fn refund_payment(&self, request: RefundRequest) -> Result<RefundResult, BillingError> {
        validate_refund_amount(request.amount_minor)?;
        let request = &request;

        self.call("refund_payment", move || async move {
            let mut req = ProviderRequest::post("/v1/refunds")
                .param("payment_intent", &request.provider_payment_id)
                .param("metadata[scope_id]", &request.scope_id)
                .idempotency_key(IdempotencyKey::refund(
                    &request.scope_id,
                    &request.provider_payment_id,
                    request.amount_minor,
                ));
            if let Some(amount) = request.amount_minor {
                req = req.param("amount", amount.to_string());
            }
            parse_refund(self.transport.request(req).await?)
        })
        .await
    }
}
