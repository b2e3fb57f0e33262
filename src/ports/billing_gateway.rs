//! Billing gateway port - the operations exposed to application code.
//!
//! Each operation returns either a success payload or a typed
//! `BillingError`; raw transport exceptions never reach callers.
//! Implementations must ensure every externally-visible mutating call is
//! safe to execute more than once.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::BillingError;

/// Port for the resilient billing gateway.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Create a checkout session for a subscription purchase.
    ///
    /// Resolves or provisions the scope's provider customer first. On a
    /// stale customer mapping, clears it and resubmits once without the
    /// customer hint.
    async fn create_checkout(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, BillingError>;

    /// Create a one-time charge checkout for credit topups.
    async fn create_topup_checkout(
        &self,
        request: TopupCheckoutRequest,
    ) -> Result<CheckoutSession, BillingError>;

    /// Create a billing-portal session for subscription management.
    ///
    /// Requires an existing customer mapping for the scope.
    async fn create_portal_session(
        &self,
        scope_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError>;

    /// Fetch a subscription by provider id.
    async fn get_subscription(&self, subscription_id: &str)
        -> Result<Subscription, BillingError>;

    /// Cancel a subscription, either at period end or immediately.
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> Result<Subscription, BillingError>;

    /// Move a subscription's first billable item to a different price,
    /// with proration.
    async fn update_subscription_plan(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> Result<Subscription, BillingError>;

    /// Change the quantity on a subscription's first billable item,
    /// with proration.
    async fn update_subscription_quantity(
        &self,
        subscription_id: &str,
        quantity: u64,
    ) -> Result<Subscription, BillingError>;

    /// Refund a payment, fully or partially.
    async fn refund_payment(&self, request: RefundRequest) -> Result<RefundResult, BillingError>;
}

/// Request to create a subscription checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Local tenant/scope the purchase belongs to.
    pub scope_id: String,

    /// Provider price id for the plan being purchased.
    pub price_id: String,

    /// Seat quantity.
    pub quantity: u64,

    /// URL to redirect after successful checkout.
    pub success_url: String,

    /// URL to redirect after canceled checkout.
    pub cancel_url: String,

    /// Email to pre-fill when no customer is bound.
    pub customer_email: Option<String>,

    /// Caller metadata, bounded by provider limits.
    pub metadata: HashMap<String, String>,
}

/// Request to create a one-time charge (topup) checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopupCheckoutRequest {
    /// Local tenant/scope the purchase belongs to.
    pub scope_id: String,

    /// Charge amount in minor currency units.
    pub amount_minor: i64,

    /// ISO currency code (lowercase).
    pub currency: String,

    /// Credits granted by this topup.
    pub credits: i64,

    /// URL to redirect after successful checkout.
    pub success_url: String,

    /// URL to redirect after canceled checkout.
    pub cancel_url: String,
}

/// Request to refund a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Local tenant/scope the payment belongs to.
    pub scope_id: String,

    /// Provider's payment id.
    pub provider_payment_id: String,

    /// Amount to refund in minor units; `None` refunds in full.
    pub amount_minor: Option<i64>,
}

/// Checkout session projection of the provider response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session id.
    pub id: String,

    /// URL for the customer to complete checkout.
    pub url: String,

    /// When the session expires (Unix timestamp), if reported.
    pub expires_at: Option<i64>,

    /// Provider customer the session was bound to, if any.
    pub customer_id: Option<String>,
}

/// Billing-portal session projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSession {
    /// Provider's session id.
    pub id: String,

    /// URL for the customer to access the portal.
    pub url: String,
}

/// Subscription projection of the provider response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Provider's subscription id.
    pub id: String,

    /// Provider's customer id.
    pub customer_id: String,

    /// Current subscription status.
    pub status: SubscriptionStatus,

    /// Current billing period start (Unix timestamp).
    pub current_period_start: i64,

    /// Current billing period end (Unix timestamp).
    pub current_period_end: i64,

    /// Whether the subscription cancels at period end.
    pub cancel_at_period_end: bool,

    /// When cancellation was requested, if applicable.
    pub canceled_at: Option<i64>,

    /// Billable items on the subscription.
    pub items: Vec<SubscriptionItem>,
}

/// A billable item on a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionItem {
    /// Provider's item id.
    pub id: String,

    /// Price the item bills against.
    pub price_id: String,

    /// Seat quantity.
    pub quantity: u64,
}

/// Subscription status from the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription is active and current.
    Active,

    /// Payment is past due, grace period active.
    PastDue,

    /// Subscription is canceled (may remain active until period end).
    Canceled,

    /// Subscription is in trial period.
    Trialing,

    /// Initial payment incomplete.
    Incomplete,

    /// Payment failed after retries exhausted.
    IncompleteExpired,

    /// Subscription is paused.
    Paused,

    /// Unknown status from provider.
    Unknown,
}

impl SubscriptionStatus {
    /// Check whether this status grants access to the paid product.
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing | SubscriptionStatus::PastDue
        )
    }
}

/// Refund projection of the provider response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResult {
    /// Provider's refund id.
    pub id: String,

    /// Refund status reported by the provider.
    pub status: RefundStatus,

    /// Refunded amount in minor units.
    pub amount_minor: i64,

    /// ISO currency code.
    pub currency: String,
}

/// Refund status from the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
    Unknown,
}
