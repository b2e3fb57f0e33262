//! Stripe wire types and conversions into port projections.

use serde::Deserialize;

use crate::domain::billing::BillingError;
use crate::ports::{
    CheckoutSession, PortalSession, RefundResult, RefundStatus, Subscription, SubscriptionItem,
    SubscriptionStatus,
};

#[derive(Debug, Deserialize)]
pub(crate) struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for StripeList<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripePrice {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeSubscriptionItem {
    pub id: String,
    pub price: StripePrice,
    #[serde(default = "default_quantity")]
    pub quantity: u64,
}

fn default_quantity() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeSubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub current_period_start: i64,
    #[serde(default)]
    pub current_period_end: i64,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub canceled_at: Option<i64>,
    #[serde(default)]
    pub items: StripeList<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeCheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripePortalSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeRefund {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    pub amount: i64,
    pub currency: String,
}

fn subscription_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" => SubscriptionStatus::Active,
        "past_due" => SubscriptionStatus::PastDue,
        "canceled" => SubscriptionStatus::Canceled,
        "trialing" => SubscriptionStatus::Trialing,
        "incomplete" => SubscriptionStatus::Incomplete,
        "unpaid" | "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
        "paused" => SubscriptionStatus::Paused,
        _ => SubscriptionStatus::Unknown,
    }
}

fn refund_status(status: Option<&str>) -> RefundStatus {
    match status {
        Some("pending") => RefundStatus::Pending,
        Some("succeeded") => RefundStatus::Succeeded,
        Some("failed") => RefundStatus::Failed,
        Some("canceled") => RefundStatus::Canceled,
        _ => RefundStatus::Unknown,
    }
}

impl From<StripeSubscription> for Subscription {
    fn from(sub: StripeSubscription) -> Self {
        Subscription {
            id: sub.id,
            customer_id: sub.customer,
            status: subscription_status(&sub.status),
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
            canceled_at: sub.canceled_at,
            items: sub
                .items
                .data
                .into_iter()
                .map(|item| SubscriptionItem {
                    id: item.id,
                    price_id: item.price.id,
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

/// Parse a subscription response body into the port projection.
pub(crate) fn parse_subscription(
    value: serde_json::Value,
) -> Result<Subscription, BillingError> {
    let sub: StripeSubscription = serde_json::from_value(value)
        .map_err(|e| BillingError::transport(format!("unexpected subscription shape: {}", e)))?;
    Ok(sub.into())
}

/// Parse a checkout-session response body into the port projection.
///
/// A session without a redirect URL is unusable; surfacing it as a state
/// error beats handing callers a default.
pub(crate) fn parse_checkout_session(
    value: serde_json::Value,
) -> Result<CheckoutSession, BillingError> {
    let session: StripeCheckoutSession = serde_json::from_value(value)
        .map_err(|e| BillingError::transport(format!("unexpected checkout session shape: {}", e)))?;
    let url = session
        .url
        .ok_or_else(|| BillingError::state(format!("checkout session {} has no URL", session.id)))?;
    Ok(CheckoutSession {
        id: session.id,
        url,
        expires_at: session.expires_at,
        customer_id: session.customer,
    })
}

/// Parse a billing-portal session response body.
pub(crate) fn parse_portal_session(
    value: serde_json::Value,
) -> Result<PortalSession, BillingError> {
    let session: StripePortalSession = serde_json::from_value(value)
        .map_err(|e| BillingError::transport(format!("unexpected portal session shape: {}", e)))?;
    Ok(PortalSession {
        id: session.id,
        url: session.url,
    })
}

/// Parse a refund response body.
pub(crate) fn parse_refund(value: serde_json::Value) -> Result<RefundResult, BillingError> {
    let refund: StripeRefund = serde_json::from_value(value)
        .map_err(|e| BillingError::transport(format!("unexpected refund shape: {}", e)))?;
    Ok(RefundResult {
        id: refund.id,
        status: refund_status(refund.status.as_deref()),
        amount_minor: refund.amount,
        currency: refund.currency,
    })
}
