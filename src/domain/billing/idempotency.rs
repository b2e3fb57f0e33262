//! Idempotency key derivation.
//!
//! Keys for state-mutating operations whose retries must collapse to one
//! effect are derived deterministically from the operation's semantic
//! identity. Identical logical intent produces an identical key, and the
//! provider deduplicates on it. Everything else gets a random key.

use serde::{Deserialize, Serialize};

/// A caller-chosen token that makes a provider-side mutating call safe
/// to repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Key for creating the provider customer bound to a scope.
    ///
    /// Derived from the scope alone so concurrent creators converge on
    /// one remote object even if the distributed lock was bypassed.
    pub fn customer_create(scope_id: &str) -> Self {
        Self(format!("customer-create:{}", scope_id))
    }

    /// Key for a subscription plan/quantity update.
    ///
    /// Combines subscription id, target price, and target quantity so a
    /// retried update cannot double-apply.
    pub fn subscription_update(subscription_id: &str, price_id: &str, quantity: u64) -> Self {
        Self(format!(
            "subscription-update:{}:{}:{}",
            subscription_id, price_id, quantity
        ))
    }

    /// Key for a refund. `None` amount means a full refund.
    pub fn refund(scope_id: &str, payment_id: &str, amount_minor: Option<i64>) -> Self {
        let amount = match amount_minor {
            Some(a) => a.to_string(),
            None => "full".to_string(),
        };
        Self(format!("refund:{}:{}:{}", scope_id, payment_id, amount))
    }

    /// Random key for mutations with no deterministic identity
    /// (e.g. checkout-session creation).
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn refund_key_matches_documented_shape() {
        let key = IdempotencyKey::refund("t1", "pay_1", Some(500));
        assert_eq!(key.as_str(), "refund:t1:pay_1:500");
    }

    #[test]
    fn full_refund_uses_literal_full() {
        let key = IdempotencyKey::refund("t1", "pay_1", None);
        assert_eq!(key.as_str(), "refund:t1:pay_1:full");
    }

    #[test]
    fn identical_intent_produces_identical_key() {
        assert_eq!(
            IdempotencyKey::refund("t1", "pay_1", Some(500)),
            IdempotencyKey::refund("t1", "pay_1", Some(500)),
        );
        assert_eq!(
            IdempotencyKey::subscription_update("sub_1", "price_a", 3),
            IdempotencyKey::subscription_update("sub_1", "price_a", 3),
        );
        assert_eq!(
            IdempotencyKey::customer_create("tenant-9"),
            IdempotencyKey::customer_create("tenant-9"),
        );
    }

    #[test]
    fn differing_intent_produces_differing_key() {
        assert_ne!(
            IdempotencyKey::refund("t1", "pay_1", Some(500)),
            IdempotencyKey::refund("t1", "pay_1", Some(501)),
        );
        assert_ne!(
            IdempotencyKey::refund("t1", "pay_1", Some(500)),
            IdempotencyKey::refund("t1", "pay_1", None),
        );
        assert_ne!(
            IdempotencyKey::subscription_update("sub_1", "price_a", 3),
            IdempotencyKey::subscription_update("sub_1", "price_b", 3),
        );
    }

    #[test]
    fn random_keys_differ() {
        assert_ne!(IdempotencyKey::random(), IdempotencyKey::random());
    }

    proptest! {
        #[test]
        fn subscription_update_is_deterministic(
            sub in "[a-z_0-9]{1,20}",
            price in "[a-z_0-9]{1,20}",
            qty in 1u64..1000,
        ) {
            prop_assert_eq!(
                IdempotencyKey::subscription_update(&sub, &price, qty),
                IdempotencyKey::subscription_update(&sub, &price, qty)
            );
        }
    }
}
