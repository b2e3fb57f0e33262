//! Validation bounds applied before any network call.

use std::collections::HashMap;

use super::BillingError;

/// Maximum number of metadata entries the provider accepts.
pub const MAX_METADATA_ENTRIES: usize = 50;

/// Maximum metadata key length in characters.
pub const MAX_METADATA_KEY_LEN: usize = 40;

/// Maximum metadata value length in characters.
pub const MAX_METADATA_VALUE_LEN: usize = 500;

/// Maximum one-time charge amount in minor currency units.
pub const MAX_CHARGE_AMOUNT_MINOR: i64 = 99_999_999;

/// Validate caller-supplied metadata against provider bounds.
pub fn validate_metadata(metadata: &HashMap<String, String>) -> Result<(), BillingError> {
    if metadata.len() > MAX_METADATA_ENTRIES {
        return Err(BillingError::validation(format!(
            "metadata has {} entries, maximum is {}",
            metadata.len(),
            MAX_METADATA_ENTRIES
        )));
    }

    for (key, value) in metadata {
        if key.chars().count() > MAX_METADATA_KEY_LEN {
            return Err(BillingError::validation(format!(
                "metadata key '{}' exceeds {} characters",
                key, MAX_METADATA_KEY_LEN
            )));
        }
        if value.chars().count() > MAX_METADATA_VALUE_LEN {
            return Err(BillingError::validation(format!(
                "metadata value for '{}' exceeds {} characters",
                key, MAX_METADATA_VALUE_LEN
            )));
        }
    }

    Ok(())
}

/// Validate a topup (one-time charge) request before any network call.
pub fn validate_topup(amount_minor: i64, credits: i64) -> Result<(), BillingError> {
    if amount_minor <= 0 {
        return Err(BillingError::validation(
            "topup amount must be a positive integer",
        ));
    }
    if amount_minor > MAX_CHARGE_AMOUNT_MINOR {
        return Err(BillingError::validation(format!(
            "topup amount {} exceeds provider maximum {}",
            amount_minor, MAX_CHARGE_AMOUNT_MINOR
        )));
    }
    if credits <= 0 {
        return Err(BillingError::validation(
            "topup credits must be a positive integer",
        ));
    }
    Ok(())
}

/// Validate a partial refund amount. `None` (full refund) is always valid.
pub fn validate_refund_amount(amount_minor: Option<i64>) -> Result<(), BillingError> {
    match amount_minor {
        Some(a) if a <= 0 => Err(BillingError::validation(
            "refund amount must be a positive integer",
        )),
        Some(a) if a > MAX_CHARGE_AMOUNT_MINOR => Err(BillingError::validation(format!(
            "refund amount {} exceeds provider maximum {}",
            a, MAX_CHARGE_AMOUNT_MINOR
        ))),
        _ => Ok(()),
    }
}
