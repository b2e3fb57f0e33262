//! Billing domain: error taxonomy, idempotency keys, validation bounds.

mod errors;
mod idempotency;
mod values;

pub use errors::BillingError;
pub use idempotency::IdempotencyKey;
pub use values::{
    validate_metadata, validate_refund_amount, validate_topup, MAX_CHARGE_AMOUNT_MINOR,
    MAX_METADATA_ENTRIES, MAX_METADATA_KEY_LEN, MAX_METADATA_VALUE_LEN,
};
