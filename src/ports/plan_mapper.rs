//! PlanMapper port - pre-mapped provider price lookup.

/// Port for resolving pre-configured provider price ids.
///
/// Topup checkouts prefer a mapped price for the (amount, currency) pair
/// and fall back to an inline ad-hoc price when none is mapped.
pub trait PlanMapper: Send + Sync {
    fn topup_price_id(&self, amount_minor: i64, currency: &str) -> Option<String>;
}

/// Default mapper with no pre-mapped prices.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPlanMapper;

impl PlanMapper for NoOpPlanMapper {
    fn topup_price_id(&self, _amount_minor: i64, _currency: &str) -> Option<String> {
        None
    }
}
