//! CostBreakdown - itemized monthly bill at one usage level
//!
//! All amounts are rounded to the cent once, from full-precision sums.
//! `credits_usd` is signed: a credit is a negative contribution.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One tier's share of the energy charge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TierSlice {
    /// Position of the tier in the rate structure
    pub tier_index: usize,
    /// Tier label, e.g. `0-1000`
    pub label: String,
    /// kWh consumed in this tier
    pub kwh: Decimal,
    /// Tier rate
    pub rate_usd_per_kwh: Decimal,
    /// Rounded charge for this slice
    pub charge_usd: Decimal,
}

/// Itemized cost for one (rate structure, usage) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub usage_kwh: Decimal,
    pub energy_charge_usd: Decimal,
    pub base_charge_usd: Decimal,
    pub tdu_delivery_usd: Decimal,
    /// Minimum-usage fee plus all flat fees
    pub fees_usd: Decimal,
    /// Minimum-usage share of `fees_usd`
    pub minimum_usage_fee_usd: Decimal,
    /// Zero or negative
    pub credits_usd: Decimal,
    pub total_usd: Decimal,
    /// Total divided by usage, 4 places; absent at zero usage
    pub effective_rate_usd_per_kwh: Option<Decimal>,
    pub tier_breakdown: Vec<TierSlice>,
}

impl CostBreakdown {
    /// kWh accounted for by the tier slices
    pub fn sliced_kwh(&self) -> Decimal {
        self.tier_breakdown.iter().map(|slice| slice.kwh).sum()
    }

    /// Whether a credit reduced this bill
    pub fn has_credit(&self) -> bool {
        !self.credits_usd.is_zero()
    }
}
