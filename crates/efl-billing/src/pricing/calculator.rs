//! Monthly cost calculation
//!
//! Applies a validated rate structure to a usage quantity:
//! - Base charge, unconditionally
//! - Energy charge, walking tiers in order
//! - TDU delivery, fixed plus per kWh
//! - Minimum-usage fee below its threshold, flat fees always
//! - The bill credit whose band contains the usage

use efl_common::money::{round_cents, round_rate};
use efl_common::{
    CalculationError, CostBreakdown, RateStructure, TierSlice, MAX_USAGE_KWH,
    STANDARD_USAGE_LEVELS_KWH,
};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

/// Stateless bill calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct CostCalculator;

impl CostCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Price one usage level
    ///
    /// Fails only for usage outside `[0, MAX_USAGE_KWH]`; every valid
    /// structure prices every usage in that range.
    #[instrument(skip(self, rate))]
    pub fn calculate(
        &self,
        rate: &RateStructure,
        usage_kwh: Decimal,
    ) -> Result<CostBreakdown, CalculationError> {
        let negative = usage_kwh.is_sign_negative() && !usage_kwh.is_zero();
        if negative || usage_kwh > Decimal::from(MAX_USAGE_KWH) {
            return Err(CalculationError::InvalidArgument { usage_kwh });
        }
        Ok(self.price(rate, usage_kwh))
    }

    /// Price several usage levels, in the order given
    pub fn calculate_levels(
        &self,
        rate: &RateStructure,
        levels_kwh: &[Decimal],
    ) -> Result<Vec<CostBreakdown>, CalculationError> {
        levels_kwh
            .iter()
            .map(|usage_kwh| self.calculate(rate, *usage_kwh))
            .collect()
    }

    /// Price the conventional 500, 1000, and 2000 kWh levels
    pub fn calculate_standard(&self, rate: &RateStructure) -> Vec<CostBreakdown> {
        STANDARD_USAGE_LEVELS_KWH
            .iter()
            .map(|usage_kwh| self.price(rate, Decimal::from(*usage_kwh)))
            .collect()
    }

    /// Usage is known to be in range here
    fn price(&self, rate: &RateStructure, usage_kwh: Decimal) -> CostBreakdown {
        // Energy: consume each tier up to its width
        let mut remaining = usage_kwh;
        let mut energy = Decimal::ZERO;
        let mut tier_breakdown = Vec::new();

        for (tier_index, tier) in rate.energy_rate_tiers().iter().enumerate() {
            if remaining.is_zero() {
                break;
            }
            let kwh = match tier.width_kwh() {
                Some(width) => remaining.min(width),
                None => remaining,
            };
            let charge = kwh * tier.rate_usd_per_kwh;
            energy += charge;
            remaining -= kwh;

            tier_breakdown.push(TierSlice {
                tier_index,
                label: tier.label(),
                kwh,
                rate_usd_per_kwh: tier.rate_usd_per_kwh,
                charge_usd: round_cents(charge),
            });
        }

        let base = rate.base_charge_usd();
        let tdu = rate.tdu_delivery().charge(usage_kwh);

        let minimum_fee = rate
            .minimum_usage_fee()
            .filter(|fee| fee.applies_to(usage_kwh))
            .map_or(Decimal::ZERO, |fee| fee.fee_usd);
        let fees = minimum_fee + rate.other_fees_total();

        let credit = rate
            .credit_for(usage_kwh)
            .map_or(Decimal::ZERO, |band| band.credit_usd);

        // Exact total; credits may push it below zero, which is reported as is
        let total = base + energy + tdu + fees - credit;

        let effective_rate_usd_per_kwh = if usage_kwh.is_zero() {
            None
        } else {
            Some(round_rate(total / usage_kwh))
        };

        debug!(
            usage_kwh = %usage_kwh,
            energy_usd = %energy,
            credit_usd = %credit,
            total_usd = %total,
            "Calculated cost"
        );

        CostBreakdown {
            usage_kwh,
            energy_charge_usd: round_cents(energy),
            base_charge_usd: round_cents(base),
            tdu_delivery_usd: round_cents(tdu),
            fees_usd: round_cents(fees),
            minimum_usage_fee_usd: round_cents(minimum_fee),
            credits_usd: if credit.is_zero() {
                Decimal::ZERO
            } else {
                -round_cents(credit)
            },
            total_usd: round_cents(total),
            effective_rate_usd_per_kwh,
            tier_breakdown,
        }
    }
}
