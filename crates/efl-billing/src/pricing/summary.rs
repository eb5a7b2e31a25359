//! One-line rate summaries

use efl_common::money::{round_cents, round_rate};
use efl_common::{PlanType, RateStructure};

/// Render e.g. `Fixed rate, $9.95 base charge, from $0.0900/kWh`
///
/// The base charge is omitted when zero; the quoted rate is the first tier's.
pub fn summarize(rate: &RateStructure, plan_type: PlanType) -> String {
    let mut parts = vec![format!("{} rate", plan_type.title())];

    let base = rate.base_charge_usd();
    if !base.is_zero() {
        parts.push(format!("${:.2} base charge", round_cents(base)));
    }

    if let Some(first) = rate.energy_rate_tiers().first() {
        parts.push(format!("from ${:.4}/kWh", round_rate(first.rate_usd_per_kwh)));
    }

    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use efl_common::EnergyTier;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_with_base_charge() {
        let rates = RateStructure::builder()
            .with_base_charge(dec!(9.95))
            .with_tier(EnergyTier::bounded(dec!(0), dec!(1000), dec!(0.09)))
            .with_tier(EnergyTier::open(dec!(1000), dec!(0.07)))
            .build()
            .unwrap();

        assert_eq!(
            summarize(&rates, PlanType::Fixed),
            "Fixed rate, $9.95 base charge, from $0.0900/kWh"
        );
    }

    #[test]
    fn test_summary_without_base_charge() {
        let rates = RateStructure::builder()
            .with_flat_rate(dec!(0.1325))
            .build()
            .unwrap();

        assert_eq!(
            summarize(&rates, PlanType::TimeOfUse),
            "Time Of Use rate, from $0.1325/kWh"
        );
    }
}
