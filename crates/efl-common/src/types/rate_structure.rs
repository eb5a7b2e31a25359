//! RateStructure - normalized rate model of one electricity plan
//!
//! A plan's monthly bill is assembled from:
//! - a fixed base charge
//! - contiguous energy tiers, each priced per kWh
//! - TDU delivery (fixed and/or per kWh)
//! - an optional minimum-usage fee, usage-banded bill credits, flat fees
//!
//! A `RateStructure` can only be obtained through validation, so holders may
//! rely on every invariant without re-checking.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{InvariantViolation, RateField};
use crate::MAX_AMOUNT_USD;

/// A usage band priced at a single per-kWh rate
///
/// Bounds are half-open: `[lower_bound_kwh, upper_bound_kwh)`. A missing upper
/// bound means the tier covers all remaining usage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnergyTier {
    pub lower_bound_kwh: Decimal,
    pub upper_bound_kwh: Option<Decimal>,
    pub rate_usd_per_kwh: Decimal,
}

impl EnergyTier {
    /// Tier with both bounds
    pub fn bounded(lower_bound_kwh: Decimal, upper_bound_kwh: Decimal, rate_usd_per_kwh: Decimal) -> Self {
        Self {
            lower_bound_kwh,
            upper_bound_kwh: Some(upper_bound_kwh),
            rate_usd_per_kwh,
        }
    }

    /// Open-ended ("and above") tier
    pub fn open(lower_bound_kwh: Decimal, rate_usd_per_kwh: Decimal) -> Self {
        Self {
            lower_bound_kwh,
            upper_bound_kwh: None,
            rate_usd_per_kwh,
        }
    }

    /// kWh covered by this tier, `None` if unbounded
    pub fn width_kwh(&self) -> Option<Decimal> {
        self.upper_bound_kwh.map(|upper| upper - self.lower_bound_kwh)
    }

    /// Short label such as `0-1000` or `1000+`
    pub fn label(&self) -> String {
        match self.upper_bound_kwh {
            Some(upper) => format!("{}-{}", self.lower_bound_kwh.normalize(), upper.normalize()),
            None => format!("{}+", self.lower_bound_kwh.normalize()),
        }
    }
}

/// Transmission and distribution utility delivery charges
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TduDelivery {
    /// Fixed monthly delivery charge
    pub fixed_usd: Decimal,
    /// Per-kWh delivery rate
    pub per_kwh_usd: Decimal,
}

impl TduDelivery {
    pub fn new(fixed_usd: Decimal, per_kwh_usd: Decimal) -> Self {
        Self {
            fixed_usd,
            per_kwh_usd,
        }
    }

    /// True when the document stated no delivery charge at all
    pub fn is_zero(&self) -> bool {
        self.fixed_usd.is_zero() && self.per_kwh_usd.is_zero()
    }

    /// Unrounded delivery charge at the given usage
    pub fn charge(&self, usage_kwh: Decimal) -> Decimal {
        self.fixed_usd + self.per_kwh_usd * usage_kwh
    }
}

/// Fee charged when usage falls below a threshold
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MinimumUsageFee {
    pub threshold_kwh: Decimal,
    pub fee_usd: Decimal,
}

impl MinimumUsageFee {
    pub fn new(threshold_kwh: Decimal, fee_usd: Decimal) -> Self {
        Self {
            threshold_kwh,
            fee_usd,
        }
    }

    /// Strictly below the threshold
    pub fn applies_to(&self, usage_kwh: Decimal) -> bool {
        usage_kwh < self.threshold_kwh
    }
}

/// Credit applied when usage falls within a band
///
/// Bands include their minimum and exclude their maximum, except the highest
/// band of a structure, which includes both ends. A missing maximum means
/// "and above".
///
/// A band stated as "more than N kWh" has an exclusive minimum; the band
/// ending at N then keeps N itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillCredit {
    pub threshold_kwh_min: Decimal,
    pub threshold_kwh_max: Option<Decimal>,
    pub credit_usd: Decimal,
    #[serde(default)]
    pub min_exclusive: bool,
}

impl BillCredit {
    pub fn bounded(min_kwh: Decimal, max_kwh: Decimal, credit_usd: Decimal) -> Self {
        Self {
            threshold_kwh_min: min_kwh,
            threshold_kwh_max: Some(max_kwh),
            credit_usd,
            min_exclusive: false,
        }
    }

    pub fn open(min_kwh: Decimal, credit_usd: Decimal) -> Self {
        Self {
            threshold_kwh_min: min_kwh,
            threshold_kwh_max: None,
            credit_usd,
            min_exclusive: false,
        }
    }

    /// Open band for usage strictly above `min_kwh`
    pub fn above(min_kwh: Decimal, credit_usd: Decimal) -> Self {
        Self {
            min_exclusive: true,
            ..Self::open(min_kwh, credit_usd)
        }
    }

    /// Band membership; `max_inclusive` makes the maximum part of the band
    pub fn contains(&self, usage_kwh: Decimal, max_inclusive: bool) -> bool {
        let above_min = if self.min_exclusive {
            usage_kwh > self.threshold_kwh_min
        } else {
            usage_kwh >= self.threshold_kwh_min
        };
        if !above_min {
            return false;
        }
        match self.threshold_kwh_max {
            None => true,
            Some(max) if max_inclusive => usage_kwh <= max,
            Some(max) => usage_kwh < max,
        }
    }
}

/// Flat fee applied to every bill
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fee {
    pub label: String,
    pub amount_usd: Decimal,
}

impl Fee {
    pub fn new(label: impl Into<String>, amount_usd: Decimal) -> Self {
        Self {
            label: label.into(),
            amount_usd,
        }
    }
}

/// Validated, immutable rate model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RateStructureParts")]
pub struct RateStructure {
    base_charge_usd: Decimal,
    energy_rate_tiers: Vec<EnergyTier>,
    tdu_delivery: TduDelivery,
    minimum_usage_fee: Option<MinimumUsageFee>,
    bill_credits: Vec<BillCredit>,
    other_fees: Vec<Fee>,
}

/// Unvalidated field set, the input to validation
#[derive(Debug, Clone, Default, Deserialize)]
struct RateStructureParts {
    #[serde(default)]
    base_charge_usd: Decimal,
    energy_rate_tiers: Vec<EnergyTier>,
    #[serde(default)]
    tdu_delivery: TduDelivery,
    #[serde(default)]
    minimum_usage_fee: Option<MinimumUsageFee>,
    #[serde(default)]
    bill_credits: Vec<BillCredit>,
    #[serde(default)]
    other_fees: Vec<Fee>,
}

impl TryFrom<RateStructureParts> for RateStructure {
    type Error = InvariantViolation;

    fn try_from(mut parts: RateStructureParts) -> Result<Self, Self::Error> {
        parts.bill_credits.sort_by(|a, b| {
            a.threshold_kwh_min
                .cmp(&b.threshold_kwh_min)
                .then(a.min_exclusive.cmp(&b.min_exclusive))
        });

        let structure = Self {
            base_charge_usd: parts.base_charge_usd,
            energy_rate_tiers: parts.energy_rate_tiers,
            tdu_delivery: parts.tdu_delivery,
            minimum_usage_fee: parts.minimum_usage_fee,
            bill_credits: parts.bill_credits,
            other_fees: parts.other_fees,
        };
        structure.validate()?;
        Ok(structure)
    }
}

impl RateStructure {
    /// Start building a rate structure
    pub fn builder() -> RateStructureBuilder {
        RateStructureBuilder::default()
    }

    pub fn base_charge_usd(&self) -> Decimal {
        self.base_charge_usd
    }

    pub fn energy_rate_tiers(&self) -> &[EnergyTier] {
        &self.energy_rate_tiers
    }

    pub fn tdu_delivery(&self) -> &TduDelivery {
        &self.tdu_delivery
    }

    pub fn minimum_usage_fee(&self) -> Option<&MinimumUsageFee> {
        self.minimum_usage_fee.as_ref()
    }

    /// Credit bands, ordered by lower threshold
    pub fn bill_credits(&self) -> &[BillCredit] {
        &self.bill_credits
    }

    pub fn other_fees(&self) -> &[Fee] {
        &self.other_fees
    }

    /// Sum of all flat fees
    pub fn other_fees_total(&self) -> Decimal {
        self.other_fees.iter().map(|fee| fee.amount_usd).sum()
    }

    /// The credit band containing `usage_kwh`, if any
    ///
    /// A band's maximum is inclusive when it is the last band, or when the
    /// next band starts exclusively at that same value.
    pub fn credit_for(&self, usage_kwh: Decimal) -> Option<&BillCredit> {
        let bands = &self.bill_credits;
        bands
            .iter()
            .enumerate()
            .find(|(index, band)| {
                let max_inclusive = bands.get(index + 1).map_or(true, |next| {
                    next.min_exclusive && band.threshold_kwh_max == Some(next.threshold_kwh_min)
                });
                band.contains(usage_kwh, max_inclusive)
            })
            .map(|(_, band)| band)
    }

    /// Check every data-model invariant
    fn validate(&self) -> Result<(), InvariantViolation> {
        amount(RateField::BaseCharge, self.base_charge_usd)?;
        amount(RateField::TduDelivery, self.tdu_delivery.fixed_usd)?;
        amount(RateField::TduDelivery, self.tdu_delivery.per_kwh_usd)?;

        if let Some(minimum) = &self.minimum_usage_fee {
            non_negative_threshold(RateField::MinimumUsageFee, minimum.threshold_kwh)?;
            amount(RateField::MinimumUsageFee, minimum.fee_usd)?;
        }

        for fee in &self.other_fees {
            amount(RateField::OtherFees, fee.amount_usd)?;
        }

        validate_tiers(&self.energy_rate_tiers)?;
        validate_credits(&self.bill_credits)
    }
}

/// Dollar amount or rate within `[0, MAX_AMOUNT_USD]`
fn amount(field: RateField, value: Decimal) -> Result<(), InvariantViolation> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(InvariantViolation::NegativeAmount { field, value });
    }
    if value > Decimal::from(MAX_AMOUNT_USD) {
        return Err(InvariantViolation::AmountTooLarge { field, value });
    }
    Ok(())
}

fn non_negative_threshold(field: RateField, value: Decimal) -> Result<(), InvariantViolation> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(InvariantViolation::NegativeThreshold { field, value });
    }
    Ok(())
}

fn validate_tiers(tiers: &[EnergyTier]) -> Result<(), InvariantViolation> {
    let Some(first) = tiers.first() else {
        return Err(InvariantViolation::NoEnergyTiers);
    };
    if !first.lower_bound_kwh.is_zero() {
        return Err(InvariantViolation::FirstTierNotAtZero {
            lower_bound_kwh: first.lower_bound_kwh,
        });
    }

    let last_index = tiers.len() - 1;
    let mut previous_upper: Option<Decimal> = None;

    for (index, tier) in tiers.iter().enumerate() {
        amount(RateField::EnergyRateTiers, tier.rate_usd_per_kwh)?;

        if let Some(previous_upper_kwh) = previous_upper {
            if tier.lower_bound_kwh < previous_upper_kwh {
                return Err(InvariantViolation::TierOverlap {
                    index,
                    previous_upper_kwh,
                    lower_bound_kwh: tier.lower_bound_kwh,
                });
            }
            if tier.lower_bound_kwh > previous_upper_kwh {
                return Err(InvariantViolation::TierGap {
                    index,
                    previous_upper_kwh,
                    lower_bound_kwh: tier.lower_bound_kwh,
                });
            }
        }

        match tier.upper_bound_kwh {
            Some(upper_bound_kwh) if upper_bound_kwh <= tier.lower_bound_kwh => {
                return Err(InvariantViolation::EmptyTier {
                    index,
                    lower_bound_kwh: tier.lower_bound_kwh,
                    upper_bound_kwh,
                });
            }
            Some(upper_bound_kwh) if index == last_index => {
                return Err(InvariantViolation::LastTierBounded { upper_bound_kwh });
            }
            Some(_) => {}
            None if index != last_index => {
                return Err(InvariantViolation::UnboundedTierNotLast { index });
            }
            None => {}
        }

        previous_upper = tier.upper_bound_kwh;
    }

    Ok(())
}

fn validate_credits(credits: &[BillCredit]) -> Result<(), InvariantViolation> {
    let mut previous: Option<&BillCredit> = None;

    for (index, band) in credits.iter().enumerate() {
        amount(RateField::BillCredits, band.credit_usd)?;
        non_negative_threshold(RateField::BillCredits, band.threshold_kwh_min)?;

        if let Some(max_kwh) = band.threshold_kwh_max {
            if max_kwh <= band.threshold_kwh_min {
                return Err(InvariantViolation::EmptyCreditBand {
                    index,
                    min_kwh: band.threshold_kwh_min,
                    max_kwh,
                });
            }
        }

        if let Some(prev) = previous {
            let overlaps = match prev.threshold_kwh_max {
                None => true,
                Some(prev_max) => prev_max > band.threshold_kwh_min,
            };
            if overlaps {
                return Err(InvariantViolation::CreditOverlap { index });
            }
        }

        previous = Some(band);
    }

    Ok(())
}

/// Builder for [`RateStructure`]
///
/// Optional components default to absent or zero. Credit bands may be added in
/// any order; tiers must be added in ascending order.
#[derive(Debug, Clone, Default)]
pub struct RateStructureBuilder {
    parts: RateStructureParts,
}

impl RateStructureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the monthly base charge
    pub fn with_base_charge(mut self, base_charge_usd: Decimal) -> Self {
        self.parts.base_charge_usd = base_charge_usd;
        self
    }

    /// Append an energy tier
    pub fn with_tier(mut self, tier: EnergyTier) -> Self {
        self.parts.energy_rate_tiers.push(tier);
        self
    }

    /// Replace all energy tiers
    pub fn with_tiers(mut self, tiers: Vec<EnergyTier>) -> Self {
        self.parts.energy_rate_tiers = tiers;
        self
    }

    /// Single tier covering all usage
    pub fn with_flat_rate(self, rate_usd_per_kwh: Decimal) -> Self {
        self.with_tiers(vec![EnergyTier::open(Decimal::ZERO, rate_usd_per_kwh)])
    }

    pub fn with_tdu(mut self, tdu: TduDelivery) -> Self {
        self.parts.tdu_delivery = tdu;
        self
    }

    pub fn with_minimum_usage_fee(mut self, fee: MinimumUsageFee) -> Self {
        self.parts.minimum_usage_fee = Some(fee);
        self
    }

    pub fn with_bill_credit(mut self, credit: BillCredit) -> Self {
        self.parts.bill_credits.push(credit);
        self
    }

    pub fn with_fee(mut self, fee: Fee) -> Self {
        self.parts.other_fees.push(fee);
        self
    }

    /// Validate and freeze
    pub fn build(self) -> Result<RateStructure, InvariantViolation> {
        RateStructure::try_from(self.parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn two_tier() -> RateStructureBuilder {
        RateStructure::builder()
            .with_base_charge(dec!(9.95))
            .with_tier(EnergyTier::bounded(dec!(0), dec!(1000), dec!(0.09)))
            .with_tier(EnergyTier::open(dec!(1000), dec!(0.07)))
    }

    #[test]
    fn test_valid_two_tier() {
        let rates = two_tier().build().unwrap();
        assert_eq!(rates.base_charge_usd(), dec!(9.95));
        assert_eq!(rates.energy_rate_tiers().len(), 2);
        assert!(rates.tdu_delivery().is_zero());
        assert!(rates.minimum_usage_fee().is_none());
    }

    #[test]
    fn test_no_tiers_rejected() {
        let err = RateStructure::builder()
            .with_base_charge(dec!(5))
            .build()
            .unwrap_err();
        assert_eq!(err, InvariantViolation::NoEnergyTiers);
        assert_eq!(err.field(), RateField::EnergyRateTiers);
    }

    #[test]
    fn test_first_tier_must_start_at_zero() {
        let err = RateStructure::builder()
            .with_tier(EnergyTier::open(dec!(1), dec!(0.1)))
            .build()
            .unwrap_err();
        assert!(matches!(err, InvariantViolation::FirstTierNotAtZero { .. }));
    }

    #[test]
    fn test_tier_gap_rejected() {
        let err = RateStructure::builder()
            .with_tier(EnergyTier::bounded(dec!(0), dec!(1000), dec!(0.09)))
            .with_tier(EnergyTier::open(dec!(1200), dec!(0.07)))
            .build()
            .unwrap_err();
        assert!(matches!(err, InvariantViolation::TierGap { index: 1, .. }));
    }

    #[test]
    fn test_tier_overlap_rejected() {
        let err = RateStructure::builder()
            .with_tier(EnergyTier::bounded(dec!(0), dec!(1000), dec!(0.09)))
            .with_tier(EnergyTier::open(dec!(800), dec!(0.07)))
            .build()
            .unwrap_err();
        assert!(matches!(err, InvariantViolation::TierOverlap { index: 1, .. }));
    }

    #[test]
    fn test_bounded_last_tier_rejected() {
        let err = RateStructure::builder()
            .with_tier(EnergyTier::bounded(dec!(0), dec!(1000), dec!(0.09)))
            .build()
            .unwrap_err();
        assert!(matches!(err, InvariantViolation::LastTierBounded { .. }));
    }

    #[test]
    fn test_open_tier_must_be_last() {
        let err = RateStructure::builder()
            .with_tier(EnergyTier::open(dec!(0), dec!(0.09)))
            .with_tier(EnergyTier::open(dec!(1000), dec!(0.07)))
            .build()
            .unwrap_err();
        assert_eq!(err, InvariantViolation::UnboundedTierNotLast { index: 0 });
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let err = two_tier().with_base_charge(dec!(-1)).build().unwrap_err();
        assert_eq!(err.field(), RateField::BaseCharge);

        let err = two_tier()
            .with_fee(Fee::new("regulatory", dec!(-0.5)))
            .build()
            .unwrap_err();
        assert_eq!(err.field(), RateField::OtherFees);
    }

    #[test]
    fn test_credit_overlap_rejected() {
        let err = two_tier()
            .with_bill_credit(BillCredit::bounded(dec!(0), dec!(600), dec!(10)))
            .with_bill_credit(BillCredit::bounded(dec!(500), dec!(1000), dec!(20)))
            .build()
            .unwrap_err();
        assert_eq!(err, InvariantViolation::CreditOverlap { index: 1 });
    }

    #[test]
    fn test_credits_sorted_and_looked_up() {
        let rates = two_tier()
            .with_bill_credit(BillCredit::bounded(dec!(500), dec!(1000), dec!(20)))
            .with_bill_credit(BillCredit::bounded(dec!(0), dec!(500), dec!(10)))
            .build()
            .unwrap();

        assert_eq!(rates.bill_credits()[0].credit_usd, dec!(10));
        assert_eq!(rates.credit_for(dec!(499.99)).unwrap().credit_usd, dec!(10));
        assert_eq!(rates.credit_for(dec!(500)).unwrap().credit_usd, dec!(20));
        assert_eq!(rates.credit_for(dec!(1000)).unwrap().credit_usd, dec!(20));
        assert!(rates.credit_for(dec!(1000.01)).is_none());
    }

    #[test]
    fn test_exclusive_minimum_keeps_boundary_in_previous_band() {
        let rates = two_tier()
            .with_bill_credit(BillCredit::above(dec!(2000), dec!(100)))
            .with_bill_credit(BillCredit::bounded(dec!(1000), dec!(2000), dec!(50)))
            .build()
            .unwrap();

        assert_eq!(rates.credit_for(dec!(1999.99)).unwrap().credit_usd, dec!(50));
        assert_eq!(rates.credit_for(dec!(2000)).unwrap().credit_usd, dec!(50));
        assert_eq!(rates.credit_for(dec!(2000.5)).unwrap().credit_usd, dec!(100));
        assert!(rates.credit_for(dec!(999)).is_none());
    }

    #[test]
    fn test_amounts_bounded() {
        let err = two_tier()
            .with_base_charge(Decimal::MAX)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            InvariantViolation::AmountTooLarge {
                field: RateField::BaseCharge,
                ..
            }
        ));

        let err = RateStructure::builder()
            .with_flat_rate(dec!(1000000000.01))
            .build()
            .unwrap_err();
        assert_eq!(err.field(), RateField::EnergyRateTiers);

        assert!(two_tier()
            .with_fee(Fee::new("regulatory", Decimal::from(MAX_AMOUNT_USD)))
            .build()
            .is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{
            "base_charge_usd": "4.95",
            "energy_rate_tiers": [
                {"lower_bound_kwh": "0", "upper_bound_kwh": "500", "rate_usd_per_kwh": "0.1"}
            ]
        }"#;
        let result: Result<RateStructure, _> = serde_json::from_str(json);
        assert!(result.is_err());

        let json = r#"{
            "base_charge_usd": "4.95",
            "energy_rate_tiers": [
                {"lower_bound_kwh": "0", "upper_bound_kwh": null, "rate_usd_per_kwh": "0.1"}
            ]
        }"#;
        let rates: RateStructure = serde_json::from_str(json).unwrap();
        assert_eq!(rates.base_charge_usd(), dec!(4.95));
    }

    #[test]
    fn test_tier_label() {
        assert_eq!(EnergyTier::bounded(dec!(0), dec!(1000), dec!(0.09)).label(), "0-1000");
        assert_eq!(EnergyTier::open(dec!(1000.0), dec!(0.07)).label(), "1000+");
    }
}
