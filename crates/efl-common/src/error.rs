//! Error types for EFL extraction and billing
//!
//! Provides a unified error type plus the typed extraction failure and the
//! data-model invariant violations it wraps.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using EflError
pub type Result<T> = std::result::Result<T, EflError>;

/// Unified error type for EFL operations
#[derive(Debug, Error)]
pub enum EflError {
    // Extraction errors
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionFailure),

    // Calculation errors
    #[error("Calculation error: {0}")]
    Calculation(#[from] CalculationError),

    // Model invariant errors
    #[error("Invalid rate structure: {0}")]
    Invariant(#[from] InvariantViolation),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Rate structure field an extraction rule targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateField {
    #[serde(rename = "base_charge_usd")]
    BaseCharge,
    EnergyRateTiers,
    TduDelivery,
    MinimumUsageFee,
    BillCredits,
    OtherFees,
}

impl RateField {
    /// Field name as it appears in the serialized rate structure
    pub fn as_str(&self) -> &'static str {
        match self {
            RateField::BaseCharge => "base_charge_usd",
            RateField::EnergyRateTiers => "energy_rate_tiers",
            RateField::TduDelivery => "tdu_delivery",
            RateField::MinimumUsageFee => "minimum_usage_fee",
            RateField::BillCredits => "bill_credits",
            RateField::OtherFees => "other_fees",
        }
    }

    /// Whether a document must provide this field
    pub fn is_required(&self) -> bool {
        matches!(self, RateField::BaseCharge | RateField::EnergyRateTiers)
    }
}

impl fmt::Display for RateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why extraction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// A required field has no matching rule
    MissingField,
    /// The winning rule matched conflicting values in different places
    AmbiguousMatch,
    /// A matched span is not a valid number
    UnparseableNumber,
    /// A structurally complete result fails a model invariant
    InvariantViolation,
}

/// What a caller should do with a plan whose extraction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// The document is incomplete; drop the plan from results
    ExcludePlan,
    /// The document or the rule table has an anomaly worth looking at
    Investigate,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::MissingField => "missing_field",
            FailureReason::AmbiguousMatch => "ambiguous_match",
            FailureReason::UnparseableNumber => "unparseable_number",
            FailureReason::InvariantViolation => "invariant_violation",
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            FailureReason::MissingField => Disposition::ExcludePlan,
            FailureReason::AmbiguousMatch
            | FailureReason::UnparseableNumber
            | FailureReason::InvariantViolation => Disposition::Investigate,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed extraction failure
///
/// Carries the field that could not be produced, the text window that was
/// examined, and a reason drawn from [`FailureReason`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{reason} for {field}: {detail}")]
pub struct ExtractionFailure {
    /// Field that could not be produced
    pub field: RateField,
    /// Failure classification
    pub reason: FailureReason,
    /// Normalized text examined when the failure was detected
    pub window: String,
    /// Human-readable explanation
    pub detail: String,
}

impl ExtractionFailure {
    pub fn missing(field: RateField, window: impl Into<String>) -> Self {
        Self {
            field,
            reason: FailureReason::MissingField,
            window: window.into(),
            detail: format!("no rule matched {}", field),
        }
    }

    pub fn ambiguous(field: RateField, window: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            field,
            reason: FailureReason::AmbiguousMatch,
            window: window.into(),
            detail: detail.into(),
        }
    }

    pub fn unparseable(field: RateField, window: impl Into<String>, token: &str) -> Self {
        Self {
            field,
            reason: FailureReason::UnparseableNumber,
            window: window.into(),
            detail: format!("'{}' is not a valid number", token),
        }
    }

    pub fn invariant(violation: InvariantViolation, window: impl Into<String>) -> Self {
        Self {
            field: violation.field(),
            reason: FailureReason::InvariantViolation,
            window: window.into(),
            detail: violation.to_string(),
        }
    }

    /// Shortcut for `self.reason.disposition()`
    pub fn disposition(&self) -> Disposition {
        self.reason.disposition()
    }
}

/// Calculation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    #[error("Invalid argument: usage must be between 0 and {max_kwh} kWh, got {usage_kwh} kWh", max_kwh = crate::MAX_USAGE_KWH)]
    InvalidArgument { usage_kwh: Decimal },
}

/// Rate structure invariant violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("{field} has negative amount {value}")]
    NegativeAmount { field: RateField, value: Decimal },

    #[error("{field} amount {value} exceeds {max}", max = crate::MAX_AMOUNT_USD)]
    AmountTooLarge { field: RateField, value: Decimal },

    #[error("{field} has negative usage threshold {value} kWh")]
    NegativeThreshold { field: RateField, value: Decimal },

    #[error("at least one energy tier is required")]
    NoEnergyTiers,

    #[error("first energy tier starts at {lower_bound_kwh} kWh instead of 0")]
    FirstTierNotAtZero { lower_bound_kwh: Decimal },

    #[error("energy tier {index} is empty: {lower_bound_kwh} to {upper_bound_kwh} kWh")]
    EmptyTier {
        index: usize,
        lower_bound_kwh: Decimal,
        upper_bound_kwh: Decimal,
    },

    #[error("gap before energy tier {index}: previous tier ends at {previous_upper_kwh} kWh, tier starts at {lower_bound_kwh} kWh")]
    TierGap {
        index: usize,
        previous_upper_kwh: Decimal,
        lower_bound_kwh: Decimal,
    },

    #[error("energy tier {index} overlaps previous tier: previous ends at {previous_upper_kwh} kWh, tier starts at {lower_bound_kwh} kWh")]
    TierOverlap {
        index: usize,
        previous_upper_kwh: Decimal,
        lower_bound_kwh: Decimal,
    },

    #[error("open-ended energy tier {index} is not the last tier")]
    UnboundedTierNotLast { index: usize },

    #[error("last energy tier ends at {upper_bound_kwh} kWh; usage above it would be unpriced")]
    LastTierBounded { upper_bound_kwh: Decimal },

    #[error("bill credit band {index} is empty: {min_kwh} to {max_kwh} kWh")]
    EmptyCreditBand {
        index: usize,
        min_kwh: Decimal,
        max_kwh: Decimal,
    },

    #[error("bill credit band {index} overlaps the band before it")]
    CreditOverlap { index: usize },
}

impl InvariantViolation {
    /// Field the violation belongs to
    pub fn field(&self) -> RateField {
        match self {
            InvariantViolation::NegativeAmount { field, .. }
            | InvariantViolation::AmountTooLarge { field, .. }
            | InvariantViolation::NegativeThreshold { field, .. } => *field,
            InvariantViolation::NoEnergyTiers
            | InvariantViolation::FirstTierNotAtZero { .. }
            | InvariantViolation::EmptyTier { .. }
            | InvariantViolation::TierGap { .. }
            | InvariantViolation::TierOverlap { .. }
            | InvariantViolation::UnboundedTierNotLast { .. }
            | InvariantViolation::LastTierBounded { .. } => RateField::EnergyRateTiers,
            InvariantViolation::EmptyCreditBand { .. } | InvariantViolation::CreditOverlap { .. } => {
                RateField::BillCredits
            }
        }
    }
}

// Implement From for common external error types
impl From<serde_json::Error> for EflError {
    fn from(err: serde_json::Error) -> Self {
        EflError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_failure_display() {
        let err = ExtractionFailure::missing(RateField::EnergyRateTiers, "base charge: $9.95");
        assert_eq!(err.reason, FailureReason::MissingField);
        assert!(err.to_string().starts_with("missing_field for energy_rate_tiers"));
    }

    #[test]
    fn test_disposition() {
        assert_eq!(
            FailureReason::MissingField.disposition(),
            Disposition::ExcludePlan
        );
        assert_eq!(
            FailureReason::UnparseableNumber.disposition(),
            Disposition::Investigate
        );
        assert_eq!(
            FailureReason::InvariantViolation.disposition(),
            Disposition::Investigate
        );
    }

    #[test]
    fn test_invariant_maps_to_field() {
        let violation = InvariantViolation::CreditOverlap { index: 1 };
        let failure = ExtractionFailure::invariant(violation, "");
        assert_eq!(failure.field, RateField::BillCredits);
        assert_eq!(failure.reason, FailureReason::InvariantViolation);
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let json = serde_json::to_string(&FailureReason::UnparseableNumber).unwrap();
        assert_eq!(json, "\"unparseable_number\"");
        let json = serde_json::to_string(&RateField::BaseCharge).unwrap();
        assert_eq!(json, "\"base_charge_usd\"");
    }

    #[test]
    fn test_calculation_error_display() {
        let err = CalculationError::InvalidArgument {
            usage_kwh: dec!(-5),
        };
        assert!(err.to_string().contains("-5"));
    }

    #[test]
    fn test_amount_too_large_maps_to_field() {
        let violation = InvariantViolation::AmountTooLarge {
            field: RateField::BaseCharge,
            value: Decimal::MAX,
        };
        assert_eq!(violation.field(), RateField::BaseCharge);
        assert!(violation.to_string().contains("exceeds 1000000000"));
    }
}
