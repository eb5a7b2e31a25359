//! # EFL Common
//!
//! Shared types and errors for turning Electricity Facts Labels into a
//! normalized rate model and pricing that model at fixed usage levels.
//!
//! ## Core Types
//!
//! - [`RateStructure`]: validated, immutable rate model produced by extraction
//! - [`EnergyTier`]: a usage band priced at one per-kWh rate
//! - [`TduDelivery`]: fixed and per-kWh delivery charges
//! - [`MinimumUsageFee`]/[`BillCredit`]: usage-conditional fee and credits
//! - [`CostBreakdown`]: itemized monthly bill at one usage level
//!
//! ## Errors
//!
//! - [`ExtractionFailure`]: typed extraction failure with a [`FailureReason`]
//! - [`CalculationError`]: the single calculation error (usage out of range)
//! - [`InvariantViolation`]: a data-model invariant breach

pub mod error;
pub mod money;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{
    CalculationError, Disposition, EflError, ExtractionFailure, FailureReason, InvariantViolation,
    RateField, Result,
};
pub use types::{
    breakdown::{CostBreakdown, TierSlice},
    disclosures::{PlanDisclosures, PlanType},
    rate_structure::{
        BillCredit, EnergyTier, Fee, MinimumUsageFee, RateStructure, RateStructureBuilder,
        TduDelivery,
    },
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Usage levels (kWh/month) an EFL is conventionally priced at
pub const STANDARD_USAGE_LEVELS_KWH: [u32; 3] = [500, 1000, 2000];

/// Decimal places for reported dollar amounts
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Decimal places for reported per-kWh averages
pub const RATE_DECIMAL_PLACES: u32 = 4;

/// Largest dollar amount or per-kWh rate a rate structure may carry
pub const MAX_AMOUNT_USD: u64 = 1_000_000_000;

/// Largest usage (kWh/month) a bill may be calculated for
///
/// Together with [`MAX_AMOUNT_USD`] this keeps every bill well inside
/// `Decimal`'s range.
pub const MAX_USAGE_KWH: u64 = 1_000_000_000_000;
