//! # EFL Billing
//!
//! Prices a [`RateStructure`] at a monthly usage level.
//!
//! ## Bill Formula
//!
//! ```text
//! Total = Base + Energy + TDU + Fees - Credit
//! ```
//!
//! Where:
//! - Base: fixed monthly base charge
//! - Energy: sum over tiers of (kWh consumed in tier × tier rate)
//! - TDU: fixed delivery charge + per-kWh delivery rate × usage
//! - Fees: minimum-usage fee (below its threshold) + flat fees
//! - Credit: the bill credit whose usage band contains the usage
//!
//! Sums are exact; each reported amount is rounded to the cent once.

pub mod config;
pub mod pricing;

pub use config::BillingConfig;
pub use efl_common::{CalculationError, CostBreakdown, RateStructure};
pub use pricing::{summarize, CostCache, CostCalculator};
