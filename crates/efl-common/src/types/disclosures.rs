//! Plan disclosures - non-pricing facts printed on an EFL

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pricing model of a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    #[default]
    Fixed,
    Variable,
    TimeOfUse,
}

impl PlanType {
    /// Title-cased name, e.g. `Time Of Use`
    pub fn title(&self) -> &'static str {
        match self {
            PlanType::Fixed => "Fixed",
            PlanType::Variable => "Variable",
            PlanType::TimeOfUse => "Time Of Use",
        }
    }
}

/// Best-effort facts found alongside the rate table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDisclosures {
    pub plan_type: PlanType,
    pub has_time_of_use: bool,
    /// 0-100
    pub renewable_percentage: Option<u8>,
    pub early_termination_fee_usd: Option<Decimal>,
    pub contract_term_months: Option<u32>,
}
