//! Non-pricing plan facts
//!
//! Nothing here can fail: a fact that is not found is left absent.

use std::sync::LazyLock;

use efl_common::{PlanDisclosures, PlanType};
use regex::Regex;

use crate::number::{parse_decimal, NUMBER};

static RENEWABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<pct>\d{1,3})%\s*renewable").expect("valid renewable pattern")
});

static TERMINATION_FEE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:early termination|cancellation)(?: fee)?[^$\d]{{0,60}}?\$(?P<num>{})",
        NUMBER
    ))
    .expect("valid termination fee pattern")
});

static CONTRACT_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:contract )?term[^\d]{0,30}?(?P<months>\d{1,3})\s*months?\b")
        .expect("valid contract term pattern")
});

const TIME_OF_USE_KEYWORDS: &[&str] = &["time of use", "time-of-use", "peak hours", "off-peak"];

/// Scan normalized text for plan disclosures
pub fn scan(text: &str) -> PlanDisclosures {
    let has_time_of_use = TIME_OF_USE_KEYWORDS.iter().any(|k| text.contains(k));

    let plan_type = if has_time_of_use {
        PlanType::TimeOfUse
    } else if text.contains("variable") && text.contains("price") {
        PlanType::Variable
    } else {
        PlanType::Fixed
    };

    let renewable_percentage = RENEWABLE
        .captures(text)
        .and_then(|caps| caps["pct"].parse::<u8>().ok())
        .filter(|pct| *pct <= 100);

    let early_termination_fee_usd = TERMINATION_FEE
        .captures(text)
        .and_then(|caps| parse_decimal(&caps["num"]).ok());

    let contract_term_months = CONTRACT_TERM
        .captures(text)
        .and_then(|caps| caps["months"].parse::<u32>().ok())
        .filter(|months| *months > 0);

    PlanDisclosures {
        plan_type,
        has_time_of_use,
        renewable_percentage,
        early_termination_fee_usd,
        contract_term_months,
    }
}
