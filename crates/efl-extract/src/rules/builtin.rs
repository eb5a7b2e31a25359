//! Built-in rule table
//!
//! Rows are in precedence order within each target. Patterns are written
//! against normalized text; `#NUM#` and `#KWH#` expand to the number
//! fragments in [`crate::number`].

use std::sync::LazyLock;

use super::{Converter, Rule, Target};
use crate::number::{KWH, NUMBER};

/// Rate value in dollars, cents, or bare, with or without `/kwh`
const PER_KWH: &str = r"(?P<dollar>\$)?(?P<num>#NUM#)(?:(?P<cent>¢)(?:/kwh)?|/kwh)";

/// Prefix shared by TDU rules: the label, then anything short of a number
const TDU: &str = r"\b(?:tdu|tdsp)\b[^$\d]{0,60}?";

/// Prefix shared by bill credit rules: label, credit amount, then the usage phrase
const CREDIT: &str = r"\bbill credits?[^$\d]{0,40}?\$(?P<num>#NUM#)[^$\d]{0,80}?";

/// Same, with the amount ahead of the label ("a $100 bill credit applies ...")
const AMOUNT_CREDIT: &str = r"\$(?P<num>#NUM#)\s*bill credits?\b[^$\d]{0,80}?";

const MINIMUM: &str = r"\bminimum usage (?:fee|charge)";

const BELOW: &str = r"(?:less than|below|under|<)\s*(?P<kwh>#KWH#)\s*kwh";

#[rustfmt::skip]
const TABLE: &[(&str, Target, &str, Converter)] = &[
    // Energy tiers
    ("tier_range", Target::EnergyTier,
        r"\b(?P<lo>#KWH#)\s*(?:(?:-|to)\s*(?P<hi>#KWH#)\s*kwh|\+\s*kwh|kwh\s*(?:\+|or more|and above|and over|and up))\s*\)?\s*(?:@|at|:|=)?\s*#PER_KWH#",
        Converter::Band),
    ("tier_above", Target::EnergyTier,
        r"(?:\b(?:above|over|greater than|more than)|>=?)\s*(?P<lo>#KWH#)\s*kwh\s*\)?\s*(?:@|at|:|=)?\s*#PER_KWH#",
        Converter::Band),
    ("energy_charge_flat", Target::FlatEnergyRate,
        r"\benergy (?:charge|rate)[:\s]*(?:of\s*)?#PER_KWH#",
        Converter::Amount),

    // Base charge
    ("base_charge", Target::BaseCharge,
        r"\bbase (?:charge|fee)(?:/month)?[:\s]*(?:of\s*)?\$?(?P<num>#NUM#)(?P<cent>¢)?",
        Converter::Amount),
    ("monthly_charge", Target::BaseCharge,
        r"\bmonthly (?:base |service )?(?:charge|fee)[:\s]*(?:of\s*)?\$?(?P<num>#NUM#)(?P<cent>¢)?",
        Converter::Amount),
    ("customer_charge", Target::BaseCharge,
        r"\bcustomer charge(?:/month)?[:\s]*(?:of\s*)?\$?(?P<num>#NUM#)(?P<cent>¢)?",
        Converter::Amount),
    ("no_base_charge", Target::BaseCharge,
        r"\bno (?:monthly )?base charge\b",
        Converter::Zero),

    // TDU delivery
    ("tdu_fixed_combined", Target::TduFixed,
        r"#TDU#\$(?P<num>#NUM#)(?:/month)?\s*(?:\+|and|plus)\s*\$?#NUM#¢?/kwh",
        Converter::Amount),
    ("tdu_fixed", Target::TduFixed,
        r"#TDU#\$(?P<num>#NUM#)/month",
        Converter::Amount),
    ("delivery_fixed", Target::TduFixed,
        r"\bdelivery charges?[:\s]*\$(?P<num>#NUM#)/month",
        Converter::Amount),
    ("tdu_per_kwh_combined", Target::TduPerKwh,
        r"#TDU#\$#NUM#(?:/month)?\s*(?:\+|and|plus)\s*(?P<dollar>\$)?(?P<num>#NUM#)(?P<cent>¢)?/kwh",
        Converter::Amount),
    ("tdu_per_kwh", Target::TduPerKwh,
        r"#TDU#(?P<dollar>\$)?(?P<num>#NUM#)(?P<cent>¢)?/kwh",
        Converter::Amount),
    ("delivery_per_kwh", Target::TduPerKwh,
        r"\bdelivery charges?[:\s]*(?P<dollar>\$)?(?P<num>#NUM#)(?P<cent>¢)?/kwh",
        Converter::Amount),

    // Minimum usage fee
    ("minimum_fee_then_threshold", Target::MinimumUsageFee,
        r"#MINIMUM#[^$\d]{0,30}?\$(?P<num>#NUM#)[^$\d]{0,80}?#BELOW#",
        Converter::MinimumFee),
    ("minimum_threshold_then_fee", Target::MinimumUsageFee,
        r"#MINIMUM#[^$\d]{0,30}?#BELOW#[^$\d]{0,40}?\$(?P<num>#NUM#)",
        Converter::MinimumFee),
    ("amount_minimum_fee", Target::MinimumUsageFee,
        r"\$(?P<num>#NUM#) minimum usage (?:fee|charge)[^$\d]{0,80}?#BELOW#",
        Converter::MinimumFee),

    // Bill credits
    ("credit_range", Target::BillCredit,
        r"#CREDIT#(?:between\s*)?(?P<lo>#KWH#)\s*(?:kwh\s*)?(?:-|to|and)\s*(?P<hi>#KWH#)\s*kwh",
        Converter::Band),
    ("credit_at_least", Target::BillCredit,
        r"#CREDIT#(?:greater than or equal to|at least|>=)\s*(?P<lo>#KWH#)\s*kwh",
        Converter::Band),
    ("credit_or_more", Target::BillCredit,
        r"#CREDIT#(?P<lo>#KWH#)\s*(?:\+\s*kwh|kwh\s*(?:\+|or more|and above|or greater))",
        Converter::Band),
    ("credit_more_than", Target::BillCredit,
        r"#CREDIT#(?P<strict>more than|greater than|over|above|exceeds?|>)\s*(?P<lo>#KWH#)\s*kwh",
        Converter::Band),
    ("range_then_credit", Target::BillCredit,
        r"\b(?P<lo>#KWH#)\s*(?:-|to)\s*(?P<hi>#KWH#)\s*kwh[^$\d]{0,20}?bill credits?[:\s]*(?:of\s*)?\$(?P<num>#NUM#)",
        Converter::Band),
    ("amount_credit_range", Target::BillCredit,
        r"#AMOUNT_CREDIT#(?:between\s*)?(?P<lo>#KWH#)\s*(?:kwh\s*)?(?:-|to|and)\s*(?P<hi>#KWH#)\s*kwh",
        Converter::Band),
    ("amount_credit_at_least", Target::BillCredit,
        r"#AMOUNT_CREDIT#(?:greater than or equal to|at least|>=)\s*(?P<lo>#KWH#)\s*kwh",
        Converter::Band),
    ("amount_credit_or_more", Target::BillCredit,
        r"#AMOUNT_CREDIT#(?P<lo>#KWH#)\s*(?:\+\s*kwh|kwh\s*(?:\+|or more|and above|or greater))",
        Converter::Band),
    ("amount_credit_more_than", Target::BillCredit,
        r"#AMOUNT_CREDIT#(?P<strict>more than|greater than|over|above|exceeds?|>)\s*(?P<lo>#KWH#)\s*kwh",
        Converter::Band),

    // Other fees
    ("regulatory_fee", Target::OtherFee,
        r"\b(?P<label>(?:puct|ercot|regulatory|gross receipts|municipal|city|state)(?: [a-z]+){0,2}? (?:assessment|fee|surcharge|tax|charge))[:\s]*\$(?P<num>#NUM#)(?:/month)?(?:[^/\d.,¢]|$)",
        Converter::Fee),
    ("program_fee", Target::OtherFee,
        r"\b(?P<label>[a-z]+ (?:program|convenience|recurring|maintenance|membership) fee)[:\s]*\$(?P<num>#NUM#)/month",
        Converter::Fee),
];

/// Expand the shared fragments in a table pattern
fn expand(pattern: &str) -> String {
    pattern
        .replace("#PER_KWH#", PER_KWH)
        .replace("#TDU#", TDU)
        .replace("#CREDIT#", CREDIT)
        .replace("#AMOUNT_CREDIT#", AMOUNT_CREDIT)
        .replace("#MINIMUM#", MINIMUM)
        .replace("#BELOW#", BELOW)
        .replace("#NUM#", NUMBER)
        .replace("#KWH#", KWH)
}

/// Compiled built-in rules, in precedence order
pub static BUILTIN_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    TABLE
        .iter()
        .map(|(name, target, pattern, converter)| {
            Rule::new(*name, *target, &expand(pattern), *converter).expect("valid built-in rule")
        })
        .collect()
});
