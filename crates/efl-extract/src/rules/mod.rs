//! Extraction rule table
//!
//! A rule is a `(target, pattern, converter)` row. Rules are evaluated in table
//! order against normalized text; supporting a new provider phrasing means
//! appending a row, not adding a branch.
//!
//! Converters read fixed capture-group names:
//!
//! | Converter    | Required groups   | Optional groups          |
//! |--------------|-------------------|--------------------------|
//! | `Amount`     | `num`             | `cent`, `dollar`                 |
//! | `Zero`       |                   |                                  |
//! | `Band`       | `lo`, `num`       | `hi`, `cent`, `dollar`, `strict` |
//! | `MinimumFee` | `num`, `kwh`      | `cent`                           |
//! | `Fee`        | `label`, `num`    | `cent`                           |
//!
//! A matched `cent` group divides the amount by 100. For per-kWh targets a
//! rate with neither `cent` nor `dollar` matched is bare, and a bare rate
//! above 1 is read as cents. A matched `strict` group ("more than N kWh")
//! makes the band's lower bound exclusive.

mod builtin;

pub use builtin::BUILTIN_RULES;

use efl_common::{EflError, Fee, MinimumUsageFee, RateField, Result};
use regex::{Captures, Regex};
use rust_decimal::Decimal;

use crate::number::{parse_amount, parse_decimal, parse_rate, NumberError, RateUnit};

/// What a rule produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    BaseCharge,
    /// One usage band of a tiered energy rate
    EnergyTier,
    /// Single rate for all usage; consulted only when no tier band matched
    FlatEnergyRate,
    TduFixed,
    TduPerKwh,
    MinimumUsageFee,
    /// One usage band of a bill credit schedule
    BillCredit,
    OtherFee,
}

impl Target {
    /// Targets whose amount is a per-kWh rate
    pub fn is_per_kwh(&self) -> bool {
        matches!(
            self,
            Target::EnergyTier | Target::FlatEnergyRate | Target::TduPerKwh
        )
    }

    /// Rate structure field this target populates
    pub fn field(&self) -> RateField {
        match self {
            Target::BaseCharge => RateField::BaseCharge,
            Target::EnergyTier | Target::FlatEnergyRate => RateField::EnergyRateTiers,
            Target::TduFixed | Target::TduPerKwh => RateField::TduDelivery,
            Target::MinimumUsageFee => RateField::MinimumUsageFee,
            Target::BillCredit => RateField::BillCredits,
            Target::OtherFee => RateField::OtherFees,
        }
    }
}

/// How captures become a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Converter {
    /// Dollar (or cent) amount
    Amount,
    /// Explicit statement of no charge
    Zero,
    /// Usage band with a per-kWh rate or a credit
    Band,
    /// Fee below a usage threshold
    MinimumFee,
    /// Labeled flat fee
    Fee,
}

impl Converter {
    fn required_groups(&self) -> &'static [&'static str] {
        match self {
            Converter::Amount => &["num"],
            Converter::Zero => &[],
            Converter::Band => &["lo", "num"],
            Converter::MinimumFee => &["num", "kwh"],
            Converter::Fee => &["label", "num"],
        }
    }

    fn accepts(&self, target: Target) -> bool {
        match target {
            Target::BaseCharge | Target::TduFixed | Target::TduPerKwh => {
                matches!(self, Converter::Amount | Converter::Zero)
            }
            Target::FlatEnergyRate => matches!(self, Converter::Amount),
            Target::EnergyTier | Target::BillCredit => matches!(self, Converter::Band),
            Target::MinimumUsageFee => matches!(self, Converter::MinimumFee),
            Target::OtherFee => matches!(self, Converter::Fee),
        }
    }

    /// Turn one match for `target` into a value
    pub fn convert(
        &self,
        target: Target,
        caps: &Captures<'_>,
    ) -> std::result::Result<Extracted, NumberError> {
        match self {
            Converter::Amount => Ok(Extracted::Amount(amount(target, caps)?)),
            Converter::Zero => Ok(Extracted::Amount(Decimal::ZERO)),
            Converter::Band => {
                let upper = caps
                    .name("hi")
                    .map(|m| parse_decimal(m.as_str()))
                    .transpose()?;
                Ok(Extracted::Band(Band {
                    lower: parse_decimal(group(caps, "lo"))?,
                    lower_exclusive: caps.name("strict").is_some(),
                    upper,
                    value: amount(target, caps)?,
                }))
            }
            Converter::MinimumFee => Ok(Extracted::MinimumFee(MinimumUsageFee::new(
                parse_decimal(group(caps, "kwh"))?,
                amount(target, caps)?,
            ))),
            Converter::Fee => Ok(Extracted::Fee(Fee::new(
                group(caps, "label").trim(),
                amount(target, caps)?,
            ))),
        }
    }
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map_or("", |m| m.as_str())
}

fn amount(target: Target, caps: &Captures<'_>) -> std::result::Result<Decimal, NumberError> {
    let token = group(caps, "num");
    if !target.is_per_kwh() {
        return parse_amount(token, caps.name("cent").is_some());
    }

    let unit = if caps.name("cent").is_some() {
        RateUnit::Cents
    } else if caps.name("dollar").is_some() {
        RateUnit::Dollars
    } else {
        RateUnit::Bare
    };
    parse_rate(token, unit)
}

/// A usage band before it becomes a tier or credit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    pub lower: Decimal,
    /// Stated as "more than" the lower bound
    pub lower_exclusive: bool,
    pub upper: Option<Decimal>,
    /// Per-kWh rate for tiers, dollars for credits
    pub value: Decimal,
}

/// Value produced by a converter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Amount(Decimal),
    Band(Band),
    MinimumFee(MinimumUsageFee),
    Fee(Fee),
}

impl Extracted {
    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            Extracted::Amount(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_band(&self) -> Option<&Band> {
        match self {
            Extracted::Band(band) => Some(band),
            _ => None,
        }
    }

    pub fn as_minimum_fee(&self) -> Option<MinimumUsageFee> {
        match self {
            Extracted::MinimumFee(fee) => Some(fee.clone()),
            _ => None,
        }
    }

    pub fn as_fee(&self) -> Option<&Fee> {
        match self {
            Extracted::Fee(fee) => Some(fee),
            _ => None,
        }
    }
}

/// One row of the rule table
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    target: Target,
    pattern: Regex,
    converter: Converter,
}

impl Rule {
    /// Compile and check a rule
    ///
    /// The pattern runs against normalized text (lower case, `/kwh`, `¢`,
    /// `/month`) and must define the capture groups its converter reads.
    pub fn new(
        name: impl Into<String>,
        target: Target,
        pattern: &str,
        converter: Converter,
    ) -> Result<Self> {
        let name = name.into();

        if !converter.accepts(target) {
            return Err(EflError::Config(format!(
                "rule '{}': converter {:?} cannot produce {:?}",
                name, converter, target
            )));
        }

        let pattern = Regex::new(pattern)
            .map_err(|e| EflError::Config(format!("rule '{}': invalid pattern: {}", name, e)))?;

        for required in converter.required_groups() {
            if !pattern.capture_names().flatten().any(|n| n == *required) {
                return Err(EflError::Config(format!(
                    "rule '{}': pattern lacks capture group '{}'",
                    name, required
                )));
            }
        }

        Ok(Self {
            name,
            target,
            pattern,
            converter,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn converter(&self) -> Converter {
        self.converter
    }

    /// Convert one match of this rule's pattern
    pub fn convert(&self, caps: &Captures<'_>) -> std::result::Result<Extracted, NumberError> {
        self.converter.convert(self.target, caps)
    }
}
