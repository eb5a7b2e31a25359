//! RateExtractor - rule-driven extraction of a rate structure
//!
//! Evaluation order is fixed: energy tiers, base charge, TDU fixed, TDU per
//! kWh, minimum usage fee, bill credits, other fees. The first failure stops
//! extraction.

use std::ops::Range;

use efl_common::{
    BillCredit, EnergyTier, ExtractionFailure, Fee, InvariantViolation, PlanDisclosures, RateField,
    RateStructure, TduDelivery,
};
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::disclosures;
use crate::normalize::normalize;
use crate::rules::{Band, Extracted, Rule, Target, BUILTIN_RULES};

/// Extractor tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Characters of context kept on either side of a match in failure windows
    pub window_context_chars: usize,
    /// Cap on the window attached to failures that have no match to point at
    pub max_window_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            window_context_chars: 40,
            max_window_chars: 240,
        }
    }
}

/// Turns EFL text into a validated [`RateStructure`]
///
/// Holds only the rule table and configuration; every call is independent,
/// so one extractor can be shared across threads.
#[derive(Debug, Clone)]
pub struct RateExtractor {
    rules: Vec<Rule>,
    config: ExtractorConfig,
}

impl Default for RateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RateExtractor {
    /// Extractor with the built-in rule table
    pub fn new() -> Self {
        Self {
            rules: BUILTIN_RULES.clone(),
            config: ExtractorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a rule after every existing rule
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract a rate structure from document text
    #[instrument(skip(self, document_text), fields(text_len = document_text.len()))]
    pub fn extract(&self, document_text: &str) -> Result<RateStructure, ExtractionFailure> {
        let text = normalize(document_text);
        let result = Scan::new(&text, &self.rules, &self.config).run();

        match &result {
            Ok(rates) => debug!(
                tiers = rates.energy_rate_tiers().len(),
                credits = rates.bill_credits().len(),
                fees = rates.other_fees().len(),
                "Extracted rate structure"
            ),
            Err(failure) => debug!(
                field = %failure.field,
                reason = %failure.reason,
                detail = %failure.detail,
                "Extraction failed"
            ),
        }

        result
    }

    /// Best-effort scan for plan type, renewable share, and contract terms
    pub fn disclosures(&self, document_text: &str) -> PlanDisclosures {
        disclosures::scan(&normalize(document_text))
    }
}

/// One converted match
struct Hit {
    rule: usize,
    span: Range<usize>,
    value: Extracted,
}

/// State of one extraction over normalized text
struct Scan<'a> {
    text: &'a str,
    rules: &'a [Rule],
    config: &'a ExtractorConfig,
    /// Text spans each populated field was read from
    spans: Vec<(RateField, Range<usize>)>,
}

impl<'a> Scan<'a> {
    fn new(text: &'a str, rules: &'a [Rule], config: &'a ExtractorConfig) -> Self {
        Self {
            text,
            rules,
            config,
            spans: Vec::new(),
        }
    }

    fn run(mut self) -> Result<RateStructure, ExtractionFailure> {
        let tiers = self.energy_tiers()?;

        let base_charge = self
            .scalar(Target::BaseCharge)?
            .and_then(|hit| hit.value.as_amount())
            .ok_or_else(|| ExtractionFailure::missing(RateField::BaseCharge, self.whole_window()))?;

        let tdu_fixed = self.amount_or_zero(Target::TduFixed)?;
        let tdu_per_kwh = self.amount_or_zero(Target::TduPerKwh)?;

        let minimum_usage_fee = self
            .scalar(Target::MinimumUsageFee)?
            .and_then(|hit| hit.value.as_minimum_fee());

        let credits = self.bill_credits()?;
        let fees = self.other_fees()?;

        let mut builder = RateStructure::builder()
            .with_base_charge(base_charge)
            .with_tiers(tiers)
            .with_tdu(TduDelivery::new(tdu_fixed, tdu_per_kwh));
        if let Some(fee) = minimum_usage_fee {
            builder = builder.with_minimum_usage_fee(fee);
        }
        for credit in credits {
            builder = builder.with_bill_credit(credit);
        }
        for fee in fees {
            builder = builder.with_fee(fee);
        }

        builder
            .build()
            .map_err(|violation| self.invariant_failure(violation))
    }

    fn rules_for(&self, target: Target) -> impl Iterator<Item = (usize, &'a Rule)> + 'a {
        let rules = self.rules;
        rules
            .iter()
            .enumerate()
            .filter(move |(_, rule)| rule.target() == target)
    }

    /// Convert one match, mapping a bad number to a failure
    fn convert(
        &self,
        rule: &Rule,
        caps: &regex::Captures<'_>,
        span: &Range<usize>,
    ) -> Result<Extracted, ExtractionFailure> {
        rule.convert(caps).map_err(|err| {
            ExtractionFailure::unparseable(rule.target().field(), self.window(span), &err.token)
        })
    }

    /// Value for a single-valued target
    ///
    /// The first rule with any match supplies the value. Repeated matches of
    /// that rule must agree.
    fn scalar(&mut self, target: Target) -> Result<Option<Hit>, ExtractionFailure> {
        let field = target.field();

        for (index, rule) in self.rules_for(target) {
            let mut hits = Vec::new();
            for caps in rule.pattern().captures_iter(self.text) {
                let Some(whole) = caps.get(0) else { continue };
                let span = whole.range();
                let value = self.convert(rule, &caps, &span)?;
                hits.push(Hit {
                    rule: index,
                    span,
                    value,
                });
            }

            let Some(first) = hits.first() else { continue };
            if let Some(conflict) = hits.iter().find(|hit| hit.value != first.value) {
                return Err(ExtractionFailure::ambiguous(
                    field,
                    self.window(&(first.span.start..conflict.span.end)),
                    format!(
                        "rule '{}' matched '{}' and '{}'",
                        rule.name(),
                        &self.text[first.span.clone()],
                        &self.text[conflict.span.clone()]
                    ),
                ));
            }

            debug!(field = %field, rule = rule.name(), matches = hits.len(), "Rule matched");
            let hit = hits.swap_remove(0);
            self.spans.push((field, hit.span.clone()));
            return Ok(Some(hit));
        }

        Ok(None)
    }

    fn amount_or_zero(&mut self, target: Target) -> Result<Decimal, ExtractionFailure> {
        Ok(self
            .scalar(target)?
            .and_then(|hit| hit.value.as_amount())
            .unwrap_or(Decimal::ZERO))
    }

    /// Every match for a multi-valued target
    ///
    /// A match overlapping a span already accepted for this target is
    /// dropped, so the earlier rule wins contested text.
    fn candidates(&mut self, target: Target) -> Result<Vec<Hit>, ExtractionFailure> {
        let field = target.field();
        let mut accepted: Vec<Hit> = Vec::new();

        for (index, rule) in self.rules_for(target) {
            for caps in rule.pattern().captures_iter(self.text) {
                let Some(whole) = caps.get(0) else { continue };
                let span = whole.range();
                if accepted.iter().any(|hit| overlaps(&hit.span, &span)) {
                    continue;
                }
                let value = self.convert(rule, &caps, &span)?;
                debug!(field = %field, rule = rule.name(), "Rule matched");
                accepted.push(Hit {
                    rule: index,
                    span,
                    value,
                });
            }
        }

        for hit in &accepted {
            self.spans.push((field, hit.span.clone()));
        }
        Ok(accepted)
    }

    /// Drop duplicate bands and resolve bands sharing the same bounds
    fn distinct_bands(&self, field: RateField, hits: Vec<Hit>) -> Result<Vec<Band>, ExtractionFailure> {
        let mut kept: Vec<Hit> = Vec::new();

        for hit in hits {
            let Some(band) = hit.value.as_band() else { continue };
            let existing = kept.iter().find(|k| {
                k.value
                    .as_band()
                    .is_some_and(|b| b.lower == band.lower && b.upper == band.upper)
            });

            match existing {
                None => kept.push(hit),
                Some(existing) if existing.value == hit.value => {}
                Some(existing) if existing.rule == hit.rule => {
                    return Err(ExtractionFailure::ambiguous(
                        field,
                        self.window(&(existing.span.start..hit.span.end)),
                        format!(
                            "rule '{}' matched '{}' and '{}'",
                            self.rules[hit.rule].name(),
                            &self.text[existing.span.clone()],
                            &self.text[hit.span.clone()]
                        ),
                    ));
                }
                Some(existing) => {
                    warn!(
                        field = %field,
                        kept_rule = self.rules[existing.rule].name(),
                        dropped_rule = self.rules[hit.rule].name(),
                        lower_kwh = %band.lower,
                        "Conflicting values for the same band, keeping the earlier rule"
                    );
                }
            }
        }

        let mut bands: Vec<Band> = kept
            .into_iter()
            .filter_map(|hit| match hit.value {
                Extracted::Band(band) => Some(band),
                _ => None,
            })
            .collect();
        bands.sort_by(|a, b| {
            a.lower.cmp(&b.lower).then_with(|| match (a.upper, b.upper) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
        });
        Ok(bands)
    }

    /// Tier bands, or a single open tier from a flat rate
    ///
    /// Inclusive printed ranges (`0-1000`, `1001+`) become half-open tiers:
    /// a lower bound one above the previous upper bound snaps down to it, and
    /// a first tier starting at 1 kWh starts at 0. The printed upper bound is
    /// kept, so it is the number of kWh billed at that tier's rate: `0-999`
    /// then `1000+` bills 999 kWh at the first rate.
    fn energy_tiers(&mut self) -> Result<Vec<EnergyTier>, ExtractionFailure> {
        let field = RateField::EnergyRateTiers;
        let hits = self.candidates(Target::EnergyTier)?;
        let bands = self.distinct_bands(field, hits)?;

        if bands.is_empty() {
            return match self.scalar(Target::FlatEnergyRate)?.and_then(|hit| hit.value.as_amount()) {
                Some(rate) => Ok(vec![EnergyTier::open(Decimal::ZERO, rate)]),
                None => Err(ExtractionFailure::missing(field, self.whole_window())),
            };
        }

        let mut tiers = Vec::with_capacity(bands.len());
        let mut previous_upper: Option<Decimal> = None;

        for (index, band) in bands.into_iter().enumerate() {
            let mut lower = band.lower;
            if index == 0 && lower == Decimal::ONE {
                lower = Decimal::ZERO;
            }
            if let Some(previous) = previous_upper {
                if previous.checked_add(Decimal::ONE) == Some(lower) {
                    lower = previous;
                }
            }
            previous_upper = band.upper;
            tiers.push(EnergyTier {
                lower_bound_kwh: lower,
                upper_bound_kwh: band.upper,
                rate_usd_per_kwh: band.value,
            });
        }

        Ok(tiers)
    }

    /// Credit bands; a maximum one below the next band's minimum is raised to meet it
    fn bill_credits(&mut self) -> Result<Vec<BillCredit>, ExtractionFailure> {
        let field = RateField::BillCredits;
        let hits = self.candidates(Target::BillCredit)?;
        let mut bands = self.distinct_bands(field, hits)?;

        for index in 1..bands.len() {
            let next_min = bands[index].lower;
            if let Some(max) = bands[index - 1].upper {
                if max.checked_add(Decimal::ONE) == Some(next_min) {
                    bands[index - 1].upper = Some(next_min);
                }
            }
        }

        Ok(bands
            .into_iter()
            .map(|band| BillCredit {
                threshold_kwh_min: band.lower,
                threshold_kwh_max: band.upper,
                credit_usd: band.value,
                min_exclusive: band.lower_exclusive,
            })
            .collect())
    }

    /// Flat fees in document order, one per label
    fn other_fees(&mut self) -> Result<Vec<Fee>, ExtractionFailure> {
        let field = RateField::OtherFees;
        let mut hits = self.candidates(Target::OtherFee)?;
        hits.sort_by_key(|hit| hit.span.start);

        let mut kept: Vec<Hit> = Vec::new();
        for hit in hits {
            let Some(fee) = hit.value.as_fee() else { continue };
            let existing = kept
                .iter()
                .find(|k| k.value.as_fee().is_some_and(|f| f.label == fee.label));

            match existing {
                None => kept.push(hit),
                Some(existing) if existing.value == hit.value => {}
                Some(existing) if existing.rule == hit.rule => {
                    return Err(ExtractionFailure::ambiguous(
                        field,
                        self.window(&(existing.span.start..hit.span.end)),
                        format!("'{}' is stated with two different amounts", fee.label),
                    ));
                }
                Some(existing) => {
                    warn!(
                        field = %field,
                        label = %fee.label,
                        kept_rule = self.rules[existing.rule].name(),
                        dropped_rule = self.rules[hit.rule].name(),
                        "Conflicting fee amounts, keeping the earlier rule"
                    );
                }
            }
        }

        Ok(kept
            .into_iter()
            .filter_map(|hit| match hit.value {
                Extracted::Fee(fee) => Some(fee),
                _ => None,
            })
            .collect())
    }

    fn invariant_failure(&self, violation: InvariantViolation) -> ExtractionFailure {
        let field = violation.field();
        let covering = self
            .spans
            .iter()
            .filter(|(f, _)| *f == field)
            .map(|(_, span)| span.clone())
            .reduce(|a, b| a.start.min(b.start)..a.end.max(b.end));

        let window = match covering {
            Some(span) => self.window(&span),
            None => self.whole_window(),
        };
        ExtractionFailure::invariant(violation, window)
    }

    /// Text around a span, widened by the configured context on each side
    fn window(&self, span: &Range<usize>) -> String {
        let context = self.config.window_context_chars;
        let start = self.text[..span.start]
            .char_indices()
            .rev()
            .take(context)
            .last()
            .map_or(span.start, |(i, _)| i);
        let end = self.text[span.end..]
            .char_indices()
            .nth(context)
            .map_or(self.text.len(), |(i, _)| span.end + i);
        self.text[start..end].to_string()
    }

    fn whole_window(&self) -> String {
        self.text.chars().take(self.config.max_window_chars).collect()
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Converter;
    use efl_common::FailureReason;
    use rust_decimal_macros::dec;

    const SCENARIO: &str = "Base Charge: $9.95\n\
        Energy Charge: 0-1000 kWh @ $0.09/kWh\n\
        1001+ kWh @ $0.07/kWh\n\
        TDU Delivery: $3.42 + $0.0389/kWh";

    #[test]
    fn test_scenario() {
        let rates = RateExtractor::new().extract(SCENARIO).unwrap();

        assert_eq!(rates.base_charge_usd(), dec!(9.95));
        assert_eq!(
            rates.energy_rate_tiers(),
            &[
                EnergyTier::bounded(dec!(0), dec!(1000), dec!(0.09)),
                EnergyTier::open(dec!(1000), dec!(0.07)),
            ]
        );
        assert_eq!(rates.tdu_delivery(), &TduDelivery::new(dec!(3.42), dec!(0.0389)));
        assert!(rates.minimum_usage_fee().is_none());
        assert!(rates.bill_credits().is_empty());
    }

    #[test]
    fn test_flat_rate_fallback() {
        let rates = RateExtractor::new()
            .extract("Base Charge: $0. Energy Charge: 11.2 cents per kWh")
            .unwrap();
        assert_eq!(rates.base_charge_usd(), dec!(0));
        assert_eq!(
            rates.energy_rate_tiers(),
            &[EnergyTier::open(dec!(0), dec!(0.112))]
        );
    }

    #[test]
    fn test_missing_energy_reported_first() {
        let failure = RateExtractor::new().extract("Plan name: Saver 12").unwrap_err();
        assert_eq!(failure.field, RateField::EnergyRateTiers);
        assert_eq!(failure.reason, FailureReason::MissingField);
        assert_eq!(failure.window, "plan name: saver 12");
    }

    #[test]
    fn test_missing_base_charge() {
        let failure = RateExtractor::new()
            .extract("Energy Charge: 9.5¢ per kWh")
            .unwrap_err();
        assert_eq!(failure.field, RateField::BaseCharge);
        assert_eq!(failure.reason, FailureReason::MissingField);
    }

    #[test]
    fn test_ambiguous_base_charge() {
        let failure = RateExtractor::new()
            .extract("Base Charge: $9.95. Energy Charge: 9.5¢/kWh. Base Charge: $4.95")
            .unwrap_err();
        assert_eq!(failure.field, RateField::BaseCharge);
        assert_eq!(failure.reason, FailureReason::AmbiguousMatch);
        assert!(failure.detail.contains("base_charge"));
    }

    #[test]
    fn test_repeated_equal_value_is_not_ambiguous() {
        let rates = RateExtractor::new()
            .extract("Base Charge: $9.95. Energy Charge: 9.5¢/kWh. Base Charge: $9.950")
            .unwrap();
        assert_eq!(rates.base_charge_usd(), dec!(9.95));
    }

    #[test]
    fn test_rule_precedence_between_phrasings() {
        let rates = RateExtractor::new()
            .extract("Base Charge: $9.95. Monthly Fee: $4.95. Energy Charge: 9.5¢/kWh")
            .unwrap();
        assert_eq!(rates.base_charge_usd(), dec!(9.95));
    }

    #[test]
    fn test_unparseable_number() {
        let failure = RateExtractor::new()
            .extract("Base Charge: $9.9.5. Energy Charge: 9.5¢/kWh")
            .unwrap_err();
        assert_eq!(failure.field, RateField::BaseCharge);
        assert_eq!(failure.reason, FailureReason::UnparseableNumber);
        assert!(failure.detail.contains("9.9.5"));
        assert!(failure.window.contains("base charge: $9.9.5"));
    }

    #[test]
    fn test_overlapping_tiers_are_invariant_violation() {
        let failure = RateExtractor::new()
            .extract("Base Charge: $5. 0-1000 kWh @ $0.09/kWh. 500+ kWh @ $0.07/kWh")
            .unwrap_err();
        assert_eq!(failure.field, RateField::EnergyRateTiers);
        assert_eq!(failure.reason, FailureReason::InvariantViolation);
        assert!(failure.window.contains("0-1000 kwh"));
    }

    #[test]
    fn test_conflicting_band_from_same_rule() {
        let failure = RateExtractor::new()
            .extract("Base Charge: $5. 0-1000 kWh @ $0.09/kWh. 0-1000 kWh @ $0.08/kWh. 1001+ kWh @ $0.07/kWh")
            .unwrap_err();
        assert_eq!(failure.reason, FailureReason::AmbiguousMatch);
    }

    #[test]
    fn test_bare_per_kwh_rates_read_as_cents() {
        let rates = RateExtractor::new()
            .extract("Base Charge: $9.95 Energy Charge: 0-1000 kWh 12.5 per kWh 1001+ kWh 10.1 per kWh")
            .unwrap();
        assert_eq!(
            rates.energy_rate_tiers(),
            &[
                EnergyTier::bounded(dec!(0), dec!(1000), dec!(0.125)),
                EnergyTier::open(dec!(1000), dec!(0.101)),
            ]
        );
    }

    #[test]
    fn test_parenthesized_and_comparison_tiers() {
        let expected = [
            EnergyTier::bounded(dec!(0), dec!(1000), dec!(0.125)),
            EnergyTier::open(dec!(1000), dec!(0.101)),
        ];

        let rates = RateExtractor::new()
            .extract(
                "Base Charge: $9.95 Energy Charge (0 - 1,000 kWh): 12.5¢ per kWh \
                 Energy Charge (> 1,000 kWh): 10.1¢ per kWh",
            )
            .unwrap();
        assert_eq!(rates.energy_rate_tiers(), &expected);

        let rates = RateExtractor::new()
            .extract("Base Charge: $5 0-1000 kWh @ 12.5¢/kWh > 1000 kWh @ 10.1¢/kWh")
            .unwrap();
        assert_eq!(rates.energy_rate_tiers(), &expected);
    }

    #[test]
    fn test_printed_upper_bound_is_kept() {
        let rates = RateExtractor::new()
            .extract("Base Charge: $5 0-999 kWh @ 10¢/kWh 1000+ kWh @ 8¢/kWh")
            .unwrap();
        assert_eq!(
            rates.energy_rate_tiers(),
            &[
                EnergyTier::bounded(dec!(0), dec!(999), dec!(0.10)),
                EnergyTier::open(dec!(999), dec!(0.08)),
            ]
        );
    }

    #[test]
    fn test_amount_first_credit() {
        let rates = RateExtractor::new()
            .extract(
                "Base Charge: $9.95 Energy Charge: 10¢ per kWh \
                 A $100 bill credit applies when usage is 1,000 kWh or more",
            )
            .unwrap();
        assert_eq!(rates.bill_credits(), &[BillCredit::open(dec!(1000), dec!(100))]);
    }

    #[test]
    fn test_strict_credit_minimum_is_exclusive() {
        let rates = RateExtractor::new()
            .extract(
                "Base Charge: $5 Energy Charge: 10¢/kWh \
                 Bill Credit: $50 for usage between 1,000 and 2,000 kWh \
                 Bill Credit: $100 for usage more than 2000 kWh",
            )
            .unwrap();
        assert_eq!(
            rates.bill_credits(),
            &[
                BillCredit::bounded(dec!(1000), dec!(2000), dec!(50)),
                BillCredit::above(dec!(2000), dec!(100)),
            ]
        );
        assert_eq!(rates.credit_for(dec!(2000)).unwrap().credit_usd, dec!(50));
        assert_eq!(rates.credit_for(dec!(2000.5)).unwrap().credit_usd, dec!(100));
    }

    #[test]
    fn test_oversized_amount_is_invariant_violation() {
        let failure = RateExtractor::new()
            .extract(
                "Base Charge: $79228162514264337593543950335 \
                 Energy Charge: 10¢ per kWh PUCT Assessment: $1.00",
            )
            .unwrap_err();
        assert_eq!(failure.field, RateField::BaseCharge);
        assert_eq!(failure.reason, FailureReason::InvariantViolation);
        assert!(failure.window.contains("base charge"));
    }

    #[test]
    fn test_custom_rule_appended() {
        let rule = Rule::new(
            "connection_fee",
            Target::OtherFee,
            r"(?P<label>connection fee)[:\s]*\$(?P<num>[\d.]+)",
            Converter::Fee,
        )
        .unwrap();
        let extractor = RateExtractor::new().with_rule(rule);
        assert_eq!(extractor.rules().len(), BUILTIN_RULES.len() + 1);

        let rates = extractor
            .extract("Base Charge: $5. Energy Charge: 10¢/kWh. Connection Fee: $2.50")
            .unwrap();
        assert_eq!(rates.other_fees(), &[Fee::new("connection fee", dec!(2.50))]);
    }

    #[test]
    fn test_window_respects_char_boundaries() {
        let config = ExtractorConfig {
            window_context_chars: 3,
            max_window_chars: 5,
        };
        let failure = RateExtractor::new()
            .with_config(config)
            .extract("¢¢¢¢ Base Charge: $1.2.3 ¢¢¢¢ Energy Charge: 5¢/kWh")
            .unwrap_err();
        assert_eq!(failure.reason, FailureReason::UnparseableNumber);
        assert!(failure.window.starts_with("¢¢ base"));
    }
}
