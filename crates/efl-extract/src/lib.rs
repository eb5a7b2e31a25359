//! # EFL Extract
//!
//! Turns linearized Electricity Facts Label text into a validated
//! [`RateStructure`], or a typed [`ExtractionFailure`].
//!
//! ## Pipeline
//!
//! ```text
//! raw text ──► normalize ──► rule table (first match wins per field)
//!                               │
//!                               ├─ scalar fields: base charge, TDU, minimum-usage fee
//!                               └─ band fields: energy tiers, bill credits, flat fees
//!                                          │
//!                                          ▼
//!                               RateStructure validation ──► RateStructure | ExtractionFailure
//! ```
//!
//! Extraction is a pure function of the text: no metadata, no I/O, and the
//! same input always yields the same result.

pub mod cache;
pub mod disclosures;
pub mod extractor;
pub mod normalize;
pub mod number;
pub mod rules;

use std::sync::LazyLock;

pub use cache::ExtractionCache;
pub use efl_common::{ExtractionFailure, PlanDisclosures, RateStructure};
pub use extractor::{ExtractorConfig, RateExtractor};
pub use rules::{Converter, Rule, Target};

static DEFAULT_EXTRACTOR: LazyLock<RateExtractor> = LazyLock::new(RateExtractor::new);

/// Extract a rate structure using the built-in rule table
pub fn extract(document_text: &str) -> Result<RateStructure, ExtractionFailure> {
    DEFAULT_EXTRACTOR.extract(document_text)
}

/// Scan for plan disclosures using the built-in patterns
pub fn disclosures(document_text: &str) -> PlanDisclosures {
    DEFAULT_EXTRACTOR.disclosures(document_text)
}
