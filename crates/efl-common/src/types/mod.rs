//! Core data types for EFL extraction and billing

pub mod breakdown;
pub mod disclosures;
pub mod rate_structure;
