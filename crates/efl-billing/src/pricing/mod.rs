//! Pricing module
//!
//! Provides the cost calculation with:
//! - Tier walk with per-slice audit records
//! - Usage-conditional minimum fee and bill credits
//! - Standard usage levels and a one-line rate summary
//! - In-memory memoization of (structure, usage) results

pub mod cache;
pub mod calculator;
pub mod summary;

pub use cache::CostCache;
pub use calculator::CostCalculator;
pub use summary::summarize;
