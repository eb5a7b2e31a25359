//! Billing configuration

use efl_common::{EflError, Result, STANDARD_USAGE_LEVELS_KWH};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default cap on cached breakdowns
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

/// Billing service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Usage levels (kWh/month) to price each plan at
    pub usage_levels_kwh: Vec<Decimal>,
    /// Maximum entries held by the cost cache
    pub cache_max_entries: usize,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            usage_levels_kwh: STANDARD_USAGE_LEVELS_KWH
                .iter()
                .map(|kwh| Decimal::from(*kwh))
                .collect(),
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl BillingConfig {
    /// Load configuration from the environment
    ///
    /// Reads an optional `.env`, then `EFL_USAGE_LEVELS` (comma-separated kWh)
    /// and `EFL_CACHE_MAX_ENTRIES`.
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        Self::from_vars(
            std::env::var("EFL_USAGE_LEVELS").ok().as_deref(),
            std::env::var("EFL_CACHE_MAX_ENTRIES").ok().as_deref(),
        )
    }

    fn from_vars(usage_levels: Option<&str>, cache_max_entries: Option<&str>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(val) = usage_levels {
            cfg.usage_levels_kwh = parse_usage_levels(val)?;
        }
        if let Some(val) = cache_max_entries {
            cfg.cache_max_entries = val.trim().parse().map_err(|e| {
                EflError::Config(format!("EFL_CACHE_MAX_ENTRIES '{}': {}", val, e))
            })?;
        }

        Ok(cfg)
    }
}

fn parse_usage_levels(val: &str) -> Result<Vec<Decimal>> {
    let levels = val
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let kwh = Decimal::from_str(s)
                .map_err(|e| EflError::Config(format!("EFL_USAGE_LEVELS '{}': {}", s, e)))?;
            if kwh.is_sign_negative() && !kwh.is_zero() {
                return Err(EflError::Config(format!(
                    "EFL_USAGE_LEVELS '{}': usage must be non-negative",
                    s
                )));
            }
            Ok(kwh)
        })
        .collect::<Result<Vec<_>>>()?;

    if levels.is_empty() {
        return Err(EflError::Config("EFL_USAGE_LEVELS is empty".to_string()));
    }
    Ok(levels)
}
