//! In-memory cost cache
//!
//! Calculation is a pure function of (rate structure, usage), so results are
//! memoized under a blake3 hash of both.

use dashmap::DashMap;
use efl_common::{CostBreakdown, RateStructure, Result};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use super::calculator::CostCalculator;

/// Bounded map from (structure, usage) hash to breakdown
pub struct CostCache {
    cache: DashMap<String, CostBreakdown>,
    max_entries: usize,
}

impl CostCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            cache: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Deterministic key from the serialized structure and normalized usage
    fn key(rate: &RateStructure, usage_kwh: Decimal) -> Result<String> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&serde_json::to_vec(rate)?);
        hasher.update(b":");
        hasher.update(usage_kwh.normalize().to_string().as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }

    /// Cached breakdown, calculating on a miss
    #[instrument(skip(self, calculator, rate))]
    pub fn get_or_calculate(
        &self,
        calculator: &CostCalculator,
        rate: &RateStructure,
        usage_kwh: Decimal,
    ) -> Result<CostBreakdown> {
        let key = Self::key(rate, usage_kwh)?;

        if let Some(entry) = self.cache.get(&key) {
            debug!(key = %key, "Cost cache hit");
            return Ok(entry.value().clone());
        }

        let breakdown = calculator.calculate(rate, usage_kwh)?;

        // At capacity, evict an arbitrary entry
        if self.cache.len() >= self.max_entries {
            let victim = self.cache.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                self.cache.remove(&victim);
            }
        }
        self.cache.insert(key, breakdown.clone());

        Ok(breakdown)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
