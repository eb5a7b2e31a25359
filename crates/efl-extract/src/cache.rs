//! In-memory extraction cache
//!
//! Extraction is a pure function of the document text, so results (failures
//! included) are memoized under the blake3 hash of that text.

use dashmap::DashMap;
use efl_common::{ExtractionFailure, RateStructure};
use tracing::debug;

use crate::extractor::RateExtractor;

type Extraction = Result<RateStructure, ExtractionFailure>;

/// Bounded map from document hash to extraction result
pub struct ExtractionCache {
    cache: DashMap<String, Extraction>,
    max_entries: usize,
}

impl ExtractionCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            cache: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    fn key(document_text: &str) -> String {
        blake3::hash(document_text.as_bytes()).to_hex().to_string()
    }

    pub fn get(&self, document_text: &str) -> Option<Extraction> {
        self.cache
            .get(&Self::key(document_text))
            .map(|entry| entry.value().clone())
    }

    /// Cached result for the text, extracting on a miss
    pub fn get_or_extract(&self, extractor: &RateExtractor, document_text: &str) -> Extraction {
        let key = Self::key(document_text);

        if let Some(entry) = self.cache.get(&key) {
            debug!(key = %key, "Extraction cache hit");
            return entry.value().clone();
        }

        let result = extractor.extract(document_text);
        self.insert(key, result.clone());
        result
    }

    fn insert(&self, key: String, result: Extraction) {
        // At capacity, evict an arbitrary entry
        if self.cache.len() >= self.max_entries {
            let victim = self.cache.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                self.cache.remove(&victim);
            }
        }
        self.cache.insert(key, result);
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
