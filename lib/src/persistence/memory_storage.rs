use std::collections::HashMap;
use std::convert::Infallible;

use super::{CachedPopularity, PopularityStore};

/// In-memory popularity cache, for tests and runs without a cache file
#[derive(Debug, Default, Clone)]
pub struct MemoryPopularityCache {
    entries: HashMap<String, CachedPopularity>,
    flushes: usize,
}

impl MemoryPopularityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `flush` has been called
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl PopularityStore for MemoryPopularityCache {
    type Error = Infallible;

    fn get(&self, key: &str) -> Option<CachedPopularity> {
        self.entries.get(key).cloned()
    }

    fn upsert(&mut self, key: &str, entry: &CachedPopularity) -> Result<(), Self::Error> {
        self.entries.insert(key.to_string(), entry.clone());
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.entries.clear();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}
