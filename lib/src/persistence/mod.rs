//! Persisted popularity scores keyed by canonical track.
//!
//! Entries never expire on their own; a cached score stays valid until the
//! cache is cleared by hand. Callers open a store at batch start and call
//! [`PopularityStore::flush`] once at batch end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached popularity lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPopularity {
    pub score: f64,
    pub fetched_at: DateTime<Utc>,
}

impl CachedPopularity {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            fetched_at: Utc::now(),
        }
    }
}

/// Point lookups and upserts of popularity scores
pub trait PopularityStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, key: &str) -> Option<CachedPopularity>;
    fn upsert(&mut self, key: &str, entry: &CachedPopularity) -> Result<(), Self::Error>;
    fn len(&self) -> usize;
    fn keys(&self) -> Vec<String>;
    fn clear(&mut self) -> Result<(), Self::Error>;
    /// Persist pending writes
    fn flush(&mut self) -> Result<(), Self::Error>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

mod file_storage;
pub use file_storage::{CacheError, FilePopularityCache};

mod memory_storage;
pub use memory_storage::MemoryPopularityCache;
