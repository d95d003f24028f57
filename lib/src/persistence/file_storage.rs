use pickledb::{PickleDb, PickleDbDumpPolicy, SerializationMethod};
use std::path::{Path, PathBuf};

use super::{CachedPopularity, PopularityStore};

/// PickleDB-backed popularity cache. Writes stay in memory until `flush`.
pub struct FilePopularityCache {
    db: PickleDb,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum CacheError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FilePopularityCache {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = if path_ref.exists() {
            PickleDb::load(
                path_ref,
                PickleDbDumpPolicy::DumpUponRequest,
                SerializationMethod::Json,
            )
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?
        } else {
            log::info!("Creating new popularity cache at {}", path_ref.display());
            PickleDb::new(
                path_ref,
                PickleDbDumpPolicy::DumpUponRequest,
                SerializationMethod::Json,
            )
        };

        Ok(Self {
            db,
            path: path_ref.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PopularityStore for FilePopularityCache {
    type Error = CacheError;

    fn get(&self, key: &str) -> Option<CachedPopularity> {
        self.db.get(key)
    }

    fn upsert(&mut self, key: &str, entry: &CachedPopularity) -> Result<(), Self::Error> {
        self.db
            .set(key, entry)
            .map_err(|e| CacheError::SerializationError(e.to_string()))
    }

    fn len(&self) -> usize {
        self.db.total_keys()
    }

    fn keys(&self) -> Vec<String> {
        let mut keys = self.db.get_all();
        keys.sort();
        keys
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        for key in self.db.get_all() {
            self.db
                .rem(&key)
                .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.db
            .dump()
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        log::debug!("Flushed popularity cache to {}", self.path.display());
        Ok(())
    }
}
