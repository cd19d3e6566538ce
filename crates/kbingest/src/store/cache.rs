//! Local persistence of the full record set.
//!
//! The cache holds an ordered JSON array of [`FileRecord`]s. It is read once
//! at startup and rewritten after every store mutation.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::CacheError;

use super::record::FileRecord;

/// File name used inside the default cache directory.
pub const DEFAULT_CACHE_FILE: &str = "records.json";

/// Storage backend for the record cache.
pub trait RecordCache: Send + Sync {
    /// Loads the cached records. A missing cache is an empty set.
    fn load(&self) -> Result<Vec<FileRecord>, CacheError>;

    /// Replaces the cached records.
    fn save(&self, records: &[FileRecord]) -> Result<(), CacheError>;
}

/// Returns the default cache location under the platform's local data directory.
pub fn default_cache_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("kbingest")
        .join(DEFAULT_CACHE_FILE)
}

/// JSON file cache. Writes go to a sibling temp file and are renamed into place.
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_CACHE_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RecordCache for JsonFileCache {
    fn load(&self) -> Result<Vec<FileRecord>, CacheError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CacheError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| CacheError::Corrupt(e.to_string()))
    }

    fn save(&self, records: &[FileRecord]) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CacheError::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, json).map_err(|e| CacheError::Write {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| CacheError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// In-memory cache, used when no persistence is wanted and in tests.
#[derive(Default)]
pub struct MemoryCache {
    records: Mutex<Vec<FileRecord>>,
    saves: Mutex<usize>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache pre-seeded with records, as if left by a previous session.
    pub fn with_records(records: Vec<FileRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            saves: Mutex::new(0),
        }
    }

    /// Snapshot of what was last saved.
    pub fn snapshot(&self) -> Vec<FileRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        match self.saves.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl RecordCache for MemoryCache {
    fn load(&self) -> Result<Vec<FileRecord>, CacheError> {
        Ok(self.snapshot())
    }

    fn save(&self, records: &[FileRecord]) -> Result<(), CacheError> {
        if let Ok(mut guard) = self.records.lock() {
            *guard = records.to_vec();
        }
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}
