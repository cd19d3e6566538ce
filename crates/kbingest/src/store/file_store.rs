//! In-memory record store with write-through persistence.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::error::StoreError;

use super::cache::RecordCache;
use super::reconcile::{merge_records, MergeReport};
use super::record::{FailedStage, FileRecord, FileStatus};

/// Record counts by lifecycle bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCounts {
    pub pending: usize,
    pub completed: usize,
    pub upload_failed: usize,
    pub embed_failed: usize,
    pub embedded: usize,
}

/// The authoritative collection of ingested files.
///
/// Records keep insertion order. All writes go through one `RwLock` write
/// guard, and the full set is saved to the cache before the guard is
/// released, so cache writes land in mutation order.
pub struct FileStore {
    records: RwLock<Vec<FileRecord>>,
    cache: Arc<dyn RecordCache>,
}

impl FileStore {
    /// Creates an empty store. Cached records are brought in by reconciliation.
    pub fn new(cache: Arc<dyn RecordCache>) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            cache,
        }
    }

    pub fn cache(&self) -> Arc<dyn RecordCache> {
        Arc::clone(&self.cache)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<FileRecord>> {
        match self.records.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("File store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<FileRecord>> {
        match self.records.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("File store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn persist(&self, records: &[FileRecord]) {
        if let Err(e) = self.cache.save(records) {
            log::error!("Failed to persist file records: {}", e);
        }
    }

    fn check(record: &FileRecord) {
        if let Some(violation) = record.invariant_violation() {
            log::error!("File record {} violates invariant: {}", record.id, violation);
        }
    }

    /// Returns all records in insertion order.
    pub fn all(&self) -> Vec<FileRecord> {
        self.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<FileRecord> {
        self.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Appends a batch of new records in order. Fails without change if any id
    /// is already present or repeated within the batch.
    pub fn append_all(&self, new_records: Vec<FileRecord>) -> Result<(), StoreError> {
        let mut records = self.write();

        let mut seen: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        for record in &new_records {
            if !seen.insert(record.id.as_str()) {
                return Err(StoreError::DuplicateId(record.id.clone()));
            }
        }

        for record in &new_records {
            Self::check(record);
        }
        records.extend(new_records);
        self.persist(&records);
        Ok(())
    }

    pub fn append(&self, record: FileRecord) -> Result<(), StoreError> {
        self.append_all(vec![record])
    }

    /// Mutates one record in place and returns the updated copy.
    pub fn update<F>(&self, id: &str, mutate: F) -> Result<FileRecord, StoreError>
    where
        F: FnOnce(&mut FileRecord),
    {
        let mut records = self.write();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::UnknownRecord(id.to_string()))?;

        mutate(record);
        Self::check(record);
        let updated = record.clone();

        self.persist(&records);
        Ok(updated)
    }

    /// Validates a set of records and mutates them under one write guard.
    ///
    /// Nothing is mutated unless every id exists and passes `validate`.
    pub fn update_batch<E, V, F>(
        &self,
        ids: &[String],
        validate: V,
        mut mutate: F,
    ) -> Result<Vec<FileRecord>, E>
    where
        E: From<StoreError>,
        V: Fn(&FileRecord) -> Result<(), E>,
        F: FnMut(&mut FileRecord),
    {
        let mut records = self.write();

        let mut indices = Vec::with_capacity(ids.len());
        for id in ids {
            let index = records
                .iter()
                .position(|r| &r.id == id)
                .ok_or_else(|| StoreError::UnknownRecord(id.clone()))?;
            validate(&records[index])?;
            indices.push(index);
        }

        let mut updated = Vec::with_capacity(indices.len());
        for index in indices {
            let record = &mut records[index];
            mutate(record);
            Self::check(record);
            updated.push(record.clone());
        }

        if !updated.is_empty() {
            self.persist(&records);
        }
        Ok(updated)
    }

    /// Mutates every record matching `predicate`. Returns the ids touched.
    pub fn update_where<P, F>(&self, predicate: P, mut mutate: F) -> Vec<String>
    where
        P: Fn(&FileRecord) -> bool,
        F: FnMut(&mut FileRecord),
    {
        let mut records = self.write();
        let mut touched = Vec::new();

        for record in records.iter_mut() {
            if !predicate(record) {
                continue;
            }
            mutate(record);
            Self::check(record);
            touched.push(record.id.clone());
        }

        if !touched.is_empty() {
            self.persist(&records);
        }
        touched
    }

    pub fn remove(&self, id: &str) -> Result<FileRecord, StoreError> {
        let mut records = self.write();
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::UnknownRecord(id.to_string()))?;

        let removed = records.remove(index);
        self.persist(&records);
        Ok(removed)
    }

    /// Replaces the whole record set.
    pub fn replace_all(&self, new_records: Vec<FileRecord>) {
        let mut records = self.write();
        *records = new_records;
        self.persist(&records);
    }

    /// Appends cached records whose id is not present yet. Returns how many were added.
    pub fn restore(&self, cached: Vec<FileRecord>) -> usize {
        let mut records = self.write();
        let mut seen: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();

        let before = records.len();
        for record in cached {
            if seen.insert(record.id.clone()) {
                records.push(record);
            }
        }

        let restored = records.len() - before;
        if restored > 0 {
            self.persist(&records);
        }
        restored
    }

    /// Merges a backend snapshot into the current set, keyed by id.
    pub fn merge_remote(&self, remote: Vec<FileRecord>) -> MergeReport {
        let mut records = self.write();
        let local = std::mem::take(&mut *records);
        let (merged, report) = merge_records(local, remote);
        merged.iter().for_each(Self::check);
        *records = merged;
        self.persist(&records);
        report
    }

    pub fn counts(&self) -> StoreCounts {
        let records = self.read();
        let mut counts = StoreCounts::default();

        for record in records.iter() {
            if record.is_embedded {
                counts.embedded += 1;
                continue;
            }
            match (record.status, record.failure_stage()) {
                (FileStatus::Pending, _) => counts.pending += 1,
                (FileStatus::Completed, _) => counts.completed += 1,
                (FileStatus::Failed, Some(FailedStage::Embed)) => counts.embed_failed += 1,
                (FileStatus::Failed, _) => counts.upload_failed += 1,
            }
        }

        counts
    }
}
