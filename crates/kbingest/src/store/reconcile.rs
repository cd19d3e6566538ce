//! Startup reconciliation of cached and backend-reported records.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::backend::Backend;
use crate::error::{BackendError, CacheError};

use super::file_store::FileStore;
use super::record::FileRecord;

/// Outcome of a keyed merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Remote records with no local counterpart.
    pub added: usize,
    /// Local records overwritten by the remote copy.
    pub replaced: usize,
    /// Local records the remote set does not mention.
    pub local_only: usize,
}

/// Merges `remote` into `local` by id.
///
/// Local order is kept; a remote record replaces the local one in place and
/// unknown remote records are appended in remote order. A record repeated in
/// `remote` ends up once, holding its last copy.
///
/// Remote records are normalized first. When the local copy is embedded and
/// the remote copy carries no embed result, the local embed fields survive.
pub fn merge_records(
    mut local: Vec<FileRecord>,
    remote: Vec<FileRecord>,
) -> (Vec<FileRecord>, MergeReport) {
    let mut index: HashMap<String, usize> = local
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.clone(), i))
        .collect();
    let local_len = local.len();
    let mut report = MergeReport::default();
    let mut replaced_local = vec![false; local_len];

    for mut record in remote {
        record.normalize_listed();
        match index.get(&record.id) {
            Some(&i) => {
                if i < local_len && !replaced_local[i] {
                    replaced_local[i] = true;
                    report.replaced += 1;
                }
                if record.adopt_embedding(&local[i]) {
                    debug!("Kept local embed of {} missing from backend copy", record.id);
                }
                local[i] = record;
            }
            None => {
                index.insert(record.id.clone(), local.len());
                local.push(record);
                report.added += 1;
            }
        }
    }

    report.local_only = local_len - report.replaced;
    (local, report)
}

/// Result of a startup reconciliation.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Records restored from the local cache.
    pub restored: usize,
    pub merge: MergeReport,
    /// Set when the cache could not be read and was treated as empty.
    pub cache_error: Option<String>,
    /// Set when the backend list failed and only local records were kept.
    pub remote_error: Option<BackendError>,
}

impl ReconcileReport {
    pub fn is_complete(&self) -> bool {
        self.cache_error.is_none() && self.remote_error.is_none()
    }
}

/// Loads the local cache and the backend listing into a [`FileStore`].
pub struct Reconciler {
    store: Arc<FileStore>,
    backend: Arc<dyn Backend>,
}

impl Reconciler {
    pub fn new(store: Arc<FileStore>, backend: Arc<dyn Backend>) -> Self {
        Self { store, backend }
    }

    /// Runs one reconciliation pass. Calling it again with the same inputs
    /// leaves the store unchanged.
    pub async fn run(&self) -> ReconcileReport {
        let span = info_span!("reconcile");
        async {
            let cache = self.store.cache();
            let cached = tokio::task::spawn_blocking(move || cache.load());
            let (cached, remote) = tokio::join!(cached, self.backend.list_files());

            let mut report = ReconcileReport::default();

            let cached = match cached {
                Ok(Ok(records)) => records,
                Ok(Err(e)) => {
                    warn!("Ignoring unreadable record cache: {}", e);
                    report.cache_error = Some(e.to_string());
                    Vec::new()
                }
                Err(e) => {
                    let e = CacheError::Corrupt(format!("cache load task failed: {}", e));
                    warn!("Ignoring unreadable record cache: {}", e);
                    report.cache_error = Some(e.to_string());
                    Vec::new()
                }
            };

            let restored = self.store.restore(cached);
            report.restored = restored;

            match remote {
                Ok(records) => {
                    report.merge = self.store.merge_remote(records);
                }
                Err(e) => {
                    warn!("Backend file list unavailable, keeping local records: {}", e);
                    report.remote_error = Some(e);
                }
            }

            info!(
                restored = report.restored,
                added = report.merge.added,
                replaced = report.merge.replaced,
                total = self.store.len(),
                "Reconciliation finished"
            );
            report
        }
        .instrument(span)
        .await
    }
}
