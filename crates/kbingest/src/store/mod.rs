//! File records, their local cache and startup reconciliation.

pub mod cache;
pub mod file_store;
pub mod reconcile;
pub mod record;

pub use cache::{default_cache_path, JsonFileCache, MemoryCache, RecordCache};
pub use file_store::{FileStore, StoreCounts};
pub use reconcile::{merge_records, MergeReport, ReconcileReport, Reconciler};
pub use record::{FailedStage, FileRecord, FileStatus, EMBED_COMPLETE};
