//! Broadcasting of ingestion progress for real-time event streaming.

pub mod ingest_progress;

pub use ingest_progress::{
    FileProgressTracker, IngestPhase, IngestProgressBroadcaster, IngestProgressEvent,
};
