//! Per-file ingestion progress broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Phase of a file's ingestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestPhase {
    Queued,
    Uploading,
    Translating,
    Uploaded,
    UploadFailed,
    Embedding,
    Embedded,
    EmbedFailed,
    Deleted,
}

impl IngestPhase {
    /// Returns true for phases that end a stage.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IngestPhase::Uploaded
                | IngestPhase::UploadFailed
                | IngestPhase::Embedded
                | IngestPhase::EmbedFailed
                | IngestPhase::Deleted
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, IngestPhase::UploadFailed | IngestPhase::EmbedFailed)
    }
}

impl std::fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestPhase::Queued => write!(f, "Queued"),
            IngestPhase::Uploading => write!(f, "Uploading"),
            IngestPhase::Translating => write!(f, "Uploading and translating"),
            IngestPhase::Uploaded => write!(f, "Uploaded"),
            IngestPhase::UploadFailed => write!(f, "Upload failed"),
            IngestPhase::Embedding => write!(f, "Embedding"),
            IngestPhase::Embedded => write!(f, "Embedded"),
            IngestPhase::EmbedFailed => write!(f, "Embed failed"),
            IngestPhase::Deleted => write!(f, "Deleted"),
        }
    }
}

/// Progress event for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestProgressEvent {
    pub file_id: String,
    pub filename: String,
    pub phase: IngestPhase,
    /// Human-readable message describing current activity.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Embed progress, 0 to 100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Target knowledge base of an embed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base_id: Option<String>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestProgressEvent {
    pub fn new(file_id: &str, filename: &str, phase: IngestPhase, message: &str) -> Self {
        Self {
            file_id: file_id.to_string(),
            filename: filename.to_string(),
            phase,
            message: message.to_string(),
            timestamp: Utc::now(),
            progress: None,
            knowledge_base_id: None,
            error: None,
        }
    }

    /// Creates a failure event for the given phase.
    pub fn failed(file_id: &str, filename: &str, phase: IngestPhase, error: &str) -> Self {
        let mut event = Self::new(file_id, filename, phase, &phase.to_string());
        event.error = Some(error.to_string());
        event
    }
}

/// Broadcasts ingestion progress events for streaming.
#[derive(Clone)]
pub struct IngestProgressBroadcaster {
    sender: Arc<broadcast::Sender<IngestProgressEvent>>,
}

impl IngestProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: IngestProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IngestProgressEvent> {
        self.sender.subscribe()
    }

    /// Creates a tracker for one file without emitting anything.
    pub fn track(&self, file_id: &str, filename: &str) -> FileProgressTracker {
        FileProgressTracker::new(file_id, filename, Arc::clone(&self.sender))
    }

    /// Creates a tracker for a newly submitted file and emits `Queued`.
    pub fn start_file(&self, file_id: &str, filename: &str) -> FileProgressTracker {
        let tracker = self.track(file_id, filename);
        tracker.update_phase(IngestPhase::Queued, "File queued for upload");
        tracker
    }
}

impl Default for IngestProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Tracks progress for a single file.
pub struct FileProgressTracker {
    file_id: String,
    filename: String,
    sender: Arc<broadcast::Sender<IngestProgressEvent>>,
}

impl FileProgressTracker {
    pub fn new(
        file_id: &str,
        filename: &str,
        sender: Arc<broadcast::Sender<IngestProgressEvent>>,
    ) -> Self {
        Self {
            file_id: file_id.to_string(),
            filename: filename.to_string(),
            sender,
        }
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn update_phase(&self, phase: IngestPhase, message: &str) {
        let event = IngestProgressEvent::new(&self.file_id, &self.filename, phase, message);
        let _ = self.sender.send(event);
    }

    /// Reports embed progress toward a knowledge base.
    pub fn embed_progress(&self, phase: IngestPhase, knowledge_base_id: &str, progress: u8) {
        let mut event =
            IngestProgressEvent::new(&self.file_id, &self.filename, phase, &phase.to_string());
        event.progress = Some(progress.min(100));
        event.knowledge_base_id = Some(knowledge_base_id.to_string());
        let _ = self.sender.send(event);
    }

    pub fn failed(&self, phase: IngestPhase, error: &str) {
        let event = IngestProgressEvent::failed(&self.file_id, &self.filename, phase, error);
        let _ = self.sender.send(event);
    }
}
