//! Per-file lifecycle states derived from a [`FileRecord`].

use serde::Serialize;

use crate::store::{FailedStage, FileRecord, FileStatus, EMBED_COMPLETE};

/// Where a file stands in the upload → embed lifecycle.
///
/// ```text
/// submitted ──► completed ──► embedding ──► embedded
///     │                           │  ▲          │
///     ▼                           ▼  │          │
/// upload_failed             embed_failed ◄──────┘ (re-embed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Submitted,
    Completed,
    UploadFailed,
    Embedding,
    Embedded,
    EmbedFailed,
}

impl FileState {
    pub fn of(record: &FileRecord) -> Self {
        if record.is_embedded {
            return FileState::Embedded;
        }
        if matches!(record.embedding_progress, Some(p) if p < EMBED_COMPLETE) {
            return FileState::Embedding;
        }
        match record.status {
            FileStatus::Pending => FileState::Submitted,
            FileStatus::Completed => FileState::Completed,
            FileStatus::Failed => match record.failure_stage() {
                Some(FailedStage::Embed) => FileState::EmbedFailed,
                _ => FileState::UploadFailed,
            },
        }
    }

    /// States an embed may start from. Re-embedding is a fresh transition.
    pub fn can_embed(&self) -> bool {
        matches!(
            self,
            FileState::Completed | FileState::EmbedFailed | FileState::Embedded
        )
    }

    /// States with a request outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, FileState::Submitted | FileState::Embedding)
    }
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileState::Submitted => write!(f, "submitted"),
            FileState::Completed => write!(f, "completed"),
            FileState::UploadFailed => write!(f, "upload_failed"),
            FileState::Embedding => write!(f, "embedding"),
            FileState::Embedded => write!(f, "embedded"),
            FileState::EmbedFailed => write!(f, "embed_failed"),
        }
    }
}
