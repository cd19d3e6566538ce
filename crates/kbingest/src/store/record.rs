//! The ingested-file record and its lifecycle fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress value reported once an embed has been acknowledged.
pub const EMBED_COMPLETE: u8 = 100;

/// Status of the upload/translate stage.
///
/// Defaults to `Completed`: backend listings only contain uploaded files and
/// may omit the field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    #[default]
    Completed,
    Failed,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Pending => write!(f, "pending"),
            FileStatus::Completed => write!(f, "completed"),
            FileStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Which stage produced a `Failed` status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailedStage {
    Upload,
    Embed,
}

/// One ingested file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Opaque identifier, stable across reconciliation.
    pub id: String,
    /// Display name (not unique).
    pub name: String,
    /// Text extracted from the raw upload.
    #[serde(default)]
    pub original_content: String,
    /// Translated text, or a copy of `original_content` when no translation was requested.
    #[serde(default)]
    pub translated_content: String,
    #[serde(default)]
    pub status: FileStatus,
    #[serde(default)]
    pub is_embedded: bool,
    /// `None` means "not attempted" or "errored".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_progress: Option<u8>,
    /// Knowledge base the record was embedded into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_base_id: Option<String>,
    /// Last error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub need_translation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<FailedStage>,
    /// Backend document id returned by the last successful embed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Creates a placeholder for a file that has been submitted but not uploaded yet.
    pub fn pending(id: &str, name: &str, need_translation: bool) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            original_content: String::new(),
            translated_content: String::new(),
            status: FileStatus::Pending,
            is_embedded: false,
            embedding_progress: None,
            knowledge_base_id: None,
            error: None,
            need_translation,
            failed_stage: None,
            doc_id: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Records a successful upload. Without translation both content fields hold the same text.
    pub fn mark_uploaded(&mut self, original: String, translated: Option<String>) {
        self.translated_content = translated.unwrap_or_else(|| original.clone());
        self.original_content = original;
        self.status = FileStatus::Completed;
        self.failed_stage = None;
        self.error = None;
        self.touch();
    }

    /// Records an upload failure. No partial text is kept.
    pub fn mark_upload_failed(&mut self, error: &str) {
        self.original_content.clear();
        self.translated_content.clear();
        self.status = FileStatus::Failed;
        self.failed_stage = Some(FailedStage::Upload);
        self.error = Some(error.to_string());
        self.touch();
    }

    /// Pre-flight marker for an embed attempt.
    pub fn mark_embedding(&mut self) {
        self.is_embedded = false;
        self.embedding_progress = Some(0);
        self.touch();
    }

    pub fn mark_embedded(&mut self, knowledge_base_id: &str, doc_id: Option<String>) {
        self.is_embedded = true;
        self.knowledge_base_id = Some(knowledge_base_id.to_string());
        self.embedding_progress = Some(EMBED_COMPLETE);
        self.status = FileStatus::Completed;
        self.failed_stage = None;
        self.error = None;
        self.doc_id = doc_id;
        self.touch();
    }

    /// Records an embed failure. `knowledge_base_id` is left as it was.
    pub fn mark_embed_failed(&mut self, error: &str) {
        self.is_embedded = false;
        self.embedding_progress = None;
        self.status = FileStatus::Failed;
        self.failed_stage = Some(FailedStage::Embed);
        self.error = Some(error.to_string());
        self.touch();
    }

    /// Drops embed state after the knowledge base it pointed at was reset or deleted.
    pub fn clear_embedding(&mut self) {
        self.is_embedded = false;
        self.embedding_progress = None;
        self.knowledge_base_id = None;
        self.doc_id = None;
        self.touch();
    }

    /// Repairs embed and failure fields of a record read from the backend.
    ///
    /// An embedded record with a knowledge base id is complete; one without
    /// an id is not embedded. An upload failure keeps no content.
    pub fn normalize_listed(&mut self) {
        if self.is_embedded {
            match self.knowledge_base_id.as_deref() {
                Some(id) if !id.is_empty() => self.embedding_progress = Some(EMBED_COMPLETE),
                _ => {
                    self.is_embedded = false;
                    self.embedding_progress = None;
                }
            }
        }
        if self.failed_stage == Some(FailedStage::Upload) {
            self.original_content.clear();
            self.translated_content.clear();
        }
    }

    /// Copies the embed result of `other` onto this record when this copy
    /// carries none. Returns whether anything was copied.
    pub fn adopt_embedding(&mut self, other: &FileRecord) -> bool {
        if self.is_embedded
            || !other.is_embedded
            || other.invariant_violation().is_some()
            || self.failure_stage() == Some(FailedStage::Upload)
        {
            return false;
        }
        self.is_embedded = true;
        self.knowledge_base_id = other.knowledge_base_id.clone();
        self.embedding_progress = Some(EMBED_COMPLETE);
        self.doc_id = other.doc_id.clone();
        self.status = FileStatus::Completed;
        self.failed_stage = None;
        self.error = None;
        true
    }

    /// Text sent to the embed operation: translation first, original as fallback.
    pub fn embed_text(&self) -> &str {
        if self.translated_content.is_empty() {
            &self.original_content
        } else {
            &self.translated_content
        }
    }

    /// Resolves which stage a failed record failed in.
    ///
    /// Records coming from the backend may not carry `failed_stage`; an empty
    /// record can only be an upload failure.
    pub fn failure_stage(&self) -> Option<FailedStage> {
        if self.status != FileStatus::Failed {
            return None;
        }
        Some(self.failed_stage.unwrap_or(
            if self.original_content.is_empty() && self.translated_content.is_empty() {
                FailedStage::Upload
            } else {
                FailedStage::Embed
            },
        ))
    }

    /// Returns the first violated record invariant, if any.
    pub fn invariant_violation(&self) -> Option<&'static str> {
        if self.is_embedded {
            match &self.knowledge_base_id {
                None => return Some("embedded record without knowledge base id"),
                Some(id) if id.is_empty() => {
                    return Some("embedded record with empty knowledge base id")
                }
                _ => {}
            }
            if self.embedding_progress != Some(EMBED_COMPLETE) {
                return Some("embedded record with incomplete progress");
            }
        }
        if self.failed_stage == Some(FailedStage::Upload)
            && (!self.original_content.is_empty() || !self.translated_content.is_empty())
        {
            return Some("upload failure retained partial content");
        }
        None
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
