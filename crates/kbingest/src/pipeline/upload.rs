//! Upload/translate stage: raw file in, text out.

use std::sync::Arc;

use tracing::debug;

use crate::backend::Backend;
use crate::store::FileRecord;

use super::error::StageError;
use super::job::RawFile;

/// Text produced by the upload stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub original: String,
    /// `None` when no translation was requested.
    pub translated: Option<String>,
}

pub struct UploadStage {
    backend: Arc<dyn Backend>,
}

impl UploadStage {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Extracts (and optionally translates) the file's text. An empty file
    /// fails without a request.
    pub async fn extract(&self, file: &RawFile) -> Result<ExtractedText, StageError> {
        if file.is_empty() {
            return Err(StageError::EmptyFile);
        }

        if file.need_translation {
            debug!("Uploading {} for translation", file.name);
            let response = self.backend.upload_and_translate(file.to_upload()).await?;
            Ok(ExtractedText {
                original: response.content,
                translated: Some(response.translated_content),
            })
        } else {
            debug!("Uploading {}", file.name);
            let response = self.backend.upload(file.to_upload()).await?;
            Ok(ExtractedText {
                original: response.content,
                translated: None,
            })
        }
    }

    /// Writes a stage outcome onto the file's record.
    pub fn apply(record: &mut FileRecord, outcome: &Result<ExtractedText, StageError>) {
        match outcome {
            Ok(text) => record.mark_uploaded(text.original.clone(), text.translated.clone()),
            Err(e) => record.mark_upload_failed(&e.to_string()),
        }
    }
}
