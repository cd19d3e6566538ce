use std::path::Path;

use crate::backend::UploadFile;

/// A raw file submitted for ingestion.
#[derive(Debug, Clone)]
pub struct RawFile {
    /// Client-chosen record id.
    pub id: String,
    pub name: String,
    pub bytes: Vec<u8>,
    pub need_translation: bool,
    /// MIME type of the file (e.g., "application/pdf", "text/plain").
    pub mime_type: Option<String>,
}

impl RawFile {
    /// Creates a file with a fresh UUID v4 id and a MIME type guessed from `name`.
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            bytes,
            need_translation: false,
            mime_type: Self::detect_mime_type(Path::new(name)),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_translation(mut self, need_translation: bool) -> Self {
        self.need_translation = need_translation;
        self
    }

    pub fn with_mime_type(mut self, mime_type: Option<String>) -> Self {
        self.mime_type = mime_type;
        self
    }

    /// Reads a file from disk. The record name is the file name.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(&name, bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn to_upload(&self) -> UploadFile {
        UploadFile {
            name: self.name.clone(),
            bytes: self.bytes.clone(),
            mime_type: self.mime_type.clone(),
        }
    }

    /// Detects MIME type from file path using the mime_guess crate.
    fn detect_mime_type(path: &Path) -> Option<String> {
        mime_guess::from_path(path).first().map(|m| m.to_string())
    }
}
