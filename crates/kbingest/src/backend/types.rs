//! Request and response bodies of the backend API.

use serde::{Deserialize, Serialize};

/// A raw file as sent to the upload endpoints.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Response of `POST /api/upload`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadedText {
    #[serde(default)]
    pub content: String,
}

/// Response of `POST /api/upload_and_translate`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TranslatedText {
    /// Extracted source text. Older backends only return the translation.
    #[serde(default)]
    pub content: String,
    pub translated_content: String,
}

/// Body of `POST /api/embed`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmbedRequest {
    pub content: String,
    pub filename: String,
    pub knowledge_base_id: String,
}

/// Response of `POST /api/embed`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EmbedAck {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub doc_id: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Body of `POST /api/knowledge_base`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateKnowledgeBaseRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
}

/// Error body returned by the backend on rejection.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
