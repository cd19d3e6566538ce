//! Boundary to the ingestion backend (translation, embedding and
//! knowledge-base storage services).

pub mod http;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::knowledge_base::KnowledgeBase;
use crate::store::FileRecord;

pub use http::HttpBackend;
pub use types::{EmbedAck, EmbedRequest, TranslatedText, UploadFile, UploadedText};

/// Operations the pipeline consumes from the backend.
///
/// Implementations must be cheap to share: the pipeline holds one behind an
/// `Arc` and calls it from concurrent tasks.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Extracts text from a raw file.
    async fn upload(&self, file: UploadFile) -> Result<UploadedText, BackendError>;

    /// Extracts and translates text from a raw file.
    async fn upload_and_translate(&self, file: UploadFile)
        -> Result<TranslatedText, BackendError>;

    /// Indexes text into a knowledge base.
    async fn embed(&self, request: EmbedRequest) -> Result<EmbedAck, BackendError>;

    async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>, BackendError>;

    async fn create_knowledge_base(
        &self,
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBase, BackendError>;

    async fn delete_knowledge_base(&self, id: &str) -> Result<(), BackendError>;

    /// Drops every embedding in a knowledge base, keeping the base itself.
    async fn reset_knowledge_base(&self, id: &str) -> Result<(), BackendError>;

    /// Lists the file records the backend knows about.
    async fn list_files(&self) -> Result<Vec<FileRecord>, BackendError>;

    async fn delete_file(&self, id: &str) -> Result<(), BackendError>;
}
