//! Embed stage: finalized text in, knowledge-base document out.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{Backend, EmbedAck, EmbedRequest};
use crate::store::FileRecord;

use super::error::StageError;

pub struct EmbedStage {
    backend: Arc<dyn Backend>,
}

impl EmbedStage {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Submits the record's text to `knowledge_base_id`. A record without any
    /// text fails without a request.
    pub async fn submit(
        &self,
        record: &FileRecord,
        knowledge_base_id: &str,
    ) -> Result<EmbedAck, StageError> {
        let content = record.embed_text();
        if content.is_empty() {
            return Err(StageError::NoContent);
        }

        debug!("Embedding {} into {}", record.name, knowledge_base_id);
        let ack = self
            .backend
            .embed(EmbedRequest {
                content: content.to_string(),
                filename: record.name.clone(),
                knowledge_base_id: knowledge_base_id.to_string(),
            })
            .await?;
        Ok(ack)
    }

    /// Writes a stage outcome onto the file's record.
    pub fn apply(
        record: &mut FileRecord,
        knowledge_base_id: &str,
        outcome: &Result<EmbedAck, StageError>,
    ) {
        match outcome {
            Ok(ack) => record.mark_embedded(knowledge_base_id, ack.doc_id.clone()),
            Err(e) => record.mark_embed_failed(&e.to_string()),
        }
    }
}
