//! Scripted in-memory backend for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::error::BackendError;
use crate::knowledge_base::{KnowledgeBase, DEFAULT_KNOWLEDGE_BASE_ID};
use crate::store::FileRecord;

use super::types::{EmbedAck, EmbedRequest, TranslatedText, UploadFile, UploadedText};
use super::Backend;

#[derive(Default)]
struct FakeState {
    knowledge_bases: Vec<KnowledgeBase>,
    files: Vec<FileRecord>,
    fail_uploads: HashSet<String>,
    fail_embeds: HashSet<String>,
    fail_deletes: HashSet<String>,
    fail_list_files: bool,
    fail_knowledge_base_ops: bool,
    embed_requests: Vec<EmbedRequest>,
    calls: HashMap<&'static str, usize>,
    next_kb: usize,
}

/// Backend double. Failures are scripted per file name.
pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
    gate: Option<Semaphore>,
}

fn rejection(endpoint: &str, message: &str) -> BackendError {
    BackendError::Rejection {
        endpoint: endpoint.to_string(),
        status: 500,
        message: message.to_string(),
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        let state = FakeState {
            knowledge_bases: vec![KnowledgeBase::default_base()],
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            gate: None,
        }
    }

    /// Upload and embed calls wait for a permit from [`FakeBackend::release`].
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record_call(&self, name: &'static str) {
        *self.lock().calls.entry(name).or_insert(0) += 1;
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    pub fn fail_upload_of(&self, name: &str) {
        self.lock().fail_uploads.insert(name.to_string());
    }

    pub fn fail_embed_of(&self, name: &str) {
        self.lock().fail_embeds.insert(name.to_string());
    }

    pub fn fail_delete_of(&self, id: &str) {
        self.lock().fail_deletes.insert(id.to_string());
    }

    pub fn fail_list_files(&self) {
        self.lock().fail_list_files = true;
    }

    pub fn fail_knowledge_base_ops(&self) {
        self.lock().fail_knowledge_base_ops = true;
    }

    pub fn with_knowledge_base(self, id: &str, name: &str) -> Self {
        self.lock().knowledge_bases.push(KnowledgeBase {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
        });
        self
    }

    pub fn with_files(self, files: Vec<FileRecord>) -> Self {
        self.lock().files = files;
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.lock().calls.get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    pub fn embed_requests(&self) -> Vec<EmbedRequest> {
        self.lock().embed_requests.clone()
    }

    fn extract(&self, file: &UploadFile) -> Result<String, BackendError> {
        if self.lock().fail_uploads.contains(&file.name) {
            return Err(rejection("upload", "extraction failed"));
        }
        Ok(String::from_utf8_lossy(&file.bytes).into_owned())
    }

    fn knowledge_base_guard(&self, endpoint: &str) -> Result<(), BackendError> {
        if self.lock().fail_knowledge_base_ops {
            return Err(BackendError::Transport {
                endpoint: endpoint.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn upload(&self, file: UploadFile) -> Result<UploadedText, BackendError> {
        self.record_call("upload");
        self.wait_gate().await;
        let content = self.extract(&file)?;
        Ok(UploadedText { content })
    }

    async fn upload_and_translate(
        &self,
        file: UploadFile,
    ) -> Result<TranslatedText, BackendError> {
        self.record_call("upload_and_translate");
        self.wait_gate().await;
        let content = self.extract(&file)?;
        Ok(TranslatedText {
            translated_content: format!("[translated] {}", content),
            content,
        })
    }

    async fn embed(&self, request: EmbedRequest) -> Result<EmbedAck, BackendError> {
        self.record_call("embed");
        self.wait_gate().await;

        let mut state = self.lock();
        state.embed_requests.push(request.clone());
        if state.fail_embeds.contains(&request.filename) {
            return Err(rejection("embed", "embedding service unavailable"));
        }
        let known = state
            .knowledge_bases
            .iter()
            .any(|kb| kb.id == request.knowledge_base_id);
        if !known {
            return Err(BackendError::Rejection {
                endpoint: "embed".to_string(),
                status: 404,
                message: "knowledge base not found".to_string(),
            });
        }
        let doc = state.embed_requests.len();
        Ok(EmbedAck {
            success: true,
            doc_id: Some(format!("doc-{}", doc)),
        })
    }

    async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>, BackendError> {
        self.record_call("list_knowledge_bases");
        self.knowledge_base_guard("list_knowledge_bases")?;
        Ok(self.lock().knowledge_bases.clone())
    }

    async fn create_knowledge_base(
        &self,
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBase, BackendError> {
        self.record_call("create_knowledge_base");
        self.knowledge_base_guard("create_knowledge_base")?;

        let mut state = self.lock();
        state.next_kb += 1;
        let kb = KnowledgeBase {
            id: format!("kb-{}", state.next_kb),
            name: name.to_string(),
            description: description.to_string(),
        };
        state.knowledge_bases.push(kb.clone());
        Ok(kb)
    }

    async fn delete_knowledge_base(&self, id: &str) -> Result<(), BackendError> {
        self.record_call("delete_knowledge_base");
        self.knowledge_base_guard("delete_knowledge_base")?;
        if id == DEFAULT_KNOWLEDGE_BASE_ID {
            return Err(rejection("delete_knowledge_base", "cannot delete default"));
        }
        self.lock().knowledge_bases.retain(|kb| kb.id != id);
        Ok(())
    }

    async fn reset_knowledge_base(&self, _id: &str) -> Result<(), BackendError> {
        self.record_call("reset_knowledge_base");
        self.knowledge_base_guard("reset_knowledge_base")
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, BackendError> {
        self.record_call("list_files");
        let state = self.lock();
        if state.fail_list_files {
            return Err(BackendError::Transport {
                endpoint: "list_files".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(state.files.clone())
    }

    async fn delete_file(&self, id: &str) -> Result<(), BackendError> {
        self.record_call("delete_file");
        let mut state = self.lock();
        if state.fail_deletes.contains(id) {
            return Err(rejection("delete_file", "delete failed"));
        }
        state.files.retain(|f| f.id != id);
        Ok(())
    }
}
