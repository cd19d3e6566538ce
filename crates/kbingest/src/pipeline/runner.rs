use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::backend::{Backend, HttpBackend};
use crate::broadcast::{IngestPhase, IngestProgressBroadcaster, IngestProgressEvent};
use crate::config::Config;
use crate::error::{KbIngestError, RegistryError};
use crate::knowledge_base::{KnowledgeBase, KnowledgeBaseRegistry};
use crate::store::{
    FileRecord, FileStatus, FileStore, JsonFileCache, ReconcileReport, Reconciler, RecordCache,
    StoreCounts, EMBED_COMPLETE,
};

use super::config::PipelineConfig;
use super::embed::EmbedStage;
use super::error::{PipelineError, StageError};
use super::job::RawFile;
use super::lifecycle::FileState;
use super::progress::EmbedObserver;
use super::upload::UploadStage;

/// Result of [`Pipeline::initialize`].
#[derive(Debug, Default)]
pub struct InitReport {
    pub reconcile: ReconcileReport,
    /// Records left mid-request by a previous session, now marked failed.
    pub recovered: Vec<String>,
    /// Set when the knowledge base list could not be loaded.
    pub knowledge_base_error: Option<RegistryError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub id: String,
    pub name: String,
    pub error: String,
}

/// Per-file outcome of an embed batch. A batch never fails as a whole
/// because some of its files did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedReport {
    pub knowledge_base_id: String,
    pub embedded: Vec<String>,
    pub failed: Vec<FileFailure>,
}

impl EmbedReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives files through upload and embed, and owns every store write
/// outside of reconciliation.
///
/// Each file request runs in its own spawned task that writes its outcome
/// to the store, so dropping a batch future does not lose results.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    backend: Arc<dyn Backend>,
    store: Arc<FileStore>,
    registry: Arc<KnowledgeBaseRegistry>,
    progress: IngestProgressBroadcaster,
    upload_stage: Arc<UploadStage>,
    embed_stage: Arc<EmbedStage>,
    upload_permits: Arc<Semaphore>,
    embed_permits: Arc<Semaphore>,
}

impl Pipeline {
    /// Production constructor: HTTP backend and JSON file cache from config.
    pub fn from_config(config: &Config) -> Result<Self, KbIngestError> {
        let backend = Arc::new(HttpBackend::new(&config.backend)?);
        let cache = Arc::new(JsonFileCache::new(config.cache.resolved_path()));
        Ok(Self::new(PipelineConfig::from_config(config), backend, cache))
    }

    pub fn new(
        config: PipelineConfig,
        backend: Arc<dyn Backend>,
        cache: Arc<dyn RecordCache>,
    ) -> Self {
        let store = Arc::new(FileStore::new(cache));
        let registry = Arc::new(KnowledgeBaseRegistry::new(Arc::clone(&backend)));

        Self {
            progress: IngestProgressBroadcaster::new(config.event_capacity),
            upload_stage: Arc::new(UploadStage::new(Arc::clone(&backend))),
            embed_stage: Arc::new(EmbedStage::new(Arc::clone(&backend))),
            upload_permits: Arc::new(Semaphore::new(config.upload_concurrency.max(1))),
            embed_permits: Arc::new(Semaphore::new(config.embed_concurrency.max(1))),
            config: Arc::new(config),
            backend,
            store,
            registry,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<KnowledgeBaseRegistry> {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IngestProgressEvent> {
        self.progress.subscribe()
    }

    pub fn records(&self) -> Vec<FileRecord> {
        self.store.all()
    }

    pub fn record(&self, id: &str) -> Option<FileRecord> {
        self.store.get(id)
    }

    pub fn counts(&self) -> StoreCounts {
        self.store.counts()
    }

    /// Loads cached and backend state. Call once, before submitting work:
    /// records still marked in flight afterwards belong to a previous session
    /// and are marked failed.
    pub async fn initialize(&self) -> InitReport {
        let span = info_span!("initialize");
        async {
            let reconciler = Reconciler::new(Arc::clone(&self.store), Arc::clone(&self.backend));
            let (reconcile, knowledge_bases) =
                tokio::join!(reconciler.run(), self.registry.refresh());

            let knowledge_base_error = match knowledge_bases {
                Ok(bases) => {
                    info!(count = bases.len(), "Loaded knowledge bases");
                    None
                }
                Err(e) => {
                    warn!("Knowledge base list unavailable, using default only: {}", e);
                    Some(e)
                }
            };

            let recovered = self.recover_interrupted();

            InitReport {
                reconcile,
                recovered,
                knowledge_base_error,
            }
        }
        .instrument(span)
        .await
    }

    fn recover_interrupted(&self) -> Vec<String> {
        let recovered = self.store.update_where(
            |record| FileState::of(record).is_in_flight(),
            |record| match FileState::of(record) {
                FileState::Submitted => record.mark_upload_failed("Upload was interrupted"),
                _ => record.mark_embed_failed("Embed was interrupted"),
            },
        );
        if !recovered.is_empty() {
            warn!(count = recovered.len(), "Marked interrupted files as failed");
        }
        recovered
    }

    /// Runs the upload stage for a batch.
    ///
    /// Placeholders are appended in submission order before any request is
    /// made. Returns the settled records in the same order. Fails without
    /// change if an id is already known or repeated in the batch.
    pub async fn upload(&self, files: Vec<RawFile>) -> Result<Vec<FileRecord>, PipelineError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = files
            .iter()
            .map(|f| FileRecord::pending(&f.id, &f.name, f.need_translation))
            .collect();
        self.store.append_all(placeholders)?;

        let batch = info_span!("upload_batch", files = files.len());
        let ids: Vec<String> = files.iter().map(|f| f.id.clone()).collect();
        let handles: Vec<(String, JoinHandle<()>)> = files
            .into_iter()
            .map(|file| (file.id.clone(), self.spawn_upload(file, &batch)))
            .collect();

        async {
            for (id, handle) in handles {
                if let Err(e) = handle.await {
                    warn!("Upload task for {} did not finish: {}", id, e);
                    let error = StageError::Aborted(e.to_string()).to_string();
                    let _ = self.store.update(&id, |record| {
                        if record.status == FileStatus::Pending {
                            record.mark_upload_failed(&error);
                        }
                    });
                }
            }
        }
        .instrument(batch)
        .await;

        Ok(ids.iter().filter_map(|id| self.store.get(id)).collect())
    }

    fn spawn_upload(&self, file: RawFile, batch: &Span) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let stage = Arc::clone(&self.upload_stage);
        let permits = Arc::clone(&self.upload_permits);
        let tracker = self.progress.start_file(&file.id, &file.name);
        let span = info_span!(parent: batch, "upload_file", file_id = %file.id, filename = %file.name);

        tokio::spawn(
            async move {
                let _permit = permits.acquire_owned().await.ok();

                let phase = if file.need_translation {
                    IngestPhase::Translating
                } else {
                    IngestPhase::Uploading
                };
                tracker.update_phase(phase, &phase.to_string());

                let outcome = stage.extract(&file).await;
                if let Err(e) = store.update(&file.id, |record| UploadStage::apply(record, &outcome))
                {
                    warn!("Dropping upload result for {}: {}", file.id, e);
                    return;
                }

                match &outcome {
                    Ok(_) => {
                        debug!("Uploaded {}", file.name);
                        tracker.update_phase(IngestPhase::Uploaded, "Text extracted");
                    }
                    Err(e) => {
                        warn!("Upload of {} failed: {}", file.name, e);
                        tracker.failed(IngestPhase::UploadFailed, &e.to_string());
                    }
                }
            }
            .instrument(span),
        )
    }

    /// Embeds records into `knowledge_base_id`.
    ///
    /// Every id is checked before any request: unknown ids and records that
    /// are still uploading, already embedding or failed upload reject the
    /// whole batch without change. Repeated ids are embedded once.
    pub async fn embed(
        &self,
        ids: &[String],
        knowledge_base_id: &str,
        observer: Option<Arc<dyn EmbedObserver>>,
    ) -> Result<EmbedReport, PipelineError> {
        let target = knowledge_base_id.trim();
        if target.is_empty() {
            return Err(PipelineError::InvalidTarget(
                "knowledge base id is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let ids: Vec<String> = ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let started = self.store.update_batch(
            &ids,
            |record| {
                let state = FileState::of(record);
                if state.can_embed() {
                    Ok(())
                } else {
                    Err(PipelineError::IllegalTransition {
                        id: record.id.clone(),
                        state,
                        action: "embed",
                    })
                }
            },
            FileRecord::mark_embedding,
        )?;

        let batch = info_span!("embed_batch", knowledge_base_id = %target, files = started.len());
        let handles: Vec<_> = started
            .into_iter()
            .map(|record| {
                let id = record.id.clone();
                let name = record.name.clone();
                let handle = self.spawn_embed(record, target, observer.clone(), &batch);
                (id, name, handle)
            })
            .collect();

        let mut report = EmbedReport {
            knowledge_base_id: target.to_string(),
            ..Default::default()
        };

        async {
            for (id, name, handle) in handles {
                let error = match handle.await {
                    Ok(Ok(())) => {
                        report.embedded.push(id);
                        continue;
                    }
                    Ok(Err(message)) => message,
                    Err(e) => {
                        warn!("Embed task for {} did not finish: {}", id, e);
                        let message = StageError::Aborted(e.to_string()).to_string();
                        let _ = self.store.update(&id, |record| {
                            if FileState::of(record) == FileState::Embedding {
                                record.mark_embed_failed(&message);
                            }
                        });
                        message
                    }
                };
                report.failed.push(FileFailure { id, name, error });
            }

            info!(
                embedded = report.embedded.len(),
                failed = report.failed.len(),
                "Embed batch finished"
            );
        }
        .instrument(batch)
        .await;

        Ok(report)
    }

    /// Embeds into the knowledge base selected at the time of the call.
    pub async fn embed_into_current(
        &self,
        ids: &[String],
        observer: Option<Arc<dyn EmbedObserver>>,
    ) -> Result<EmbedReport, PipelineError> {
        let target = self.registry.current_id();
        self.embed(ids, &target, observer).await
    }

    fn spawn_embed(
        &self,
        record: FileRecord,
        target: &str,
        observer: Option<Arc<dyn EmbedObserver>>,
        batch: &Span,
    ) -> JoinHandle<Result<(), String>> {
        let store = Arc::clone(&self.store);
        let stage = Arc::clone(&self.embed_stage);
        let permits = Arc::clone(&self.embed_permits);
        let tracker = self.progress.track(&record.id, &record.name);
        let target = target.to_string();
        let span = info_span!(parent: batch, "embed_file", file_id = %record.id, filename = %record.name);

        tokio::spawn(
            async move {
                let _permit = permits.acquire_owned().await.ok();

                tracker.embed_progress(IngestPhase::Embedding, &target, 0);
                if let Some(observer) = &observer {
                    observer.on_progress(&record.id, 0);
                }

                let outcome = stage.submit(&record, &target).await;
                if let Err(e) =
                    store.update(&record.id, |r| EmbedStage::apply(r, &target, &outcome))
                {
                    warn!("Dropping embed result for {}: {}", record.id, e);
                }

                match outcome {
                    Ok(_) => {
                        debug!("Embedded {} into {}", record.name, target);
                        tracker.embed_progress(IngestPhase::Embedded, &target, EMBED_COMPLETE);
                        if let Some(observer) = &observer {
                            observer.on_progress(&record.id, EMBED_COMPLETE);
                        }
                        Ok(())
                    }
                    Err(e) => {
                        let message = e.to_string();
                        warn!("Embed of {} into {} failed: {}", record.name, target, message);
                        tracker.failed(IngestPhase::EmbedFailed, &message);
                        if let Some(observer) = &observer {
                            observer.on_failed(&record.id, &message);
                        }
                        Err(message)
                    }
                }
            }
            .instrument(span),
        )
    }

    /// Deletes a file on the backend, then locally. A backend failure leaves
    /// the record in place. A 404 means the backend never had the file.
    pub async fn delete_file(&self, id: &str) -> Result<FileRecord, PipelineError> {
        let record = self
            .store
            .get(id)
            .ok_or_else(|| PipelineError::UnknownRecord(id.to_string()))?;

        let state = FileState::of(&record);
        if state.is_in_flight() {
            return Err(PipelineError::IllegalTransition {
                id: id.to_string(),
                state,
                action: "delete",
            });
        }

        match self.backend.delete_file(id).await {
            Ok(()) => {}
            Err(e) if e.status() == Some(404) => {
                debug!("Backend has no copy of {}, removing locally", id);
            }
            Err(e) => return Err(e.into()),
        }

        let removed = self.store.remove(id)?;
        self.progress
            .track(id, &removed.name)
            .update_phase(IngestPhase::Deleted, "File deleted");
        info!("Deleted file {} ({})", removed.name, id);
        Ok(removed)
    }

    pub fn knowledge_bases(&self) -> Vec<KnowledgeBase> {
        self.registry.list()
    }

    pub fn current_knowledge_base(&self) -> KnowledgeBase {
        self.registry.current()
    }

    pub async fn refresh_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>, PipelineError> {
        Ok(self.registry.refresh().await?)
    }

    pub async fn create_knowledge_base(
        &self,
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBase, PipelineError> {
        Ok(self.registry.create(name, description).await?)
    }

    pub fn switch_knowledge_base(&self, id: &str) -> bool {
        self.registry.switch_current(id)
    }

    /// Resets a knowledge base and marks its records not embedded.
    /// Returns the ids of the records that were cleared.
    pub async fn reset_knowledge_base(&self, id: &str) -> Result<Vec<String>, PipelineError> {
        self.registry.reset(id).await?;
        Ok(self.clear_embeddings_for(id))
    }

    /// Deletes a knowledge base and marks its records not embedded.
    /// Returns the ids of the records that were cleared.
    pub async fn delete_knowledge_base(&self, id: &str) -> Result<Vec<String>, PipelineError> {
        self.registry.delete(id).await?;
        Ok(self.clear_embeddings_for(id))
    }

    fn clear_embeddings_for(&self, knowledge_base_id: &str) -> Vec<String> {
        // in-flight embeds write their own outcome when they land
        let cleared = self.store.update_where(
            |record| {
                record.knowledge_base_id.as_deref() == Some(knowledge_base_id)
                    && FileState::of(record) != FileState::Embedding
            },
            FileRecord::clear_embedding,
        );
        if !cleared.is_empty() {
            info!(
                count = cleared.len(),
                "Cleared embeddings for knowledge base '{}'", knowledge_base_id
            );
        }
        cleared
    }
}
