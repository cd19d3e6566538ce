pub mod backend;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod knowledge_base;
pub mod logging;
pub mod pipeline;
pub mod store;

pub use backend::{Backend, HttpBackend};
pub use broadcast::{IngestPhase, IngestProgressBroadcaster, IngestProgressEvent};
pub use config::{load_config, load_config_or_default, Config};
pub use error::{
    BackendError, CacheError, ConfigError, KbIngestError, RegistryError, Result, StoreError,
};
pub use knowledge_base::{KnowledgeBase, KnowledgeBaseRegistry, DEFAULT_KNOWLEDGE_BASE_ID};
pub use pipeline::{
    EmbedObserver, EmbedReport, FileState, InitReport, Pipeline, PipelineConfig, PipelineError,
    RawFile,
};
pub use store::{FileRecord, FileStatus, FileStore, JsonFileCache, MemoryCache, RecordCache};
