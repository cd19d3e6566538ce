use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KbIngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Knowledge base error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Failures talking to the ingestion backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Network failure or timeout. The request may be retried as-is.
    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    /// The backend answered with a non-success status.
    #[error("Backend rejected {endpoint} ({status}): {message}")]
    Rejection {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The backend answered 2xx but the body did not have the expected shape.
    #[error("Unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl BackendError {
    /// Returns true if retrying the same request may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BackendError::Transport { .. })
    }

    /// HTTP status for rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Rejection { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to read record cache '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write record cache '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Record cache is corrupted: {0}")]
    Corrupt(String),

    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Store misuse. These indicate a caller bug, not a runtime condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No file record with id '{0}'")]
    UnknownRecord(String),

    #[error("A file record with id '{0}' already exists")]
    DuplicateId(String),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("The default knowledge base cannot be deleted")]
    ProtectedDefault,

    #[error("Invalid knowledge base name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type Result<T> = std::result::Result<T, KbIngestError>;
