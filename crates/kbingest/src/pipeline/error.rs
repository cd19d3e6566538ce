use thiserror::Error;

use crate::error::{BackendError, RegistryError, StoreError};

use super::lifecycle::FileState;

/// Caller errors and failed explicit operations. Per-file stage failures are
/// recorded on the file instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No file record with id '{0}'")]
    UnknownRecord(String),

    #[error("A file record with id '{0}' already exists")]
    DuplicateId(String),

    #[error("Cannot {action} file '{id}' in state {state}")]
    IllegalTransition {
        id: String,
        state: FileState,
        action: &'static str,
    },

    #[error("Invalid knowledge base target: {0}")]
    InvalidTarget(String),

    #[error("Backend request failed: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownRecord(id) => PipelineError::UnknownRecord(id),
            StoreError::DuplicateId(id) => PipelineError::DuplicateId(id),
        }
    }
}

/// Why a single file failed a stage. Stored as the record's error message.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("File is empty")]
    EmptyFile,

    #[error("No content to embed")]
    NoContent,

    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("Task aborted: {0}")]
    Aborted(String),
}
