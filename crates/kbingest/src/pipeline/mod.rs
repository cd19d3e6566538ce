//! The ingestion pipeline: upload/translate and embed stages driven by the
//! coordinator in [`runner`].

pub mod config;
pub mod embed;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod progress;
pub mod runner;
pub mod upload;

pub use config::PipelineConfig;
pub use embed::EmbedStage;
pub use error::{PipelineError, StageError};
pub use job::RawFile;
pub use lifecycle::FileState;
pub use progress::{EmbedObserver, NoopObserver};
pub use runner::{EmbedReport, FileFailure, InitReport, Pipeline};
pub use upload::{ExtractedText, UploadStage};
