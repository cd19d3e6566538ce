//! Subscriber setup for binaries embedding the pipeline.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "kbingest=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to bridge log records: {0}")]
    LogBridge(#[from] log::SetLoggerError),

    #[error("A global tracing subscriber is already set: {0}")]
    AlreadySet(#[from] tracing::subscriber::SetGlobalDefaultError),
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Installs the global subscriber. `log` records from the store and config
/// code are forwarded into `tracing`.
///
/// `RUST_LOG` overrides `default_directive`.
pub fn init(format: LogFormat, default_directive: &str) -> Result<(), LoggingError> {
    tracing_log::LogTracer::init()?;

    let filter = env_filter(default_directive);
    match format {
        LogFormat::Pretty => {
            let subscriber = Registry::default()
                .with(filter)
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = Registry::default().with(filter).with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}
