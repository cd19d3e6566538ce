use crate::config::Config;

/// Runtime limits of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub upload_concurrency: usize,
    pub embed_concurrency: usize,
    pub event_capacity: usize,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            upload_concurrency: config.pipeline.upload_concurrency.max(1),
            embed_concurrency: config.pipeline.embed_concurrency.max(1),
            event_capacity: config.pipeline.event_capacity.max(1),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
