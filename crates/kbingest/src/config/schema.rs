use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::store::default_cache_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            backend: BackendConfig::default(),
            cache: CacheConfig::default(),
            pipeline: PipelineSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Upper bound for a whole request, including translation on the server.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Record cache file. Defaults to the platform's local data directory.
    #[serde(default)]
    pub path: Option<String>,
}

impl CacheConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => PathBuf::from(path),
            None => default_cache_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,
    #[serde(default = "default_embed_concurrency")]
    pub embed_concurrency: usize,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_upload_concurrency() -> usize {
    4
}

fn default_embed_concurrency() -> usize {
    4
}

fn default_event_capacity() -> usize {
    100
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            upload_concurrency: default_upload_concurrency(),
            embed_concurrency: default_embed_concurrency(),
            event_capacity: default_event_capacity(),
        }
    }
}
