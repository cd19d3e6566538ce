//! Test harness for isolated pipeline runs against a mock backend.
//!
//! Each `TestHarness` owns a mockito server standing in for the ingestion
//! backend and a temporary directory holding the record cache, so pipelines
//! built from it share nothing with other tests.

#![allow(dead_code)]

use std::path::PathBuf;

use mockito::{Matcher, Mock, ServerGuard};
use tempfile::TempDir;

use kbingest::config::{BackendConfig, CacheConfig, Config, PipelineSettings};
use kbingest::{FileRecord, JsonFileCache, Pipeline, RecordCache};

use super::builders::knowledge_bases_json;

pub struct TestHarness {
    temp_dir: TempDir,
    /// Mock backend.
    pub server: ServerGuard,
    /// Record cache used by pipelines built from this harness.
    pub cache_path: PathBuf,
}

impl TestHarness {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache_path = temp_dir.path().join("cache").join("records.json");
        let server = mockito::Server::new_async().await;

        Self {
            temp_dir,
            server,
            cache_path,
        }
    }

    pub fn config(&self) -> Config {
        Config {
            version: "1.0".to_string(),
            backend: BackendConfig {
                base_url: self.server.url(),
                connect_timeout_secs: 2,
                request_timeout_secs: 10,
            },
            cache: CacheConfig {
                path: Some(self.cache_path.to_string_lossy().into_owned()),
            },
            pipeline: PipelineSettings::default(),
        }
    }

    /// Builds a pipeline talking to the mock server.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::from_config(&self.config()).expect("Failed to create pipeline")
    }

    /// Mocks the startup listings: the given files and knowledge bases.
    pub async fn mock_startup(
        &mut self,
        files: serde_json::Value,
        knowledge_bases: &[(&str, &str)],
    ) -> (Mock, Mock) {
        let files_mock = self
            .server
            .mock("GET", "/api/translations")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(files.to_string())
            .create_async()
            .await;
        let kb_mock = self
            .server
            .mock("GET", "/api/knowledge_bases")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(knowledge_bases_json(knowledge_bases).to_string())
            .create_async()
            .await;
        (files_mock, kb_mock)
    }

    /// Mocks a successful embed of `filename`.
    pub async fn mock_embed_ok(&mut self, filename: &str, knowledge_base_id: &str) -> Mock {
        self.server
            .mock("POST", "/api/embed")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "filename": filename,
                "knowledge_base_id": knowledge_base_id,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({"success": true, "doc_id": format!("doc-{}", filename)})
                    .to_string(),
            )
            .create_async()
            .await
    }

    /// Mocks a rejected embed of `filename`.
    pub async fn mock_embed_rejected(&mut self, filename: &str, status: usize, detail: &str) -> Mock {
        self.server
            .mock("POST", "/api/embed")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "filename": filename,
            })))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({ "detail": detail }).to_string())
            .create_async()
            .await
    }

    pub fn seed_cache(&self, records: &[FileRecord]) {
        JsonFileCache::new(&self.cache_path)
            .save(records)
            .expect("Failed to seed cache");
    }

    pub fn cached_records(&self) -> Vec<FileRecord> {
        JsonFileCache::new(&self.cache_path)
            .load()
            .expect("Failed to read cache")
    }

    /// Writes a file into the harness directory and returns its path.
    pub fn write_input(&self, name: &str, content: &[u8]) -> PathBuf {
        let dir = self.temp_dir.path().join("inputs");
        std::fs::create_dir_all(&dir).expect("Failed to create input directory");
        let path = dir.join(name);
        std::fs::write(&path, content).expect("Failed to write input file");
        path
    }
}
