use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Default config location under the platform's config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kbingest")
        .join("config.json")
}

/// Loads the config at `path`, or the defaults when the file does not exist.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    load_config(path)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let url = reqwest::Url::parse(&config.backend.base_url).map_err(|e| {
        ConfigError::Validation {
            message: format!("Invalid backend base_url '{}': {}", config.backend.base_url, e),
        }
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation {
            message: format!(
                "Backend base_url must use http or https, got '{}'",
                url.scheme()
            ),
        });
    }

    if config.backend.connect_timeout_secs == 0 || config.backend.request_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "Backend timeouts must be at least 1 second".to_string(),
        });
    }

    let pipeline = &config.pipeline;
    if pipeline.upload_concurrency == 0 || pipeline.embed_concurrency == 0 {
        return Err(ConfigError::Validation {
            message: "Pipeline concurrency must be at least 1".to_string(),
        });
    }
    if pipeline.event_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "Pipeline event_capacity must be at least 1".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_valid_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "backend": {
                "base_url": "https://kb.example.com",
                "connect_timeout_secs": 5,
                "request_timeout_secs": 120
            },
            "cache": {
                "path": "/tmp/kbingest/records.json"
            },
            "pipeline": {
                "upload_concurrency": 2,
                "embed_concurrency": 8
            }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.backend.base_url, "https://kb.example.com");
        assert_eq!(config.backend.request_timeout_secs, 120);
        assert_eq!(config.pipeline.upload_concurrency, 2);
        assert_eq!(config.pipeline.embed_concurrency, 8);
        assert_eq!(config.pipeline.event_capacity, 100);
        assert_eq!(
            config.cache.resolved_path(),
            std::path::PathBuf::from("/tmp/kbingest/records.json")
        );
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load_config_from_str(r#"{"version": "1.0"}"#).unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:5000");
        assert_eq!(config.pipeline.upload_concurrency, 4);
        assert!(config.cache.path.is_none());
    }

    #[test]
    fn test_missing_version_fails_schema() {
        let result = load_config_from_str(r#"{"backend": {}}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_zero_concurrency_fails_schema() {
        let result =
            load_config_from_str(r#"{"version": "1.0", "pipeline": {"embed_concurrency": 0}}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_unknown_field_fails_schema() {
        let result = load_config_from_str(r#"{"version": "1.0", "workers": 3}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_unsupported_version() {
        let result = load_config_from_str(r#"{"version": "2.0"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_http_base_url() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "backend": {"base_url": "ftp://example.com"}}"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/kbingest.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));

        let config = load_config_or_default("/nonexistent/kbingest.json").unwrap();
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kbingest.json");
        std::fs::write(&path, r#"{"version": "1.0", "cache": {}}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.version, "1.0");
    }
}
