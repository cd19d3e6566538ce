//! Table-driven tests for configuration loading and validation.

use kbingest::config::{load_config, load_config_from_str, load_config_or_default, Config};
use kbingest::Pipeline;

/// Represents a single config loading test case.
struct ConfigTestCase {
    /// Test case name for identification.
    name: &'static str,
    /// The config JSON content to test.
    config_json: &'static str,
    /// Whether loading should succeed.
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const JSON_CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "valid_minimal",
        config_json: r#"{ "version": "1.0" }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "version": "1.0",
            "backend": {
                "base_url": "https://kb.example.com/service/",
                "connect_timeout_secs": 3,
                "request_timeout_secs": 600
            },
            "cache": { "path": "/var/lib/kbingest/records.json" },
            "pipeline": {
                "upload_concurrency": 1,
                "embed_concurrency": 16,
                "event_capacity": 1000
            }
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_null_cache_path",
        config_json: r#"{ "version": "1.0", "cache": { "path": null } }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "invalid_version",
        config_json: r#"{ "version": "2.0" }"#,
        should_succeed: false,
        expected_error: Some("Unsupported config version"),
    },
    ConfigTestCase {
        name: "missing_version",
        config_json: r#"{ "backend": { "base_url": "http://localhost:5000" } }"#,
        should_succeed: false,
        expected_error: Some("version"),
    },
    ConfigTestCase {
        name: "unknown_top_level_key",
        config_json: r#"{ "version": "1.0", "baseUrl": "http://localhost:5000" }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "zero_concurrency",
        config_json: r#"{ "version": "1.0", "pipeline": { "embed_concurrency": 0 } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "wrong_timeout_type",
        config_json: r#"{ "version": "1.0", "backend": { "request_timeout_secs": "long" } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unparseable_base_url",
        config_json: r#"{ "version": "1.0", "backend": { "base_url": "not a url" } }"#,
        should_succeed: false,
        expected_error: Some("Invalid backend base_url"),
    },
    ConfigTestCase {
        name: "non_http_base_url",
        config_json: r#"{ "version": "1.0", "backend": { "base_url": "ftp://kb.example.com" } }"#,
        should_succeed: false,
        expected_error: Some("http or https"),
    },
    ConfigTestCase {
        name: "invalid_json",
        config_json: r#"{ invalid json }"#,
        should_succeed: false,
        expected_error: Some("Failed to parse config JSON"),
    },
];

#[test]
fn test_json_config_loading() {
    for test_case in JSON_CONFIG_TESTS {
        let result = load_config_from_str(test_case.config_json);

        if test_case.should_succeed {
            assert!(
                result.is_ok(),
                "Test '{}': Expected success but got error: {:?}",
                test_case.name,
                result.err()
            );
        } else {
            assert!(
                result.is_err(),
                "Test '{}': Expected error but got success",
                test_case.name
            );

            if let Some(expected_error) = test_case.expected_error {
                let error_msg = result.err().unwrap().to_string();
                assert!(
                    error_msg.contains(expected_error),
                    "Test '{}': Expected error containing '{}', got '{}'",
                    test_case.name,
                    expected_error,
                    error_msg
                );
            }
        }
    }
}

#[test]
fn test_config_defaults_applied() {
    let config = load_config_from_str(r#"{ "version": "1.0" }"#).unwrap();
    let defaults = Config::default();

    assert_eq!(config.backend.base_url, defaults.backend.base_url);
    assert_eq!(config.backend.connect_timeout_secs, 10);
    assert_eq!(config.backend.request_timeout_secs, 300);
    assert_eq!(config.pipeline.upload_concurrency, 4);
    assert_eq!(config.pipeline.embed_concurrency, 4);
    assert_eq!(config.pipeline.event_capacity, 100);
    assert!(config.cache.path.is_none());
}

#[test]
fn test_load_config_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{ "version": "1.0", "pipeline": { "upload_concurrency": 2 } }"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.pipeline.upload_concurrency, 2);
}

#[test]
fn test_missing_file_falls_back_only_when_defaulting() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));

    let config = load_config_or_default(&path).unwrap();
    assert_eq!(config.version, "1.0");
}

#[test]
fn test_pipeline_from_loaded_config() {
    let dir = tempfile::TempDir::new().unwrap();
    let cache = dir.path().join("records.json");
    let json = format!(
        r#"{{
            "version": "1.0",
            "cache": {{ "path": {} }},
            "pipeline": {{ "upload_concurrency": 3, "embed_concurrency": 5 }}
        }}"#,
        serde_json::to_string(&cache.to_string_lossy()).unwrap()
    );

    let config = load_config_from_str(&json).unwrap();
    let pipeline = Pipeline::from_config(&config).unwrap();

    assert_eq!(pipeline.config().upload_concurrency, 3);
    assert_eq!(pipeline.config().embed_concurrency, 5);
    assert!(pipeline.records().is_empty());
}
