//! Tests for configuration loading and validation.

use larder_storage::{
    BackendConfig, LarderConfig, LarderErrorKind, RetryConfigBuilder, StorageConfig,
    StorageConfigBuilder,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("larder.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_bundled_defaults_load() {
    let config = LarderConfig::load().unwrap();

    assert_eq!(config.storage().public_path(), "/public");
    assert_eq!(config.storage().tmp_path(), "/upload");
    assert!(matches!(config.backend(), BackendConfig::Filesystem { .. }));
    assert_eq!(config.server().upload_field(), "file");
}

#[test]
fn test_from_file_full() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[storage]
web_root = "/srv/www"
public_path = "/files"
tmp_path = "/incoming"
prefix = "/app"

[backend]
kind = "memory"

[retry]
initial_backoff_ms = 10
max_retries = 5
max_delay_secs = 1

[server]
bind = "0.0.0.0:9000"
upload_field = "attachment"
allowed_types = ["image/png", "image/jpeg"]
"#,
    );

    let config = LarderConfig::from_file(&path).unwrap();

    assert_eq!(config.storage().web_root(), &PathBuf::from("/srv/www"));
    assert_eq!(config.storage().public_path(), "/files");
    assert_eq!(config.storage().tmp_path(), "/incoming");
    assert_eq!(config.storage().prefix(), "/app");
    assert_eq!(config.backend(), &BackendConfig::Memory);

    let retry = config.retry().as_ref().unwrap();
    assert_eq!(*retry.initial_backoff_ms(), 10);
    assert_eq!(*retry.max_retries(), 5);

    assert_eq!(config.server().bind(), "0.0.0.0:9000");
    assert_eq!(config.server().upload_field(), "attachment");
    assert_eq!(config.server().allowed_types().len(), 2);
}

#[test]
fn test_from_file_partial_takes_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[backend]
kind = "filesystem"
path = "/var/larder"
"#,
    );

    let config = LarderConfig::from_file(&path).unwrap();

    assert_eq!(config.storage(), &StorageConfig::default());
    assert_eq!(
        config.backend(),
        &BackendConfig::Filesystem {
            path: PathBuf::from("/var/larder")
        }
    );
    assert!(config.retry().is_none());
    assert!(config.server().allowed_types().is_empty());
}

#[test]
fn test_postgres_backend_parses() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[backend]
kind = "postgres"
database_url = "postgres://localhost/larder"
"#,
    );

    // pool_size takes its default
    let config = LarderConfig::from_file(&path).unwrap();
    assert_eq!(
        config.backend(),
        &BackendConfig::Postgres {
            database_url: Some("postgres://localhost/larder".to_string()),
            pool_size: 8,
        }
    );
}

#[test]
fn test_from_file_rejects_invalid_layout() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[storage]
public_path = "public"
"#,
    );

    let err = LarderConfig::from_file(&path).unwrap_err();
    assert!(matches!(err.kind(), LarderErrorKind::Config(_)));
}

#[test]
fn test_from_file_missing() {
    let dir = TempDir::new().unwrap();
    let err = LarderConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err.kind(), LarderErrorKind::Config(_)));
}

#[test]
fn test_validate() {
    let valid = StorageConfigBuilder::default().prefix("/app").build().unwrap();
    assert!(valid.validate().is_ok());

    let cases = [
        StorageConfigBuilder::default().public_path("/").build().unwrap(),
        StorageConfigBuilder::default().tmp_path("/upload/").build().unwrap(),
        StorageConfigBuilder::default()
            .public_path("/data")
            .tmp_path("/data")
            .build()
            .unwrap(),
        StorageConfigBuilder::default()
            .public_path("/data/public")
            .tmp_path("/data")
            .build()
            .unwrap(),
        StorageConfigBuilder::default().prefix("app").build().unwrap(),
        StorageConfigBuilder::default().prefix("/app/").build().unwrap(),
    ];

    for config in cases {
        assert!(config.validate().is_err(), "accepted {config:?}");
    }

    // Sharing a leading string without sharing a segment is fine
    let siblings = StorageConfigBuilder::default()
        .public_path("/pub")
        .tmp_path("/public")
        .build()
        .unwrap();
    assert!(siblings.validate().is_ok());
}

#[test]
fn test_retry_builder_defaults() {
    let retry = RetryConfigBuilder::default().max_retries(7usize).build().unwrap();
    assert_eq!(*retry.max_retries(), 7);
    assert_eq!(*retry.initial_backoff_ms(), 100);
    assert_eq!(*retry.max_delay_secs(), 5);
}
