//! Configuration structures for the storage engine.
//!
//! This module provides TOML-based configuration. The configuration system
//! supports:
//! - Bundled defaults (include_str! from larder.toml)
//! - User overrides (./larder.toml or ~/.config/larder/larder.toml)
//! - Environment overrides (`LARDER__STORAGE__PUBLIC_PATH=/files`)

use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use larder_error::{ConfigError, LarderError, LarderResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Namespace layout of the engine.
///
/// # Example
///
/// ```toml
/// [storage]
/// web_root = "/srv/www"
/// public_path = "/public"
/// tmp_path = "/upload"
/// prefix = "/app"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_builder::Builder)]
#[builder(setter(into), default)]
pub struct StorageConfig {
    /// Directory every reference is resolved against
    #[serde(default = "default_web_root")]
    web_root: PathBuf,

    /// Path of the cached public files, relative to the web root
    #[serde(default = "default_public_path")]
    public_path: String,

    /// Path of staged uploads, relative to the web root
    #[serde(default = "default_tmp_path")]
    tmp_path: String,

    /// Mount prefix prepended to every generated reference
    #[serde(default)]
    prefix: String,
}

fn default_web_root() -> PathBuf {
    PathBuf::from("./web")
}

fn default_public_path() -> String {
    "/public".to_string()
}

fn default_tmp_path() -> String {
    "/upload".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            web_root: default_web_root(),
            public_path: default_public_path(),
            tmp_path: default_tmp_path(),
            prefix: String::new(),
        }
    }
}

impl StorageConfig {
    /// Check the namespace layout for values that would make references ambiguous.
    pub fn validate(&self) -> LarderResult<()> {
        for (key, value) in [("public_path", &self.public_path), ("tmp_path", &self.tmp_path)] {
            if !value.starts_with('/') || value.ends_with('/') || value.len() < 2 {
                return Err(ConfigError::new(format!(
                    "{} must start with '/' and must not end with '/': '{}'",
                    key, value
                ))
                .into());
            }
        }

        let public = format!("{}/", self.public_path);
        let tmp = format!("{}/", self.tmp_path);
        if public.starts_with(&tmp) || tmp.starts_with(&public) {
            return Err(ConfigError::new(format!(
                "public_path '{}' and tmp_path '{}' must not overlap",
                self.public_path, self.tmp_path
            ))
            .into());
        }

        if !self.prefix.is_empty() && (!self.prefix.starts_with('/') || self.prefix.ends_with('/'))
        {
            return Err(ConfigError::new(format!(
                "prefix must be empty or start with '/' without a trailing '/': '{}'",
                self.prefix
            ))
            .into());
        }

        Ok(())
    }
}

/// Which content backend to build.
///
/// ```toml
/// [backend]
/// kind = "filesystem"
/// path = "/var/larder/contents"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// One file per blob under `path`
    Filesystem {
        /// Base directory of the backend
        path: PathBuf,
    },
    /// Process-local map; contents vanish on restart
    Memory,
    /// Blob column in PostgreSQL (requires the `database` feature)
    Postgres {
        /// Connection string; falls back to `DATABASE_URL`
        #[serde(default)]
        database_url: Option<String>,
        /// Maximum pooled connections
        #[serde(default = "default_pool_size")]
        pool_size: u32,
    },
}

fn default_pool_size() -> u32 {
    8
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Filesystem {
            path: PathBuf::from("./data/contents"),
        }
    }
}

/// Backoff policy for [`crate::RetryingContent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_builder::Builder)]
#[builder(default)]
pub struct RetryConfig {
    /// Delay before the first retry
    #[serde(default = "default_initial_backoff_ms")]
    initial_backoff_ms: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    max_retries: usize,

    /// Upper bound on any single delay
    #[serde(default = "default_max_delay_secs")]
    max_delay_secs: u64,
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_retries() -> usize {
    3
}

fn default_max_delay_secs() -> u64 {
    5
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_retries: default_max_retries(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

/// Settings for the HTTP adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_builder::Builder)]
#[builder(setter(into), default)]
pub struct ServerSettings {
    /// Listen address
    #[serde(default = "default_bind")]
    bind: String,

    /// Multipart field the upload endpoint reads
    #[serde(default = "default_upload_field")]
    upload_field: String,

    /// Accepted MIME types; empty accepts anything
    #[serde(default)]
    allowed_types: Vec<String>,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_upload_field() -> String {
    "file".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            upload_field: default_upload_field(),
            allowed_types: Vec::new(),
        }
    }
}

/// Top-level larder configuration.
///
/// # Example
///
/// ```no_run
/// use larder_storage::LarderConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = LarderConfig::load()?;
/// println!("Public files under {}", config.storage().public_path());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Getters)]
pub struct LarderConfig {
    /// Namespace layout
    #[serde(default)]
    storage: StorageConfig,

    /// Content backend selection
    #[serde(default)]
    backend: BackendConfig,

    /// Optional retry policy for the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retry: Option<RetryConfig>,

    /// HTTP adapter settings
    #[serde(default)]
    server: ServerSettings,
}

impl LarderConfig {
    /// Assemble a configuration from its sections.
    pub fn new(
        storage: StorageConfig,
        backend: BackendConfig,
        retry: Option<RetryConfig>,
        server: ServerSettings,
    ) -> Self {
        Self {
            storage,
            backend,
            retry,
            server,
        }
    }

    /// Load configuration from a specific file path.
    ///
    /// Sections missing from the file take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> LarderResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                LarderError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                LarderError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.storage.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: environment > user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override earlier):
    /// 1. Bundled defaults (larder.toml shipped with the crate)
    /// 2. User config in home directory (~/.config/larder/larder.toml)
    /// 3. User config in current directory (./larder.toml)
    /// 4. Environment variables (`LARDER__SECTION__KEY`)
    ///
    /// User config files are optional and will be silently skipped if not found.
    #[instrument]
    pub fn load() -> LarderResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        // Bundled default configuration
        const DEFAULT_CONFIG: &str = include_str!("../larder.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/larder/larder.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("larder").required(false))
            .add_source(Environment::with_prefix("LARDER").separator("__"));

        let config: Self = builder
            .build()
            .map_err(|e| {
                LarderError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                LarderError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.storage.validate()?;
        Ok(config)
    }
}
