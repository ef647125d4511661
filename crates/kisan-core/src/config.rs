//! Configuration module for the Kisan portal client.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "KISAN_API_URL";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for the portal client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Portal server connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the portal REST API, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Transport timeout for a single request, in seconds.
    pub timeout_secs: u64,
}

/// Where the authenticated session is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// A JSON document on disk.
    #[default]
    File,
    /// The OS secret service / keychain.
    Keyring,
    /// Process memory only; the session ends with the process.
    Memory,
}

impl std::fmt::Display for SessionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionBackend::File => write!(f, "file"),
            SessionBackend::Keyring => write!(f, "keyring"),
            SessionBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for SessionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(SessionBackend::File),
            "keyring" => Ok(SessionBackend::Keyring),
            "memory" => Ok(SessionBackend::Memory),
            other => Err(format!(
                "invalid backend '{other}'; valid options: file, keyring, memory"
            )),
        }
    }
}

/// Session persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Storage backend for tokens and the cached profile.
    pub backend: SessionBackend,
    /// Session file used by the `file` backend.
    pub file: PathBuf,
    /// Keyring service name used by the `keyring` backend.
    pub keyring_service: String,
    /// Keyring account name used by the `keyring` backend.
    pub keyring_user: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/kisan/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("kisan")
            .join("config.yaml")
    }

    /// Apply overrides taken from the process environment.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
        self
    }

    /// Set a single value by its dotted key, e.g. `api.base_url`.
    pub fn set_value(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "api.base_url" => self.api.base_url = value.to_string(),
            "api.timeout_secs" => {
                self.api.timeout_secs = value
                    .parse()
                    .with_context(|| format!("{key} expects a number of seconds"))?;
            }
            "session.backend" => {
                self.session.backend = value.parse().map_err(anyhow::Error::msg)?;
            }
            "session.file" => self.session.file = PathBuf::from(value),
            "session.keyring_service" => self.session.keyring_service = value.to_string(),
            "session.keyring_user" => self.session.keyring_user = value.to_string(),
            "logging.level" => self.logging.level = value.to_string(),
            _ => anyhow::bail!("unknown configuration key '{key}'"),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("kisan");
        Self {
            backend: SessionBackend::File,
            file: data_dir.join("session.json"),
            keyring_service: "kisan".to_string(),
            keyring_user: "default".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"api.timeout_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- api ---
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "api.base_url".into(),
                message: format!("must be an http(s) URL, got '{}'", self.api.base_url),
            });
        }
        if self.api.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "api.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- session ---
        match self.session.backend {
            SessionBackend::File if self.session.file.as_os_str().is_empty() => {
                errors.push(ValidationError {
                    field: "session.file".into(),
                    message: "must be set when backend is 'file'".into(),
                });
            }
            SessionBackend::Keyring => {
                if self.session.keyring_service.trim().is_empty() {
                    errors.push(ValidationError {
                        field: "session.keyring_service".into(),
                        message: "must be set when backend is 'keyring'".into(),
                    });
                }
                if self.session.keyring_user.trim().is_empty() {
                    errors.push(ValidationError {
                        field: "session.keyring_user".into(),
                        message: "must be set when backend is 'keyring'".into(),
                    });
                }
            }
            _ => {}
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use kisan_core::config::{ConfigBuilder, SessionBackend};
///
/// let config = ConfigBuilder::new()
///     .api_base_url("https://portal.example.gov.in")
///     .session_backend(SessionBackend::Keyring)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- api ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn api_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.api.timeout_secs = seconds;
        self
    }

    // --- session ---

    pub fn session_backend(mut self, backend: SessionBackend) -> Self {
        self.config.session.backend = backend;
        self
    }

    pub fn session_file(mut self, file: PathBuf) -> Self {
        self.config.session.file = file;
        self
    }

    pub fn session_keyring(mut self, service: impl Into<String>, user: impl Into<String>) -> Self {
        self.config.session.keyring_service = service.into();
        self.config.session.keyring_user = user.into();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
