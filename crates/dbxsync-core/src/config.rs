//! Configuration module for dbxsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, tilde expansion, validation, and a builder for programmatic use.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for dbxsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub authentication: AuthenticationConfig,
    #[serde(default)]
    pub folders: Vec<FolderConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dropbox application credentials used for the OAuth code exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthenticationConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// One synchronized root pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderConfig {
    /// Local directory, may start with `~`.
    pub local_path: PathBuf,
    /// Dropbox path, `""` for the account root or `/`-prefixed otherwise.
    #[serde(default)]
    pub remote_path: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("can't read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("can't parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/dbxsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("dbxsync")
            .join("config.yaml")
    }

    /// Replace a leading `~` in every folder's `local_path` with the home directory.
    pub fn expand_paths(&mut self) {
        for folder in &mut self.folders {
            folder.local_path = expand_tilde(&folder.local_path);
        }
    }
}

/// Expand a leading `~` component. Paths without one are returned unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"folders[0].remote_path"`.
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

        // --- authentication ---
        if self.authentication.client_id.trim().is_empty() {
            errors.push(ValidationError {
                field: "authentication.client_id".into(),
                message: "must not be empty".into(),
            });
        }
        if self.authentication.client_secret.trim().is_empty() {
            errors.push(ValidationError {
                field: "authentication.client_secret".into(),
                message: "must not be empty".into(),
            });
        }

        // --- folders ---
        if self.folders.is_empty() {
            errors.push(ValidationError {
                field: "folders".into(),
                message: "at least one folder must be configured".into(),
            });
        }

        let mut seen = HashSet::new();
        for (i, folder) in self.folders.iter().enumerate() {
            if folder.local_path.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: format!("folders[{i}].local_path"),
                    message: "must not be empty".into(),
                });
            } else if !seen.insert(&folder.local_path) {
                errors.push(ValidationError {
                    field: format!("folders[{i}].local_path"),
                    message: format!(
                        "duplicate local path: {}",
                        folder.local_path.display()
                    ),
                });
            }

            let remote = folder.remote_path.as_str();
            if !remote.is_empty() && !remote.starts_with('/') {
                errors.push(ValidationError {
                    field: format!("folders[{i}].remote_path"),
                    message: format!("must be empty or start with '/': {remote}"),
                });
            } else if remote.ends_with('/') {
                errors.push(ValidationError {
                    field: format!("folders[{i}].remote_path"),
                    message: format!(
                        "must not end with '/' (use \"\" for the Dropbox root): {remote}"
                    ),
                });
            }
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
/// # Example
///
/// ```rust,no_run
/// use dbxsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .credentials("client-id", "client-secret")
///     .folder("~/Dropbox/notes", "/notes")
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

    pub fn credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.config.authentication.client_id = client_id.into();
        self.config.authentication.client_secret = client_secret.into();
        self
    }

    pub fn folder(mut self, local_path: impl Into<PathBuf>, remote_path: impl Into<String>) -> Self {
        self.config.folders.push(FolderConfig {
            local_path: local_path.into(),
            remote_path: remote_path.into(),
        });
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

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

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
