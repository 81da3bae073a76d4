// crates/cmdstash-core/src/config.rs - Configuration System
//
// This module provides the configuration schema and loading mechanism for
// cmdstash. Configuration is an explicit value: the CLI loads it once and
// threads the relevant pieces into `Store`, `SyncEngine` and `AliasManager`.
// Nothing in the core reads the environment on its own.
//
// CONFIGURATION HIERARCHY (highest to lowest priority):
// 1. Command-line arguments (--store, handled by the CLI)
// 2. Environment variables (CMDSTASH_STORE, CMDSTASH_REMOTE, ...)
// 3. Config file (--config, or <config_dir>/cmdstash/config.toml)
// 4. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::sync::SyncOptions;

/// Errors that can occur during configuration loading and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid TOML syntax in {file}: {error}")]
    ParseError { file: String, error: String },

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("I/O error reading config: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete configuration schema
///
/// Every section and field has a default, so partial config files are fine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StashConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub alias: AliasConfig,

    #[serde(default)]
    pub exec: ExecConfig,
}

/// Where the snippet collection lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the snippets file; its directory is the sync repository
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// Git synchronisation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote repository URL used by `sync-init`
    #[serde(default)]
    pub remote: Option<String>,

    /// Branch that is pulled from and pushed to
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Upper bound for each network operation, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts for transient transport failures
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Sync automatically after every command that changes the store
    #[serde(default)]
    pub auto_sync: bool,

    /// Commit identity; falls back to the user's git configuration
    #[serde(default)]
    pub author_name: Option<String>,

    #[serde(default)]
    pub author_email: Option<String>,
}

/// Generated alias script settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasConfig {
    #[serde(default = "default_alias_path")]
    pub path: PathBuf,
}

/// Command execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Shell used to run snippets; falls back to $SHELL, then /bin/sh
    #[serde(default)]
    pub shell: Option<String>,

    /// Ask before running a resolved command
    #[serde(default = "default_true")]
    pub confirm: bool,
}

impl SyncConfig {
    /// Runtime options for the sync engine
    pub fn options(&self) -> SyncOptions {
        let author = match (&self.author_name, &self.author_email) {
            (Some(name), Some(email)) => Some((name.clone(), email.clone())),
            _ => None,
        };
        SyncOptions {
            branch: self.branch.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            retries: self.retries,
            author,
            ..SyncOptions::default()
        }
    }
}

/// Configuration loading and management
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from the config file and the process environment
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load_config(path: Option<&Path>) -> ConfigResult<StashConfig> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.display().to_string()));
                }
                Self::load_file(path)?
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::load_file(&path)?,
                _ => StashConfig::default(),
            },
        };

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        Self::validate_config(&config)?;

        Ok(config)
    }

    /// `<config_dir>/cmdstash/config.toml`, when the platform has a config dir
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cmdstash").join("config.toml"))
    }

    /// Parse a single config file
    pub fn load_file(path: &Path) -> ConfigResult<StashConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: StashConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                file: path.display().to_string(),
                error: e.to_string(),
            })?;

        config.store.path = expand_home(&config.store.path);
        config.alias.path = expand_home(&config.alias.path);
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// - CMDSTASH_STORE -> store.path
    /// - CMDSTASH_REMOTE -> sync.remote
    /// - CMDSTASH_ALIAS_FILE -> alias.path
    /// - CMDSTASH_SHELL -> exec.shell
    ///
    /// `lookup` abstracts the environment so the mapping can be tested.
    pub fn apply_env_overrides<F>(config: &mut StashConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(store) = set("CMDSTASH_STORE") {
            config.store.path = expand_home(Path::new(&store));
        }
        if let Some(remote) = set("CMDSTASH_REMOTE") {
            config.sync.remote = Some(remote);
        }
        if let Some(alias) = set("CMDSTASH_ALIAS_FILE") {
            config.alias.path = expand_home(Path::new(&alias));
        }
        if let Some(shell) = set("CMDSTASH_SHELL") {
            config.exec.shell = Some(shell);
        }
    }

    /// Validate the final configuration for consistency
    pub fn validate_config(config: &StashConfig) -> ConfigResult<()> {
        if config.store.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.path cannot be empty".to_string(),
            ));
        }

        if config.sync.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sync.timeout_secs must be at least 1".to_string(),
            ));
        }

        if config.sync.retries > 10 {
            return Err(ConfigError::ValidationError(format!(
                "sync.retries is {}, the maximum is 10",
                config.sync.retries
            )));
        }

        let branch = config.sync.branch.trim();
        if branch.is_empty() || branch.contains(char::is_whitespace) || branch.starts_with('-') {
            return Err(ConfigError::ValidationError(format!(
                "Invalid sync.branch '{}'",
                config.sync.branch
            )));
        }

        if let Some(remote) = &config.sync.remote {
            if remote.trim().is_empty() || remote.starts_with('-') {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid sync.remote '{remote}'"
                )));
            }
        }

        if config.sync.author_name.is_some() != config.sync.author_email.is_some() {
            return Err(ConfigError::ValidationError(
                "sync.author_name and sync.author_email must be set together".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate a default configuration file with comments
    pub fn generate_default_config() -> String {
        format!(
            r#"# cmdstash configuration file
#
# Lines starting with # are comments and are ignored.

[store]
# Snippet file. Its directory becomes the git repository used by `sync`.
path = "{store}"

[sync]
# Remote repository (can also be given to `cmdstash sync-init`)
# remote = "git@github.com:you/snippets.git"

# Branch to pull from and push to
branch = "main"

# Maximum seconds for each fetch/push/clone before giving up
timeout_secs = 30

# Extra attempts for transient network failures (never for auth errors)
retries = 2

# Sync after every command that changes the store
auto_sync = false

# Commit identity, when git has none configured
# author_name = "Your Name"
# author_email = "you@example.com"

[alias]
# Generated alias script; source it from your shell profile
path = "{alias}"

[exec]
# Shell used to run snippets (defaults to $SHELL, then /bin/sh)
# shell = "/bin/zsh"

# Ask for confirmation before running a command
confirm = true
"#,
            store = default_store_path().display(),
            alias = default_alias_path().display(),
        )
    }
}

/// Expand a leading `~` to the user's home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn base_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cmdstash")
}

fn default_store_path() -> PathBuf {
    base_dir().join("snippets.toml")
}
fn default_alias_path() -> PathBuf {
    base_dir().join("aliases.sh")
}
fn default_branch() -> String {
    "main".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_retries() -> u32 {
    2
}
fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote: None,
            branch: default_branch(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            auto_sync: false,
            author_name: None,
            author_email: None,
        }
    }
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            path: default_alias_path(),
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            shell: None,
            confirm: true,
        }
    }
}
