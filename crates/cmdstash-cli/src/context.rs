// crates/cmdstash-cli/src/context.rs - Application context
//
// Loads configuration once and hands commands the services they need.
// Nothing below reads global state: the store path, sync options and alias
// location all come from here.

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use cmdstash_core::sync::is_network_error;
use cmdstash_core::{AliasManager, ConfigManager, StashConfig, Store, SyncEngine};

use crate::services::ShellService;

/// Executable the generated alias functions call back into
pub const PROGRAM: &str = "cmdstash";

/// Application context that gets passed to command handlers
pub struct Context {
    config: StashConfig,
    config_path: Option<PathBuf>,
}

impl Context {
    /// Load configuration; `store` (from --store) wins over everything else
    pub fn new(store: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let mut config =
            ConfigManager::load_config(config_path.as_deref()).context("Failed to load configuration")?;
        if let Some(store) = store {
            config.store.path = store;
        }
        debug!(store = %config.store.path.display(), "configuration loaded");

        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    /// The config file in effect, if any
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config_path
            .clone()
            .or_else(ConfigManager::default_config_path)
            .filter(|path| path.exists())
    }

    pub fn store_path(&self) -> &Path {
        &self.config.store.path
    }

    pub fn open_store(&self) -> Result<Store> {
        Ok(Store::open(self.store_path())?)
    }

    pub fn sync_engine(&self) -> SyncEngine {
        SyncEngine::new(self.store_path(), self.config.sync.options())
    }

    pub fn alias_manager(&self) -> AliasManager {
        AliasManager::new(&self.config.alias.path)
    }

    pub fn shell(&self) -> ShellService {
        ShellService::new(self.config.exec.shell.clone())
    }

    /// Persist a changed store and run the follow-ups every mutation shares:
    /// refresh the alias file, and sync when `sync.auto_sync` is on
    pub fn commit(&self, store: &Store) -> Result<()> {
        store.save()?;

        let aliases = self.alias_manager();
        let has_aliases = store.collection().iter().any(|s| s.alias().is_some());
        if has_aliases || aliases.path().exists() {
            aliases.write(store.collection(), PROGRAM)?;
        }

        if self.config.sync.auto_sync {
            match self.sync_engine().sync() {
                Ok(outcome) => debug!(state = %outcome.state, "auto-sync finished"),
                // the local save stands even when the remote is unreachable
                Err(err) if is_network_error(&err) => {
                    warn!(error = %err, "auto-sync skipped");
                    eprintln!("⚠️  Saved locally; sync failed: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}
