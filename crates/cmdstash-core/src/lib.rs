// crates/cmdstash-core/src/lib.rs - cmdstash core library
//
// The parts of the snippet manager that carry real invariants: the command
// template engine, the snippet model, the TOML store and the git sync engine.
// Everything here is synchronous, never prompts and never prints; the CLI
// owns terminal I/O and process execution.
//
// Data flow:
//   store::load -> Collection (query/mutate Snippets) -> ParameterEngine::resolve
//   -> store::save -> SyncEngine::sync

//! Snippet model, command templates, TOML storage and git synchronisation
//! for the `cmdstash` command-line snippet manager.
//!
//! ```no_run
//! use cmdstash_core::{ParameterEngine, Snippet, Store};
//! use std::collections::HashMap;
//!
//! let mut store = Store::open("snippets.toml")?;
//! let snippet = Snippet::new("ssh {user=root}@{host}", "Log in", ["ssh"])?;
//! let id = snippet.id().to_string();
//! store.collection_mut().add(snippet)?;
//! store.save()?;
//!
//! let snippet = store.collection().get(&id)?;
//! let values = HashMap::from([("host".to_string(), "db1".to_string())]);
//! let command = ParameterEngine::resolve(snippet.command(), snippet.parameters(), &values)?;
//! assert_eq!(command, "ssh root@db1");
//! # Ok::<(), cmdstash_core::Error>(())
//! ```

pub mod alias;
pub mod config;
pub mod error;
pub mod snippet;
pub mod store;
pub mod sync;
pub mod template;
pub mod vcs;

pub use alias::AliasManager;
pub use config::{ConfigError, ConfigManager, StashConfig};
pub use error::{Error, Result};
pub use snippet::{Snippet, SnippetId, SnippetUpdate};
pub use store::{Collection, Store};
pub use sync::{InitOutcome, SyncEngine, SyncOptions, SyncOutcome, SyncState};
pub use template::{Parameter, ParameterEngine, Placeholder, TemplateError};
pub use vcs::{GitCli, RepoStatus, VcsError, VersionControl};
