// crates/cmdstash-core/src/error.rs - Error taxonomy for the core library
//
// Every public operation of the core returns `Result<T>` with exactly one of
// the variants below. Nothing in the core prompts, retries or prints: callers
// decide how to present a failure and which exit code it maps to.
//
// Module-specific vocabularies (template syntax, configuration, version
// control) keep their own enums and are wrapped here.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::template::TemplateError;

/// Errors surfaced by the cmdstash core
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed snippet input (empty command, bad template, bad alias, ...)
    #[error("Invalid snippet: {0}")]
    Validation(String),

    /// Placeholder syntax error found while scanning a template
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Resolution attempted without values for required parameters
    #[error("No value provided for required parameter(s): {}", .0.join(", "))]
    MissingParameter(Vec<String>),

    /// Reference to a snippet id that is not in the collection
    #[error("Snippet not found: {0}")]
    NotFound(String),

    /// The store file exists but could not be parsed
    #[error("Store file {} is corrupt: {diagnostic}", .path.display())]
    CorruptStore { path: PathBuf, diagnostic: String },

    /// Remote communication or version-control failure during sync
    #[error("Sync failed: {message}")]
    Sync {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Automatic merge hit a textual conflict in the store file
    #[error(
        "Sync conflict in {}: local and remote edits overlap; the local store was left unchanged",
        .path.display()
    )]
    SyncConflict { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a sync error without an underlying cause
    pub fn sync(message: impl Into<String>) -> Self {
        Self::Sync {
            message: message.into(),
            source: None,
        }
    }

    /// Build a sync error wrapping its cause
    pub fn sync_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Sync {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Short, stable name of the error kind, used for exit codes and JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Template(_) => "template",
            Self::MissingParameter(_) => "missing_parameter",
            Self::NotFound(_) => "not_found",
            Self::CorruptStore { .. } => "corrupt_store",
            Self::Sync { .. } => "sync",
            Self::SyncConflict { .. } => "sync_conflict",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}
