// crates/cmdstash-cli/src/cli.rs - Command-line interface definitions
//
// Pure data: what commands and flags exist. Behaviour lives in commands/*.rs.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "cmdstash")]
#[command(about = "Store, search and run parameterised shell command snippets")]
#[command(version)]
pub struct Cli {
    /// Snippet store file (overrides config and CMDSTASH_STORE)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Configuration file (defaults to <config dir>/cmdstash/config.toml)
    #[arg(long, global = true, env = "CMDSTASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show diagnostic logging on stderr (repeat for more)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new snippet
    New {
        /// Command template, e.g. 'ssh {user=root}@{host}' (read from stdin if omitted)
        command: Option<String>,

        /// What the command does
        #[arg(short, long, default_value = "")]
        description: String,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Shell alias to generate for this snippet
        #[arg(short, long)]
        alias: Option<String>,

        /// Annotate a parameter: name=default:description (both parts optional)
        #[arg(short, long = "param", value_name = "SPEC")]
        params: Vec<String>,
    },

    /// List snippets
    List {
        /// Only snippets carrying this tag
        #[arg(long)]
        tag: Option<String>,

        /// Output as JSON for machine processing
        #[arg(long)]
        json: bool,
    },

    /// Search command, description and tags (case-insensitive)
    Search {
        /// Search query (read from stdin if omitted)
        query: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show one snippet in full
    Show {
        /// Snippet id or alias
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Change a snippet
    Edit {
        /// Snippet id or alias
        id: String,

        /// New command template (replaces the parameter table)
        #[arg(long)]
        command: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Replace the tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Remove all tags
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,

        #[arg(short, long)]
        alias: Option<String>,

        /// Remove the alias
        #[arg(long, conflicts_with = "alias")]
        no_alias: bool,
    },

    /// Set a parameter's default or description
    Param {
        /// Snippet id or alias
        id: String,

        /// Parameter name
        name: String,

        #[arg(long)]
        default: Option<String>,

        /// Remove the default, making the parameter required
        #[arg(long, conflicts_with = "default")]
        required: bool,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a snippet
    Delete {
        /// Snippet id or alias
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Resolve a snippet's parameters and run it
    Exec {
        /// Snippet id or alias
        id: String,

        /// Parameter value as name=value (repeatable)
        #[arg(short = 'P', long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Further values: name=value, or bare values filling the remaining parameters in order
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        values: Vec<String>,

        /// Print the resolved command instead of running it
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Run without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Synchronise the store with its git remote
    Sync {
        /// Only report how local and remote relate
        #[arg(long)]
        status: bool,
    },

    /// Put the store directory under git with the given remote
    SyncInit {
        /// Remote repository URL (falls back to sync.remote in the config)
        url: Option<String>,
    },

    /// Regenerate the shell alias file
    Alias {
        /// Print the script to stdout instead of writing the file
        #[arg(long)]
        print: bool,
    },

    /// Show the effective configuration
    Config {
        /// Print a commented default configuration file instead
        #[arg(long)]
        default: bool,
    },
}
