// crates/cmdstash-cli/src/services/shell.rs - Shell execution service
//
// Runs a resolved snippet through the user's shell so pipes, redirects and
// the user's own aliases behave as they would at the prompt.

use anyhow::{Context as _, Result};
use std::env;
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::debug;

/// Shell operators worth a second look before running a command
const RISKY_OPERATORS: &[&str] = &["&&", "||", ";", "|", ">>", ">", "<", "`", "$("];

/// Handles command execution
///
/// SHELL SELECTION HIERARCHY:
/// 1. exec.shell in the config (or CMDSTASH_SHELL)
/// 2. SHELL environment variable
/// 3. /bin/sh
///
/// bash and zsh source the user's rc file first so aliases and functions
/// defined there are available; bash additionally needs `expand_aliases`
/// because it runs non-interactively.
pub struct ShellService {
    shell: String,
}

impl ShellService {
    pub fn new(configured: Option<String>) -> Self {
        let shell = configured
            .filter(|s| !s.trim().is_empty())
            .or_else(|| env::var("SHELL").ok().filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| "/bin/sh".to_string());
        Self { shell }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Build the process that runs `command`
    pub fn command(&self, command: &str) -> Command {
        let name = Path::new(&self.shell)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let script = match name.as_str() {
            "bash" => format!("source ~/.bashrc 2>/dev/null; shopt -s expand_aliases; {command}"),
            "zsh" => format!("source ~/.zshrc 2>/dev/null; {command}"),
            _ => command.to_string(),
        };

        let mut process = Command::new(&self.shell);
        process.arg("-c").arg(script);
        process
    }

    /// Run `command` with inherited stdio and wait for it
    pub fn run(&self, command: &str) -> Result<ExitStatus> {
        debug!(shell = %self.shell, command, "executing");
        self.command(command).status().with_context(|| {
            format!(
                "Failed to launch shell '{}'\n\nTip: set exec.shell in the config or CMDSTASH_SHELL",
                self.shell
            )
        })
    }
}

/// Shell operators present in `command`, in the order of `RISKY_OPERATORS`
///
/// Overlapping operators are reported once: `>>` hides `>`, `||` hides `|`.
pub fn risky_operators(command: &str) -> Vec<&'static str> {
    let mut rest = command.to_string();
    let mut found = Vec::new();
    for op in RISKY_OPERATORS {
        if rest.contains(op) {
            found.push(*op);
            rest = rest.replace(op, " ");
        }
    }
    found
}
