// crates/cmdstash-core/src/alias.rs - Shell alias generation
//
// Snippets can carry an alias name. The alias file is a generated shell
// script the user sources from their profile:
//
// - snippets without parameters become plain aliases:
//       alias gst='git status'
// - parameterised snippets become functions that go through `exec`, so the
//   template is resolved (and missing values prompted for) at call time:
//       deploy() {
//           cmdstash exec 0190f5a2-... "$@"
//       }

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

use crate::error::Result;
use crate::store::{Collection, write_atomic};
use crate::template::ParameterEngine;

static ALIAS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("static pattern compiles"));

/// Returns true when `name` can be used as a shell alias and function name
pub fn is_valid_alias_name(name: &str) -> bool {
    ALIAS_PATTERN.is_match(name)
}

/// Quote `value` for POSIX shells using single quotes
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Writes the alias script for a collection
pub struct AliasManager {
    path: PathBuf,
}

impl AliasManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the alias script; `program` is the executable the generated
    /// functions call back into
    pub fn render(&self, collection: &Collection, program: &str) -> String {
        let mut lines = vec![
            "# cmdstash aliases - generated file, edits will be overwritten".to_string(),
            "# Add this line to your shell profile (~/.bashrc, ~/.zshrc, ...):".to_string(),
            format!("#   {}", self.source_instruction()),
            String::new(),
        ];

        for snippet in collection.iter() {
            let Some(alias) = snippet.alias() else {
                continue;
            };

            if !snippet.description().is_empty() {
                for line in snippet.description().lines() {
                    lines.push(format!("# {line}"));
                }
            }

            // Parameterless commands may still contain escaped braces, so they
            // go through the resolver to get the literal shell text.
            let literal = if snippet.has_parameters() {
                None
            } else {
                ParameterEngine::resolve(snippet.command(), snippet.parameters(), &HashMap::new())
                    .ok()
            };

            match literal {
                Some(command) => lines.push(format!("alias {alias}={}", shell_quote(&command))),
                None => {
                    lines.push(format!("{alias}() {{"));
                    lines.push(format!("    {program} exec {} \"$@\"", snippet.id()));
                    lines.push("}".to_string());
                }
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }

    /// Render and write the alias script atomically, returning the number of aliases written
    pub fn write(&self, collection: &Collection, program: &str) -> Result<usize> {
        let script = self.render(collection, program);
        write_atomic(&self.path, script.as_bytes())?;

        let count = collection.iter().filter(|s| s.alias().is_some()).count();
        debug!(path = %self.path.display(), aliases = count, "wrote alias file");
        Ok(count)
    }

    /// The line a user adds to their shell profile
    pub fn source_instruction(&self) -> String {
        format!("source {}", self.path.display())
    }
}
