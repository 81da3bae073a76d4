// crates/cmdstash-cli/src/commands/exec.rs - Resolve and run a snippet
//
// Values come from -P name=value, trailing name=value pairs and bare trailing
// values (which fill the remaining parameters in template order, so an alias
// function `go db1` works). Whatever is still missing is prompted for when a
// human is at the terminal; otherwise resolution fails with the list of
// missing parameters.

use anyhow::{Result, bail};
use console::style;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use cmdstash_core::{ParameterEngine, Snippet};

use super::find_snippet;
use crate::context::Context;
use crate::services::PromptService;
use crate::services::shell::risky_operators;

/// The executed command itself exited unsuccessfully
///
/// `main` turns this into the process exit status, so `cmdstash exec` exits
/// the way the command did.
#[derive(Error, Debug)]
#[error("Command failed with exit code {code}")]
pub struct CommandFailed {
    pub code: i32,
}

pub struct ExecArgs {
    pub params: Vec<String>,
    pub values: Vec<String>,
    pub dry_run: bool,
    pub yes: bool,
}

pub fn handle(ctx: &Context, id: String, args: ExecArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let snippet = find_snippet(store.collection(), &id)?;

    let mut values = collect_values(snippet, &args.params, &args.values)?;
    let interactive = PromptService::interactive();

    if interactive && !ParameterEngine::unresolved(snippet.parameters(), &values).is_empty() {
        PromptService::new().fill_parameters(snippet, &mut values)?;
    }

    let command = ParameterEngine::resolve(snippet.command(), snippet.parameters(), &values)?;

    if args.dry_run {
        println!("{command}");
        return Ok(());
    }

    if ctx.config().exec.confirm && !args.yes {
        if !interactive {
            bail!("Refusing to run without confirmation: pass --yes, or --dry-run to print the command");
        }

        eprintln!("{} {}", style("Execute command:").yellow(), command);
        let risky = risky_operators(&command);
        if !risky.is_empty() {
            eprintln!(
                "{} command contains shell operators ({}); review it carefully",
                style("Warning:").red(),
                risky.join(" ")
            );
        }
        if !PromptService::new().confirm("Execute this command?")? {
            eprintln!("Cancelled");
            return Ok(());
        }
    }

    let status = ctx.shell().run(&command)?;
    if !status.success() {
        // killed by a signal: no code to forward
        let code = status.code().unwrap_or(1);
        return Err(CommandFailed { code }.into());
    }
    Ok(())
}

/// Turn command-line values into a name -> value map
fn collect_values(
    snippet: &Snippet,
    params: &[String],
    trailing: &[String],
) -> Result<HashMap<String, String>> {
    let mut values = HashMap::new();

    for assignment in params {
        let Some((name, value)) = assignment.split_once('=') else {
            bail!("Invalid parameter '{assignment}': expected NAME=VALUE");
        };
        if !snippet.parameters().contains_key(name) {
            warn!(parameter = name, "snippet has no such parameter, ignoring");
        }
        values.insert(name.to_string(), value.to_string());
    }

    let mut positional = Vec::new();
    for value in trailing {
        match value.split_once('=') {
            Some((name, v)) if snippet.parameters().contains_key(name) => {
                values.insert(name.to_string(), v.to_string());
            }
            _ => positional.push(value.clone()),
        }
    }

    let mut open = snippet
        .parameters()
        .keys()
        .filter(|name| !values.contains_key(*name))
        .cloned()
        .collect::<Vec<_>>()
        .into_iter();
    for value in positional {
        match open.next() {
            Some(name) => {
                values.insert(name, value);
            }
            None => bail!(
                "Too many values: '{value}' does not match any parameter of {}",
                snippet.id()
            ),
        }
    }

    Ok(values)
}
