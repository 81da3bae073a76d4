// crates/cmdstash-cli/src/commands/new.rs - Add a snippet

use anyhow::Result;
use cmdstash_core::{Snippet, SnippetUpdate};

use super::parse_param_spec;
use crate::context::Context;
use crate::output::format_parameters;

/// Create a snippet from a command template
///
/// Placeholders are extracted from the command; `-p name=default:description`
/// annotates them. Naming a parameter the command does not contain is an error.
///
/// EXAMPLES:
/// ```bash
/// cmdstash new 'docker logs -f {container}' -d "Follow logs" -t docker
/// cmdstash new 'ssh {user}@{host}' -p user=root:"Login user" -a go
/// echo 'kubectl get pods -n {ns=default}' | cmdstash new -t k8s
/// ```
pub fn handle(
    ctx: &Context,
    command: Option<String>,
    description: String,
    tags: Vec<String>,
    alias: Option<String>,
    params: Vec<String>,
) -> Result<()> {
    let command = crate::stdin::read_input_or_stdin(command.as_deref())?;
    let mut snippet = Snippet::new(&command, &description, &tags)?;

    for spec in &params {
        let (name, default, description) = parse_param_spec(spec)?;
        if default.is_some() {
            snippet.set_parameter_default(&name, default)?;
        }
        if description.is_some() {
            snippet.set_parameter_description(&name, description)?;
        }
    }

    if alias.is_some() {
        snippet.update(SnippetUpdate {
            alias: Some(alias),
            ..Default::default()
        })?;
    }

    let mut store = ctx.open_store()?;
    let snippet = store.collection_mut().add(snippet)?.clone();
    ctx.commit(&store)?;

    println!("✅ Added snippet {}", snippet.id());
    if snippet.has_parameters() {
        println!("   parameters: {}", format_parameters(&snippet));
    }
    if let Some(alias) = snippet.alias() {
        println!(
            "💡 Alias '{alias}' written to {}",
            ctx.alias_manager().path().display()
        );
    }
    Ok(())
}
