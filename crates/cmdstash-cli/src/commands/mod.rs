// crates/cmdstash-cli/src/commands/mod.rs - Command Handler Modules
//
// One module per subcommand. Handlers take the `Context`, do their work
// through cmdstash-core and own all printing.

pub mod alias;
pub mod config;
pub mod delete;
pub mod edit;
pub mod exec;
pub mod list;
pub mod new;
pub mod param;
pub mod search;
pub mod show;
pub mod sync;

use anyhow::{Result, bail};
use cmdstash_core::{Collection, Error, Snippet};

/// Shortest id prefix accepted in place of a full id
const MIN_PREFIX: usize = 4;

/// Find a snippet by full id, alias or unique id prefix
pub fn find_snippet<'a>(collection: &'a Collection, key: &str) -> Result<&'a Snippet> {
    if let Ok(snippet) = collection.lookup(key) {
        return Ok(snippet);
    }

    if key.len() >= MIN_PREFIX {
        let matches = collection.find(|s| s.id().as_str().starts_with(key));
        match matches.as_slice() {
            [snippet] => return Ok(*snippet),
            [] => {}
            many => bail!(
                "'{key}' matches {} snippets; use more characters of the id",
                many.len()
            ),
        }
    }

    Err(Error::NotFound(key.to_string()).into())
}

/// Parse `name=default:description`; both parts after the name are optional
pub fn parse_param_spec(spec: &str) -> Result<(String, Option<String>, Option<String>)> {
    let (head, description) = match spec.split_once(':') {
        Some((head, description)) => (head, Some(description.trim().to_string())),
        None => (spec, None),
    };
    let (name, default) = match head.split_once('=') {
        Some((name, default)) => (name, Some(default.to_string())),
        None => (head, None),
    };

    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid parameter spec '{spec}': expected name=default:description");
    }
    Ok((
        name.to_string(),
        default,
        description.filter(|d| !d.is_empty()),
    ))
}
