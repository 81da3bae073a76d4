// crates/cmdstash-cli/src/commands/param.rs - Annotate a parameter

use anyhow::{Result, bail};

use super::find_snippet;
use crate::context::Context;
use crate::output::format_parameters;

/// Set or clear a parameter's default, or set its description
///
/// ```bash
/// cmdstash param go host --default db1 --description "Database host"
/// cmdstash param go host --required      # drop the default again
/// ```
pub fn handle(
    ctx: &Context,
    id: String,
    name: String,
    default: Option<String>,
    required: bool,
    description: Option<String>,
) -> Result<()> {
    if default.is_none() && !required && description.is_none() {
        bail!("Nothing to change. Pass --default, --required or --description");
    }

    let mut store = ctx.open_store()?;
    let id = find_snippet(store.collection(), &id)?.id().to_string();
    let collection = store.collection_mut();

    if required {
        collection.set_parameter_default(&id, &name, None)?;
    } else if default.is_some() {
        collection.set_parameter_default(&id, &name, default)?;
    }
    if description.is_some() {
        collection.set_parameter_description(&id, &name, description)?;
    }

    let snippet = store.collection().get(&id)?.clone();
    ctx.commit(&store)?;

    println!("✅ Updated parameter '{name}' of {}", snippet.id());
    println!("   parameters: {}", format_parameters(&snippet));
    Ok(())
}
