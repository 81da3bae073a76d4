// crates/cmdstash-cli/src/commands/list.rs - List snippets

use anyhow::Result;

use crate::context::Context;
use crate::output::{print_json, print_summary};

/// List all snippets in id order, optionally only those with a tag
///
/// - Human-readable: id and command, then description, tags and alias
/// - Machine-readable: JSON array for scripting
pub fn handle(ctx: &Context, tag: Option<String>, json: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let collection = store.collection();

    let snippets = match &tag {
        Some(tag) => collection.with_tag(tag),
        None => collection.iter().collect(),
    };

    if json {
        return print_json(&snippets);
    }

    if snippets.is_empty() {
        match tag {
            Some(tag) => println!("No snippets tagged '{tag}'"),
            None => println!("No snippets yet. Add one with: cmdstash new '<command>'"),
        }
        return Ok(());
    }

    print_summary(&snippets);
    Ok(())
}
