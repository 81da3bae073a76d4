// crates/cmdstash-cli/src/commands/edit.rs - Change a snippet

use anyhow::{Result, bail};
use cmdstash_core::SnippetUpdate;

use super::find_snippet;
use crate::context::Context;
use crate::output::format_parameters;

/// Requested changes, straight from the command line
pub struct EditArgs {
    pub command: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub clear_tags: bool,
    pub alias: Option<String>,
    pub no_alias: bool,
}

impl EditArgs {
    fn into_update(self) -> SnippetUpdate {
        let tags = if self.clear_tags {
            Some(Vec::new())
        } else if self.tags.is_empty() {
            None
        } else {
            Some(self.tags)
        };
        let alias = if self.no_alias {
            Some(None)
        } else {
            self.alias.map(Some)
        };

        SnippetUpdate {
            command: self.command,
            description: self.description,
            tags,
            alias,
        }
    }
}

/// Apply a partial update
///
/// Changing the command re-extracts its parameters; defaults and
/// descriptions set with `param` are dropped in that case.
pub fn handle(ctx: &Context, id: String, args: EditArgs) -> Result<()> {
    let changes = args.into_update();
    if changes.is_empty() {
        bail!("Nothing to change. Pass --command, --description, --tag, --clear-tags, --alias or --no-alias");
    }

    let mut store = ctx.open_store()?;
    let id = find_snippet(store.collection(), &id)?.id().to_string();
    let command_changed = changes.command.is_some();

    let snippet = store.collection_mut().update(&id, changes)?.clone();
    ctx.commit(&store)?;

    println!("✅ Updated snippet {}", snippet.id());
    if command_changed && snippet.has_parameters() {
        println!("   parameters: {}", format_parameters(&snippet));
    }
    Ok(())
}
