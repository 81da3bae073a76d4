// crates/cmdstash-cli/src/commands/delete.rs - Delete a snippet

use anyhow::Result;

use super::find_snippet;
use crate::context::Context;
use crate::services::PromptService;

/// Remove a snippet; asks first when a human is at the terminal
pub fn handle(ctx: &Context, id: String, yes: bool) -> Result<()> {
    let mut store = ctx.open_store()?;
    let snippet = find_snippet(store.collection(), &id)?;
    let id = snippet.id().to_string();

    if !yes && PromptService::interactive() {
        let question = format!("Delete '{}'?", snippet.command());
        if !PromptService::new().confirm(&question)? {
            println!("Cancelled");
            return Ok(());
        }
    }

    store.collection_mut().remove(&id)?;
    ctx.commit(&store)?;

    println!("🗑️  Deleted snippet {id}");
    Ok(())
}
