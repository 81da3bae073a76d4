// crates/cmdstash-cli/src/commands/show.rs - Show one snippet

use anyhow::Result;

use super::find_snippet;
use crate::context::Context;
use crate::output::{SnippetView, print_detail};

pub fn handle(ctx: &Context, id: String, json: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let snippet = find_snippet(store.collection(), &id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&SnippetView::from(snippet))?);
    } else {
        print_detail(snippet);
    }
    Ok(())
}
