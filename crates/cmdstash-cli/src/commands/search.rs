// crates/cmdstash-cli/src/commands/search.rs - Search snippets
//
// Case-insensitive substring match over command, description and tags.

use anyhow::Result;

use crate::context::Context;
use crate::output::{print_json, print_summary};

pub fn handle(ctx: &Context, query: Option<String>, json: bool) -> Result<()> {
    let query = crate::stdin::read_input_or_stdin(query.as_deref())?;

    let store = ctx.open_store()?;
    let hits = store.collection().search(&query);

    if json {
        return print_json(&hits);
    }

    if hits.is_empty() {
        println!("🔍 No snippets match '{query}'");
    } else {
        print_summary(&hits);
    }
    Ok(())
}
