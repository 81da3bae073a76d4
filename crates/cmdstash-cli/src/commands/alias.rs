// crates/cmdstash-cli/src/commands/alias.rs - Shell alias script

use anyhow::Result;

use crate::context::{Context, PROGRAM};

/// Regenerate the alias file, or print the script with `--print`
pub fn handle(ctx: &Context, print: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let aliases = ctx.alias_manager();

    if print {
        print!("{}", aliases.render(store.collection(), PROGRAM));
        return Ok(());
    }

    let count = aliases.write(store.collection(), PROGRAM)?;
    println!("✅ Wrote {count} alias(es) to {}", aliases.path().display());
    println!();
    println!("💡 Add this line to your shell profile (~/.bashrc, ~/.zshrc):");
    println!("   {}", aliases.source_instruction());
    Ok(())
}
