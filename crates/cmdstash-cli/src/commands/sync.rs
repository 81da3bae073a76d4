// crates/cmdstash-cli/src/commands/sync.rs - Git synchronisation commands

use anyhow::{Context as _, Result};
use cmdstash_core::{InitOutcome, SyncState, store};

use crate::context::{Context, PROGRAM};

/// Pull, merge and push the store, or only report the state with `--status`
pub fn handle(ctx: &Context, status_only: bool) -> Result<()> {
    let engine = ctx.sync_engine();

    if status_only {
        let state = engine.status()?;
        let message = match state {
            SyncState::UpToDate => "Up to date with the remote",
            SyncState::FastForward => "Remote has changes to pull",
            SyncState::LocalAhead => "Local changes not yet pushed",
            SyncState::Diverged => "Both local and remote changed; sync will merge",
        };
        println!("{message} ({state})");
        return Ok(());
    }

    let outcome = engine.sync()?;
    if outcome.needs_reload {
        refresh_aliases(ctx)?;
    }
    println!("✅ {}", outcome.summary());
    Ok(())
}

/// Put the store directory under git with `url` (or sync.remote)
pub fn init(ctx: &Context, url: Option<String>) -> Result<()> {
    let url = url
        .or_else(|| ctx.config().sync.remote.clone())
        .context("No remote given. Pass a URL or set sync.remote in the config")?;

    match ctx.sync_engine().init(&url)? {
        InitOutcome::Cloned => {
            refresh_aliases(ctx)?;
            println!("✅ Cloned {url} into {}", ctx.store_path().display());
        }
        InitOutcome::RemoteUpdated => {
            println!("✅ Remote set to {url}");
            println!("💡 Run `{PROGRAM} sync` to synchronise");
        }
        InitOutcome::Initialized(outcome) => {
            if outcome.needs_reload {
                refresh_aliases(ctx)?;
            }
            println!("✅ Initialized sync with {url}: {}", outcome.summary());
        }
    }
    Ok(())
}

/// The store file changed underneath us; regenerate the alias script from it
fn refresh_aliases(ctx: &Context) -> Result<()> {
    let collection = store::load(ctx.store_path())?;
    let aliases = ctx.alias_manager();
    if collection.iter().any(|s| s.alias().is_some()) || aliases.path().exists() {
        aliases.write(&collection, PROGRAM)?;
    }
    Ok(())
}
