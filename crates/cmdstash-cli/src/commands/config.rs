// crates/cmdstash-cli/src/commands/config.rs - Configuration display

use anyhow::Result;
use cmdstash_core::ConfigManager;

use crate::context::Context;

/// Print the effective configuration as TOML, or a commented default file
pub fn handle(ctx: &Context, default: bool) -> Result<()> {
    if default {
        print!("{}", ConfigManager::generate_default_config());
        return Ok(());
    }

    match ctx.config_path() {
        Some(path) => println!("# loaded from {}", path.display()),
        None => println!("# no config file found, showing defaults"),
    }
    print!("{}", toml::to_string_pretty(ctx.config())?);
    Ok(())
}
