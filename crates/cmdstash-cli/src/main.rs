// crates/cmdstash-cli/src/main.rs - CLI Application Entry Point
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────────┐
// │   User Input    │───▶│   CLI Parser     │───▶│  Command Handlers   │
// │ (clap commands) │    │ (main function)  │    │ (commands/*.rs)     │
// └─────────────────┘    └──────────────────┘    └─────────────────────┘
//                                 │                        │
//                                 ▼                        ▼
//                        ┌──────────────────┐    ┌─────────────────────┐
//                        │     Context      │    │  cmdstash-core +    │
//                        │ (config, paths)  │    │  services (shell)   │
//                        └──────────────────┘    └─────────────────────┘
//
// DESIGN PRINCIPLES:
// - Context is passed explicitly (no global state)
// - Commands print results to stdout; logs and prompts go to stderr
// - Core errors map to distinct exit codes so scripts can react
//
// EXAMPLE USAGE:
// ```bash
// cmdstash new 'docker run -p {port=8080}:80 {image}' -d "Run a container" -t docker
// cmdstash search docker --json | jq '.[].id'
// cmdstash exec 0190f5a2 image=nginx
// cmdstash sync
// ```

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod context;
mod output;
mod services;
mod stdin;

use cli::{Cli, Commands};
use commands::edit::EditArgs;
use commands::exec::{CommandFailed, ExecArgs};
use context::Context;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(cli.store, cli.config)?;

    match cli.command {
        Commands::New {
            command,
            description,
            tags,
            alias,
            params,
        } => commands::new::handle(&ctx, command, description, tags, alias, params),
        Commands::List { tag, json } => commands::list::handle(&ctx, tag, json),
        Commands::Search { query, json } => commands::search::handle(&ctx, query, json),
        Commands::Show { id, json } => commands::show::handle(&ctx, id, json),
        Commands::Edit {
            id,
            command,
            description,
            tags,
            clear_tags,
            alias,
            no_alias,
        } => commands::edit::handle(
            &ctx,
            id,
            EditArgs {
                command,
                description,
                tags,
                clear_tags,
                alias,
                no_alias,
            },
        ),
        Commands::Param {
            id,
            name,
            default,
            required,
            description,
        } => commands::param::handle(&ctx, id, name, default, required, description),
        Commands::Delete { id, yes } => commands::delete::handle(&ctx, id, yes),
        Commands::Exec {
            id,
            params,
            values,
            dry_run,
            yes,
        } => commands::exec::handle(
            &ctx,
            id,
            ExecArgs {
                params,
                values,
                dry_run,
                yes,
            },
        ),
        Commands::Sync { status } => commands::sync::handle(&ctx, status),
        Commands::SyncInit { url } => commands::sync::init(&ctx, url),
        Commands::Alias { print } => commands::alias::handle(&ctx, print),
        Commands::Config { default } => commands::config::handle(&ctx, default),
    }
}

/// CMDSTASH_LOG takes EnvFilter directives; -v and -vv raise the default level
fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("CMDSTASH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Exit status for a failed run, chosen by the core error kind
///
/// 2 invalid input or missing parameters, 3 not found, 4 corrupt store,
/// 5 sync failure or conflict, 1 anything else. A command run by `exec` that
/// failed passes its own exit status through.
fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(failed) = err.downcast_ref::<CommandFailed>() {
        return u8::try_from(failed.code).ok().filter(|&code| code != 0).unwrap_or(1);
    }

    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<cmdstash_core::Error>())
        .map(|core| core.kind());

    match kind {
        Some("validation" | "template" | "missing_parameter") => 2,
        Some("not_found") => 3,
        Some("corrupt_store") => 4,
        Some("sync" | "sync_conflict") => 5,
        _ => 1,
    }
}
