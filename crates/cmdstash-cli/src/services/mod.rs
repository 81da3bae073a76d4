// crates/cmdstash-cli/src/services/mod.rs - Service layer modules
pub mod prompt;
pub mod shell;

pub use prompt::PromptService;
pub use shell::ShellService;
