// crates/cmdstash-cli/src/stdin.rs - Centralized STDIN handling utility
//
// Follows Unix conventions: read from stdin when no positional argument is given.

use anyhow::{Result, bail};
use std::io::{self, IsTerminal, Read};

/// Read input from stdin or use provided argument
///
/// UNIX PATTERN:
/// ```bash
/// cmdstash new 'du -sh {dir=.}'          # Use argument
/// history | tail -1 | cut -c8- | cmdstash new   # Use stdin
/// ```
pub fn read_input_or_stdin(arg: Option<&str>) -> Result<String> {
    match arg {
        Some(value) => Ok(value.to_string()),
        None => {
            if io::stdin().is_terminal() {
                bail!(
                    "No input provided. Either provide an argument or pipe input.\n\nExamples:\n  cmdstash new 'ls -la {{dir}}'\n  echo 'ls -la {{dir}}' | cmdstash new"
                );
            }

            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            parse_piped(&buffer)
        }
    }
}

fn parse_piped(buffer: &str) -> Result<String> {
    let input = buffer.trim();
    if input.is_empty() {
        bail!("Empty input provided");
    }
    Ok(input.to_string())
}
