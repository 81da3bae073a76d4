// crates/cmdstash-cli/src/services/prompt.rs - Terminal prompts
//
// All prompts go to stderr so stdout stays clean for piping.

use anyhow::Result;
use console::{Term, style};
use std::collections::HashMap;
use std::io::{self, IsTerminal};

use cmdstash_core::Snippet;
use cmdstash_core::template::Parameter;

pub struct PromptService {
    term: Term,
}

impl PromptService {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    /// Whether a human can answer prompts
    pub fn interactive() -> bool {
        io::stdin().is_terminal() && io::stderr().is_terminal()
    }

    /// Ask a yes/no question; anything but y/yes is "no"
    pub fn confirm(&self, question: &str) -> Result<bool> {
        self.term
            .write_str(&format!("{} [y/N] ", style(question).bold()))?;
        let answer = self.term.read_line()?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    /// Ask for every parameter of `snippet` that has no value yet
    ///
    /// Each prompt shows the description and the default; an empty answer
    /// keeps the default (or leaves the parameter unset if there is none).
    pub fn fill_parameters(
        &self,
        snippet: &Snippet,
        values: &mut HashMap<String, String>,
    ) -> Result<()> {
        for parameter in snippet.parameters().values() {
            if values.contains_key(&parameter.name) {
                continue;
            }
            if let Some(answer) = self.ask(parameter)? {
                values.insert(parameter.name.clone(), answer);
            }
        }
        Ok(())
    }

    fn ask(&self, parameter: &Parameter) -> Result<Option<String>> {
        let mut prompt = style(&parameter.name).cyan().bold().to_string();
        if let Some(description) = &parameter.description {
            prompt.push_str(&format!(" ({description})"));
        }
        if let Some(default) = &parameter.default {
            prompt.push_str(&format!(" [{}]", style(default).dim()));
        }
        self.term.write_str(&format!("{prompt}: "))?;

        let answer = self.term.read_line()?;
        Ok(Some(answer).filter(|a| !a.is_empty()))
    }
}

impl Default for PromptService {
    fn default() -> Self {
        Self::new()
    }
}
