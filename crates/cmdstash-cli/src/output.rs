// crates/cmdstash-cli/src/output.rs - Human and JSON renderings of snippets

use anyhow::Result;
use console::style;
use serde::Serialize;

use cmdstash_core::Snippet;

/// JSON shape of a snippet, stable for scripting
#[derive(Serialize)]
pub struct SnippetView<'a> {
    id: &'a str,
    command: &'a str,
    description: &'a str,
    tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<&'a str>,
    parameters: Vec<ParameterView<'a>>,
    created_at: String,
    updated_at: String,
}

#[derive(Serialize)]
struct ParameterView<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    required: bool,
}

impl<'a> From<&'a Snippet> for SnippetView<'a> {
    fn from(snippet: &'a Snippet) -> Self {
        Self {
            id: snippet.id().as_str(),
            command: snippet.command(),
            description: snippet.description(),
            tags: snippet.tags(),
            alias: snippet.alias(),
            parameters: snippet
                .parameters()
                .values()
                .map(|p| ParameterView {
                    name: &p.name,
                    default: p.default.as_deref(),
                    description: p.description.as_deref(),
                    required: p.is_required(),
                })
                .collect(),
            created_at: snippet.created_at().to_rfc3339(),
            updated_at: snippet.updated_at().to_rfc3339(),
        }
    }
}

pub fn print_json(snippets: &[&Snippet]) -> Result<()> {
    let views: Vec<SnippetView> = snippets.iter().map(|s| SnippetView::from(*s)).collect();
    println!("{}", serde_json::to_string_pretty(&views)?);
    Ok(())
}

/// `name=default (description)` per parameter, `<required>` when there is no default
pub fn format_parameters(snippet: &Snippet) -> String {
    snippet
        .parameters()
        .values()
        .map(|p| {
            let mut text = format!("{}={}", p.name, p.default.as_deref().unwrap_or("<required>"));
            if let Some(description) = &p.description {
                text.push_str(&format!(" ({description})"));
            }
            text
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Two lines per snippet: id and command, then description, tags and alias
pub fn print_summary(snippets: &[&Snippet]) {
    for snippet in snippets {
        println!("{}  {}", style(snippet.id()).blue(), style(snippet.command()).cyan());

        let mut details = Vec::new();
        if !snippet.description().is_empty() {
            details.push(snippet.description().to_string());
        }
        if !snippet.tags().is_empty() {
            details.push(style(format!("[{}]", snippet.tags().join(", "))).yellow().to_string());
        }
        if let Some(alias) = snippet.alias() {
            details.push(style(format!("alias: {alias}")).magenta().to_string());
        }
        if !details.is_empty() {
            println!("    {}", details.join("  "));
        }
    }
}

pub fn print_detail(snippet: &Snippet) {
    println!("{} {}", style("id:").bold(), snippet.id());
    println!("{} {}", style("command:").bold(), style(snippet.command()).cyan());
    if !snippet.description().is_empty() {
        println!("{} {}", style("description:").bold(), snippet.description());
    }
    if !snippet.tags().is_empty() {
        println!("{} {}", style("tags:").bold(), snippet.tags().join(", "));
    }
    if let Some(alias) = snippet.alias() {
        println!("{} {}", style("alias:").bold(), alias);
    }
    if snippet.has_parameters() {
        println!("{}", style("parameters:").bold());
        for p in snippet.parameters().values() {
            let mut line = format!("  {}", style(&p.name).magenta());
            match &p.default {
                Some(default) => line.push_str(&format!(" = {default}")),
                None => line.push_str(" (required)"),
            }
            if let Some(description) = &p.description {
                line.push_str(&format!("  - {description}"));
            }
            println!("{line}");
        }
    }
    println!(
        "{} {}",
        style("created:").bold(),
        snippet.created_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "{} {}",
        style("updated:").bold(),
        snippet.updated_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
}
