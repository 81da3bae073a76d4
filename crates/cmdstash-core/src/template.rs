// crates/cmdstash-core/src/template.rs - Parameterised command templates
//
// A snippet command is a template: plain shell text with named placeholders
// that are filled in right before the command is executed.
//
// DESIGN PRINCIPLES:
// - Pure functions: No I/O, only string processing
// - Fail-fast: Malformed placeholders are rejected when a snippet is created,
//   not when it is executed months later
// - Textual: Substitution is a single left-to-right pass; substituted values
//   are never scanned again
//
// TEMPLATE FORMAT:
// - {name}          required parameter
// - {name=default}  optional parameter, the default may be empty ({name=})
// - {{ and }}       literal braces, e.g. `find . -name '*.log' -exec rm {{}} \;`
//
// A lone `}` outside a placeholder is ordinary text.
//
// EXAMPLE:
// ```text
// docker run -p {port}:80 -e ENV={env=development} {image}
// ```
// declares `port` (required), `env` (default "development") and `image`
// (required), in that order.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

use crate::error::{Error, Result};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern compiles"));

/// Placeholder syntax errors. Positions are byte offsets into the template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed placeholder starting at byte {position}")]
    Unclosed { position: usize },

    #[error("placeholder at byte {position} has an empty name")]
    EmptyName { position: usize },

    #[error("nested '{{' inside the placeholder starting at byte {position}")]
    Nested { position: usize },

    #[error(
        "invalid parameter name '{name}' at byte {position} (expected letters, digits or '_', not starting with a digit)"
    )]
    InvalidName { name: String, position: usize },
}

/// Result type for template scanning
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

/// A named value a command template expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    /// Presence makes the parameter optional at resolution time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Shown to a human when the value is prompted for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A parameter without a default must be supplied explicitly
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// One placeholder occurrence in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    /// Inline default of this occurrence (`{name=default}`)
    pub default: Option<String>,
    /// Byte offset of the opening brace
    pub position: usize,
}

/// Scanned template: literal text interleaved with placeholders
#[derive(Debug)]
enum Segment {
    Literal(String),
    Slot(Placeholder),
}

/// Returns true when `name` is a valid parameter identifier
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Parameter extraction and resolution
///
/// All methods are pure: identical inputs always produce identical output,
/// which keeps the engine testable without a terminal.
pub struct ParameterEngine;

impl ParameterEngine {
    /// Extracts the parameters a template declares, in left-to-right order
    ///
    /// Duplicate names collapse into one parameter and the FIRST occurrence's
    /// default wins: `echo {x=1} {x=2}` declares a single `x` defaulting to "1".
    ///
    /// EXAMPLES:
    /// - "ls -la" -> []
    /// - "ssh {user}@{host} -p {port=22}" -> [user, host, port="22"]
    pub fn extract(template: &str) -> TemplateResult<Vec<Parameter>> {
        let mut parameters: Vec<Parameter> = Vec::new();

        for placeholder in Self::placeholders(template)? {
            if parameters.iter().any(|p| p.name == placeholder.name) {
                continue;
            }
            parameters.push(Parameter {
                name: placeholder.name,
                default: placeholder.default,
                description: None,
            });
        }

        Ok(parameters)
    }

    /// Lists every placeholder occurrence, duplicates included
    pub fn placeholders(template: &str) -> TemplateResult<Vec<Placeholder>> {
        Ok(scan(template)?
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Slot(placeholder) => Some(placeholder),
                Segment::Literal(_) => None,
            })
            .collect())
    }

    /// Substitutes values into a template
    ///
    /// For each placeholder the value is taken from, in order:
    /// 1. `values`
    /// 2. the default of the matching entry in `parameters`
    ///
    /// The table is authoritative: an entry without a default is required even
    /// when the template writes `{name=default}`. The inline default is only
    /// used for names the table has no entry for.
    ///
    /// If none applies the parameter is missing. All missing names are
    /// collected (in template order) into a single `MissingParameter` error.
    /// Names in `values` that the template never mentions are ignored.
    pub fn resolve(
        template: &str,
        parameters: &IndexMap<String, Parameter>,
        values: &HashMap<String, String>,
    ) -> Result<String> {
        let segments = scan(template)?;
        let mut output = String::with_capacity(template.len());
        let mut missing: Vec<String> = Vec::new();

        for segment in segments {
            match segment {
                Segment::Literal(text) => output.push_str(&text),
                Segment::Slot(placeholder) => {
                    let fallback = match parameters.get(&placeholder.name) {
                        Some(parameter) => parameter.default.as_ref(),
                        None => placeholder.default.as_ref(),
                    };
                    let value = values.get(&placeholder.name).or(fallback);

                    match value {
                        Some(value) => output.push_str(value),
                        None => {
                            if !missing.contains(&placeholder.name) {
                                missing.push(placeholder.name);
                            }
                        }
                    }
                }
            }
        }

        if missing.is_empty() {
            Ok(output)
        } else {
            Err(Error::MissingParameter(missing))
        }
    }

    /// Names of the parameters that still need a value before `resolve` can succeed
    pub fn unresolved(
        parameters: &IndexMap<String, Parameter>,
        values: &HashMap<String, String>,
    ) -> Vec<String> {
        parameters
            .values()
            .filter(|p| p.is_required() && !values.contains_key(&p.name))
            .map(|p| p.name.clone())
            .collect()
    }
}

/// Splits a template into literal text and placeholders
fn scan(template: &str) -> TemplateResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '{' => {
                if chars.next_if(|&(_, next)| next == '{').is_some() {
                    literal.push('{');
                    continue;
                }

                let mut body = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    match inner {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(TemplateError::Nested { position: index }),
                        _ => body.push(inner),
                    }
                }
                if !closed {
                    return Err(TemplateError::Unclosed { position: index });
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Slot(parse_body(&body, index)?));
            }
            '}' => {
                // "}}" is an escaped brace, a single "}" is plain text
                chars.next_if(|&(_, next)| next == '}');
                literal.push('}');
            }
            _ => literal.push(ch),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

fn parse_body(body: &str, position: usize) -> TemplateResult<Placeholder> {
    let (name, default) = match body.split_once('=') {
        Some((name, default)) => (name, Some(default.to_string())),
        None => (body, None),
    };

    if name.is_empty() {
        return Err(TemplateError::EmptyName { position });
    }
    if !is_valid_name(name) {
        return Err(TemplateError::InvalidName {
            name: name.to_string(),
            position,
        });
    }

    Ok(Placeholder {
        name: name.to_string(),
        default,
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCKER: &str = "docker run -p {port}:80 -e ENV={env=development} {image}";

    fn table(template: &str) -> IndexMap<String, Parameter> {
        ParameterEngine::extract(template)
            .unwrap()
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect()
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_in_template_order() {
        let params = ParameterEngine::extract(DOCKER).unwrap();
        assert_eq!(
            params,
            vec![
                Parameter::new("port"),
                Parameter::new("env").with_default("development"),
                Parameter::new("image"),
            ]
        );
        assert!(params[0].is_required());
        assert!(!params[1].is_required());
    }

    #[test]
    fn test_extract_without_placeholders() {
        assert!(ParameterEngine::extract("ls -la").unwrap().is_empty());
        assert!(ParameterEngine::extract("").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_names_keep_first_default() {
        let params = ParameterEngine::extract("echo {x=1} {y} {x=2} {x}").unwrap();
        assert_eq!(
            params,
            vec![Parameter::new("x").with_default("1"), Parameter::new("y")]
        );

        // A later default does not make an earlier required occurrence optional
        let params = ParameterEngine::extract("echo {x} {x=2}").unwrap();
        assert_eq!(params, vec![Parameter::new("x")]);
    }

    #[test]
    fn test_default_split_on_first_equals() {
        let params = ParameterEngine::extract("env {assign=A=B} {blank=}").unwrap();
        assert_eq!(params[0].default.as_deref(), Some("A=B"));
        assert_eq!(params[1].default.as_deref(), Some(""));
    }

    #[test]
    fn test_malformed_placeholders() {
        assert_eq!(
            ParameterEngine::extract("echo {missing_closing"),
            Err(TemplateError::Unclosed { position: 5 })
        );
        assert_eq!(
            ParameterEngine::extract("echo {} and {valid}"),
            Err(TemplateError::EmptyName { position: 5 })
        );
        assert_eq!(
            ParameterEngine::extract("echo {=x}"),
            Err(TemplateError::EmptyName { position: 5 })
        );
        assert_eq!(
            ParameterEngine::extract("echo {outer{inner}}"),
            Err(TemplateError::Nested { position: 5 })
        );
        assert!(matches!(
            ParameterEngine::extract("awk '{print $1}'"),
            Err(TemplateError::InvalidName { .. })
        ));
        assert!(matches!(
            ParameterEngine::extract("echo {1st}"),
            Err(TemplateError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_escaped_braces_are_literal() {
        let template = "find . -name {pattern} -exec rm {{}} \\;";
        let params = ParameterEngine::extract(template).unwrap();
        assert_eq!(params, vec![Parameter::new("pattern")]);

        let resolved =
            ParameterEngine::resolve(template, &table(template), &values(&[("pattern", "*.log")]))
                .unwrap();
        assert_eq!(resolved, "find . -name *.log -exec rm {} \\;");

        // a lone closing brace is plain text
        let resolved = ParameterEngine::resolve("echo }", &IndexMap::new(), &HashMap::new()).unwrap();
        assert_eq!(resolved, "echo }");
    }

    #[test]
    fn test_resolve_uses_values_then_defaults() {
        let resolved = ParameterEngine::resolve(
            DOCKER,
            &table(DOCKER),
            &values(&[("port", "3000"), ("image", "node:18")]),
        )
        .unwrap();
        assert_eq!(resolved, "docker run -p 3000:80 -e ENV=development node:18");

        let resolved = ParameterEngine::resolve(
            DOCKER,
            &table(DOCKER),
            &values(&[("port", "3000"), ("image", "node:18"), ("env", "production")]),
        )
        .unwrap();
        assert_eq!(resolved, "docker run -p 3000:80 -e ENV=production node:18");
    }

    #[test]
    fn test_resolve_prefers_annotated_default_over_inline() {
        let mut params = table("ssh {host} -p {port=22}");
        params.get_mut("port").unwrap().default = Some("2222".to_string());

        let resolved =
            ParameterEngine::resolve("ssh {host} -p {port=22}", &params, &values(&[("host", "box")]))
                .unwrap();
        assert_eq!(resolved, "ssh box -p 2222");
    }

    #[test]
    fn test_resolve_treats_cleared_default_as_required() {
        let template = "ssh -p {port=22} {host}";
        let mut params = table(template);
        params.get_mut("port").unwrap().default = None;

        assert_eq!(
            ParameterEngine::unresolved(&params, &values(&[("host", "h")])),
            vec!["port".to_string()]
        );
        let err = ParameterEngine::resolve(template, &params, &values(&[("host", "h")]))
            .unwrap_err();
        match err {
            Error::MissingParameter(names) => assert_eq!(names, vec!["port".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_later_inline_default_does_not_fill_required_name() {
        let template = "echo {x} {x=2}";
        let err = ParameterEngine::resolve(template, &table(template), &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter(names) if names == vec!["x".to_string()]));
    }

    #[test]
    fn test_resolve_without_table_uses_inline_defaults() {
        let resolved = ParameterEngine::resolve(
            "ping -c {count=3} {host}",
            &IndexMap::new(),
            &values(&[("host", "h")]),
        )
        .unwrap();
        assert_eq!(resolved, "ping -c 3 h");
    }

    #[test]
    fn test_resolve_reports_exactly_the_missing_required_names() {
        let err = ParameterEngine::resolve(DOCKER, &table(DOCKER), &values(&[("image", "node:18")]))
            .unwrap_err();
        match err {
            Error::MissingParameter(names) => assert_eq!(names, vec!["port".to_string()]),
            other => panic!("unexpected error: {other}"),
        }

        let err = ParameterEngine::resolve(DOCKER, &table(DOCKER), &HashMap::new()).unwrap_err();
        match err {
            Error::MissingParameter(names) => {
                assert_eq!(names, vec!["port".to_string(), "image".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_ignores_unknown_values() {
        let resolved = ParameterEngine::resolve(
            "echo {greeting}",
            &table("echo {greeting}"),
            &values(&[("greeting", "hi"), ("unused", "x")]),
        )
        .unwrap();
        assert_eq!(resolved, "echo hi");
    }

    #[test]
    fn test_resolve_does_not_reexpand_values() {
        let resolved = ParameterEngine::resolve(
            "echo {a} {b}",
            &table("echo {a} {b}"),
            &values(&[("a", "{b}"), ("b", "x")]),
        )
        .unwrap();
        assert_eq!(resolved, "echo {b} x");
    }

    #[test]
    fn test_resolve_replaces_every_occurrence() {
        let template = "cp {file} {file}.bak";
        let resolved =
            ParameterEngine::resolve(template, &table(template), &values(&[("file", "a.txt")]))
                .unwrap();
        assert_eq!(resolved, "cp a.txt a.txt.bak");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let params = table(DOCKER);
        let vals = values(&[("port", "1"), ("image", "alpine")]);
        let first = ParameterEngine::resolve(DOCKER, &params, &vals).unwrap();
        let second = ParameterEngine::resolve(DOCKER, &params, &vals).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unresolved_lists_required_parameters_without_values() {
        let params = table(DOCKER);
        assert_eq!(
            ParameterEngine::unresolved(&params, &values(&[("image", "x")])),
            vec!["port".to_string()]
        );
    }

    #[test]
    fn test_unicode_text_around_placeholders() {
        let template = "echo «{word}» ✓";
        let resolved =
            ParameterEngine::resolve(template, &table(template), &values(&[("word", "hé")])).unwrap();
        assert_eq!(resolved, "echo «hé» ✓");
    }
}
