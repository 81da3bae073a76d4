// crates/cmdstash-core/src/snippet.rs - Snippet entity and its invariants

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::alias::is_valid_alias_name;
use crate::error::{Error, Result};
use crate::template::{Parameter, ParameterEngine};

/// Opaque, immutable snippet identifier
///
/// New ids are UUIDv7 strings: time-ordered, so sorting by id follows creation
/// order, and made only of hex digits and '-', so they are safe in URLs,
/// filenames and TOML bare keys. Ids written by other tools are accepted as
/// long as they stay within `[A-Za-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnippetId(String);

impl SnippetId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Parse an existing identifier
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::Validation("snippet id cannot be empty".to_string()));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::Validation(format!(
                "snippet id '{value}' may only contain letters, digits, '-' and '_'"
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SnippetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SnippetId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SnippetId> for String {
    fn from(id: SnippetId) -> Self {
        id.0
    }
}

impl Borrow<str> for SnippetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Partial update of a snippet; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct SnippetUpdate {
    pub command: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    /// `Some(None)` removes the alias
    pub alias: Option<Option<String>>,
}

impl SnippetUpdate {
    pub fn is_empty(&self) -> bool {
        self.command.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.alias.is_none()
    }
}

/// A stored shell command together with its metadata
///
/// INVARIANTS:
/// - `command` is non-empty and a well-formed template
/// - `parameters` has exactly one entry per placeholder name in `command`,
///   in first-appearance order
/// - `id` and `created_at` never change after creation
/// - `updated_at >= created_at`, and every update moves it forward
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    id: SnippetId,
    command: String,
    description: String,
    tags: Vec<String>,
    alias: Option<String>,
    parameters: IndexMap<String, Parameter>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Snippet {
    /// Create a new snippet with a fresh id and both timestamps set to now
    pub fn new<I, S>(command: &str, description: &str, tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let command = validate_command(command)?;
        let parameters = parameter_table(&command)?;
        let now = Utc::now();

        Ok(Self {
            id: SnippetId::generate(),
            command,
            description: description.trim().to_string(),
            tags: normalize_tags(tags),
            alias: None,
            parameters,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild a snippet from persisted fields
    ///
    /// The parameter table is reconciled against the command: annotations
    /// stored for names still present are kept, missing names are added and
    /// orphaned entries dropped. Returns a human-readable diagnostic when the
    /// fields cannot form a valid snippet.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: SnippetId,
        command: &str,
        description: &str,
        tags: Vec<String>,
        alias: Option<String>,
        stored: IndexMap<String, Parameter>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> std::result::Result<Self, String> {
        let command = validate_command(command).map_err(|e| e.to_string())?;
        let mut parameters = parameter_table(&command).map_err(|e| e.to_string())?;

        for (name, parameter) in parameters.iter_mut() {
            if let Some(saved) = stored.get(name) {
                parameter.default = saved.default.clone();
                parameter.description = saved.description.clone();
            }
        }

        if let Some(alias) = &alias {
            if !is_valid_alias_name(alias) {
                return Err(format!("invalid alias '{alias}'"));
            }
        }

        Ok(Self {
            id,
            command,
            description: description.trim().to_string(),
            tags: normalize_tags(tags),
            alias,
            parameters,
            created_at,
            updated_at,
        })
    }

    /// Apply a partial update
    ///
    /// Every call refreshes `updated_at`, even when the new values equal the
    /// old ones. Parameters are re-extracted only when the command text
    /// actually changes, and then the old table (including any defaults or
    /// descriptions set by hand) is replaced wholesale.
    ///
    /// All inputs are validated before anything is modified.
    pub fn update(&mut self, changes: SnippetUpdate) -> Result<()> {
        let command = match changes.command {
            Some(command) => {
                let command = validate_command(&command)?;
                if command != self.command {
                    let parameters = parameter_table(&command)?;
                    Some((command, parameters))
                } else {
                    None
                }
            }
            None => None,
        };

        if let Some(Some(alias)) = &changes.alias {
            validate_alias(alias)?;
        }

        if let Some((command, parameters)) = command {
            self.command = command;
            self.parameters = parameters;
        }
        if let Some(description) = changes.description {
            self.description = description.trim().to_string();
        }
        if let Some(tags) = changes.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(alias) = changes.alias {
            self.alias = alias.map(|a| a.trim().to_string());
        }

        self.touch();
        Ok(())
    }

    /// Set or clear the default of an extracted parameter
    pub fn set_parameter_default(&mut self, name: &str, default: Option<String>) -> Result<()> {
        self.parameter_mut(name)?.default = default;
        self.touch();
        Ok(())
    }

    /// Set or clear the human-readable description of an extracted parameter
    pub fn set_parameter_description(
        &mut self,
        name: &str,
        description: Option<String>,
    ) -> Result<()> {
        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.parameter_mut(name)?.description = description;
        self.touch();
        Ok(())
    }

    /// Case-insensitive substring match over command, description and tags
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.command.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }

    /// Case-insensitive exact tag match
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn id(&self) -> &SnippetId {
        &self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn parameters(&self) -> &IndexMap<String, Parameter> {
        &self.parameters
    }

    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn parameter_mut(&mut self, name: &str) -> Result<&mut Parameter> {
        let id = self.id.clone();
        self.parameters.get_mut(name).ok_or_else(|| {
            Error::Validation(format!(
                "snippet {id} has no parameter named '{name}'"
            ))
        })
    }

    /// Move `updated_at` strictly forward
    fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}

fn validate_command(command: &str) -> Result<String> {
    let command = command.trim();
    if command.is_empty() {
        return Err(Error::Validation("command cannot be empty".to_string()));
    }
    Ok(command.to_string())
}

fn validate_alias(alias: &str) -> Result<()> {
    if is_valid_alias_name(alias.trim()) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "invalid alias '{alias}': use letters, digits, '_' or '-', not starting with a digit or '-'"
        )))
    }
}

/// Extracts the parameter table of a command; template errors are reported
/// as validation failures of the snippet
fn parameter_table(command: &str) -> Result<IndexMap<String, Parameter>> {
    let parameters = ParameterEngine::extract(command)
        .map_err(|e| Error::Validation(format!("malformed command template: {e}")))?;
    Ok(parameters
        .into_iter()
        .map(|p| (p.name.clone(), p))
        .collect())
}

/// Trim tags, drop empty ones and remove duplicates keeping the first occurrence
fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}
