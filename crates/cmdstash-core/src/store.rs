// crates/cmdstash-core/src/store.rs - TOML snippet store
//
// The whole collection lives in one human-editable TOML file:
//
// ```toml
// [snippets.0190f5a2-8c1e-7c3a-9d2b-5f0e4b1a2c3d]
// command = "docker run -p {port}:80 {image}"
// description = "Run a container"
// tags = ["docker"]
// created_at = "2024-06-01T09:30:00.123456+00:00"
// updated_at = "2024-06-01T09:30:00.123456+00:00"
//
// [snippets.0190f5a2-8c1e-7c3a-9d2b-5f0e4b1a2c3d.parameters.port]
// name = "port"
// ```
//
// DESIGN PRINCIPLES:
// - Load wholesale, save wholesale: the file is small and the process is short-lived
// - Atomic writes: temp file in the same directory, then rename over the target
// - Deterministic output: snippets ordered by id, parameters in template order,
//   so version-control diffs stay minimal
// - Forward compatible: unknown top-level keys are carried through untouched
//
// CONCURRENCY:
// No lock is held between load and save. Two invocations racing on the same
// file resolve as last-write-wins; readers never observe a partial write.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::snippet::{Snippet, SnippetId, SnippetUpdate};
use crate::template::Parameter;

/// On-disk shape of the store file
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    snippets: BTreeMap<String, SnippetRecord>,

    /// Top-level keys this version does not know about
    #[serde(flatten)]
    extra: toml::Table,
}

/// On-disk shape of one snippet; the id is the table key
#[derive(Debug, Serialize, Deserialize)]
struct SnippetRecord {
    command: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    parameters: IndexMap<String, Parameter>,
}

impl From<&Snippet> for SnippetRecord {
    fn from(snippet: &Snippet) -> Self {
        Self {
            command: snippet.command().to_string(),
            description: snippet.description().to_string(),
            tags: snippet.tags().to_vec(),
            alias: snippet.alias().map(str::to_string),
            created_at: snippet.created_at(),
            updated_at: snippet.updated_at(),
            parameters: snippet.parameters().clone(),
        }
    }
}

/// RFC-3339 timestamps with an explicit `+00:00` offset and full precision
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
    }
}

/// In-memory snippet collection keyed by id
///
/// Iteration order is id order, which for generated ids is creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    snippets: BTreeMap<SnippetId, Snippet>,
    extra: toml::Table,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snippet; id and alias collisions are rejected
    pub fn add(&mut self, snippet: Snippet) -> Result<&Snippet> {
        if self.snippets.contains_key(snippet.id()) {
            return Err(Error::Validation(format!(
                "a snippet with id {} already exists",
                snippet.id()
            )));
        }
        if let Some(alias) = snippet.alias() {
            self.ensure_alias_free(alias, None)?;
        }

        let id = snippet.id().clone();
        Ok(&*self.snippets.entry(id).or_insert(snippet))
    }

    /// Remove a snippet, returning it
    pub fn remove(&mut self, id: &str) -> Result<Snippet> {
        self.snippets
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Result<&Snippet> {
        self.snippets
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Look a snippet up by id, falling back to its alias
    pub fn lookup(&self, key: &str) -> Result<&Snippet> {
        self.get(key)
            .or_else(|_| self.by_alias(key).ok_or_else(|| Error::NotFound(key.to_string())))
    }

    /// Apply a partial update to the snippet with `id`
    pub fn update(&mut self, id: &str, changes: SnippetUpdate) -> Result<&Snippet> {
        if let Some(Some(alias)) = &changes.alias {
            self.ensure_alias_free(alias.trim(), Some(id))?;
        }
        let snippet = self.get_mut(id)?;
        snippet.update(changes)?;
        Ok(&*snippet)
    }

    pub fn set_parameter_default(
        &mut self,
        id: &str,
        name: &str,
        default: Option<String>,
    ) -> Result<&Snippet> {
        let snippet = self.get_mut(id)?;
        snippet.set_parameter_default(name, default)?;
        Ok(&*snippet)
    }

    pub fn set_parameter_description(
        &mut self,
        id: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<&Snippet> {
        let snippet = self.get_mut(id)?;
        snippet.set_parameter_description(name, description)?;
        Ok(&*snippet)
    }

    /// Snippets satisfying `predicate`, in collection order
    pub fn find<P>(&self, predicate: P) -> Vec<&Snippet>
    where
        P: Fn(&Snippet) -> bool,
    {
        self.snippets.values().filter(|s| predicate(s)).collect()
    }

    /// Case-insensitive substring search over command, description and tags
    pub fn search(&self, query: &str) -> Vec<&Snippet> {
        self.find(|s| s.matches(query))
    }

    pub fn with_tag(&self, tag: &str) -> Vec<&Snippet> {
        self.find(|s| s.has_tag(tag))
    }

    pub fn by_alias(&self, alias: &str) -> Option<&Snippet> {
        self.snippets.values().find(|s| s.alias() == Some(alias))
    }

    /// Every tag in use with the number of snippets carrying it
    pub fn tag_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for tag in self.snippets.values().flat_map(|s| s.tags()) {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snippet> {
        self.snippets.values()
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Three-way merge at snippet granularity
    ///
    /// A snippet changed (or deleted) on one side only takes that side's
    /// version. A snippet changed differently on both sides is a conflict;
    /// the ids of all such snippets are returned as the error. Unknown
    /// top-level keys come from `ours`.
    pub fn merge(base: &Self, ours: &Self, theirs: &Self) -> std::result::Result<Self, Vec<String>> {
        let ids: BTreeSet<&SnippetId> = ours
            .snippets
            .keys()
            .chain(theirs.snippets.keys())
            .chain(base.snippets.keys())
            .collect();

        let mut merged = Self {
            snippets: BTreeMap::new(),
            extra: ours.extra.clone(),
        };
        let mut conflicts = Vec::new();

        for id in ids {
            let b = base.snippets.get(id);
            let o = ours.snippets.get(id);
            let t = theirs.snippets.get(id);

            let chosen = if o == t || t == b {
                o
            } else if o == b {
                t
            } else {
                conflicts.push(id.to_string());
                continue;
            };

            if let Some(snippet) = chosen {
                if merged.add(snippet.clone()).is_err() {
                    conflicts.push(id.to_string());
                }
            }
        }

        if conflicts.is_empty() {
            Ok(merged)
        } else {
            Err(conflicts)
        }
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Snippet> {
        self.snippets
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn ensure_alias_free(&self, alias: &str, owner: Option<&str>) -> Result<()> {
        match self.by_alias(alias) {
            Some(existing) if Some(existing.id().as_str()) != owner => Err(Error::Validation(
                format!("alias '{alias}' is already used by snippet {}", existing.id()),
            )),
            _ => Ok(()),
        }
    }

    fn from_document(document: StoreDocument, path: &Path) -> Result<Self> {
        let corrupt = |diagnostic: String| Error::CorruptStore {
            path: path.to_path_buf(),
            diagnostic,
        };

        let mut collection = Self {
            snippets: BTreeMap::new(),
            extra: document.extra,
        };

        for (key, record) in document.snippets {
            let id = SnippetId::parse(&key).map_err(|e| corrupt(e.to_string()))?;
            let snippet = Snippet::restore(
                id,
                &record.command,
                &record.description,
                record.tags,
                record.alias,
                record.parameters,
                record.created_at,
                record.updated_at,
            )
            .map_err(|diagnostic| corrupt(format!("snippet {key}: {diagnostic}")))?;

            collection
                .add(snippet)
                .map_err(|e| corrupt(e.to_string()))?;
        }

        Ok(collection)
    }

    fn to_document(&self) -> StoreDocument {
        StoreDocument {
            snippets: self
                .snippets
                .iter()
                .map(|(id, snippet)| (id.to_string(), SnippetRecord::from(snippet)))
                .collect(),
            extra: self.extra.clone(),
        }
    }
}

/// Read the collection stored at `path`
///
/// A missing file is the first-run case and yields an empty collection.
/// A file that exists but does not parse is `CorruptStore`; it is never
/// repaired or rewritten here.
pub fn load(path: &Path) -> Result<Collection> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "store file missing, starting empty");
            return Ok(Collection::new());
        }
        Err(e) => return Err(Error::Io(e)),
    };

    let collection = parse(&content, path)?;
    debug!(path = %path.display(), snippets = collection.len(), "loaded store");
    Ok(collection)
}

/// Parse store text; `path` is only used for diagnostics
pub fn parse(content: &str, path: &Path) -> Result<Collection> {
    let document: StoreDocument = toml::from_str(content).map_err(|e| Error::CorruptStore {
        path: path.to_path_buf(),
        diagnostic: e.to_string(),
    })?;

    Collection::from_document(document, path)
}

/// Serialize the collection to TOML text
pub fn render(collection: &Collection) -> Result<String> {
    toml::to_string(&collection.to_document())
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Write the full collection to `path` atomically
pub fn save(collection: &Collection, path: &Path) -> Result<()> {
    let content = render(collection)?;
    write_atomic(path, content.as_bytes())?;
    debug!(path = %path.display(), snippets = collection.len(), "saved store");
    Ok(())
}

/// Write `content` to a temp file next to `path`, then rename it into place
///
/// The rename is atomic on the same filesystem, so readers see either the old
/// file or the new one.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    let tmp_path = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// A collection bound to the file it was loaded from
///
/// This is what a single CLI invocation holds: open, mutate, save, exit.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    collection: Collection,
}

impl Store {
    /// Load the store at `path` (empty if the file does not exist yet)
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let collection = load(&path)?;
        Ok(Self { path, collection })
    }

    pub fn save(&self) -> Result<()> {
        save(&self.collection, &self.path)
    }

    /// Replace the in-memory collection with the file's current content
    pub fn reload(&mut self) -> Result<()> {
        self.collection = load(&self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut Collection {
        &mut self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Collection {
        let mut collection = Collection::new();
        let mut docker = Snippet::new(
            "docker run -p {port}:80 -e ENV={env=development} {image}",
            "Run a container",
            ["docker", "containers"],
        )
        .unwrap();
        docker
            .set_parameter_description("port", Some("Host port".to_string()))
            .unwrap();
        collection.add(docker).unwrap();
        collection
            .add(Snippet::new("git status", "", ["git"]).unwrap())
            .unwrap();
        collection
    }

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snippets.toml");
        let collection = sample();

        save(&collection, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, collection);

        // a second round trip produces identical bytes
        let first = fs::read(&path).unwrap();
        save(&loaded, &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_file_layout() {
        let collection = sample();
        let docker = collection.search("docker")[0];
        let text = render(&collection).unwrap();

        assert!(text.contains(&format!("[snippets.{}]", docker.id())));
        assert!(text.contains(&format!("[snippets.{}.parameters.port]", docker.id())));
        assert!(text.contains("name = \"env\""));
        assert!(text.contains("default = \"development\""));
        assert!(text.contains("+00:00\""));
        // snippets without parameters get no parameters table
        let git = collection.search("git status")[0];
        assert!(!text.contains(&format!("[snippets.{}.parameters", git.id())));
    }

    #[test]
    fn test_load_nonexistent_path_is_empty() {
        let temp = TempDir::new().unwrap();
        let loaded = load(&temp.path().join("missing.toml")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_reported_and_left_alone() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snippets.toml");
        let garbage = "[snippets.abc\ncommand = \"ls\n";
        fs::write(&path, garbage).unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptStore { .. }), "got {err:?}");
        assert_eq!(fs::read_to_string(&path).unwrap(), garbage);
    }

    #[test]
    fn test_invalid_command_in_file_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snippets.toml");
        fs::write(
            &path,
            r#"[snippets.abc]
command = "echo {unclosed"
created_at = "2024-01-01T00:00:00+00:00"
updated_at = "2024-01-01T00:00:00+00:00"
"#,
        )
        .unwrap();

        match load(&path).unwrap_err() {
            Error::CorruptStore { diagnostic, .. } => assert!(diagnostic.contains("abc")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_hand_written_file_without_parameter_tables() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snippets.toml");
        fs::write(
            &path,
            r#"[snippets.20240101120000123456]
command = "ssh {user}@{host}"
tags = ["ssh"]
created_at = "2024-01-01T12:00:00.123456+00:00"
updated_at = "2024-01-01T12:00:00.123456+00:00"
"#,
        )
        .unwrap();

        let loaded = load(&path).unwrap();
        let snippet = loaded.get("20240101120000123456").unwrap();
        assert_eq!(snippet.description(), "");
        let names: Vec<&str> = snippet.parameters().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["user", "host"]);
    }

    #[test]
    fn test_unknown_top_level_keys_survive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snippets.toml");
        fs::write(
            &path,
            "format_version = 2\n\n[settings]\ntheme = \"dark\"\n\n[snippets]\n",
        )
        .unwrap();

        let mut loaded = load(&path).unwrap();
        loaded
            .add(Snippet::new("uptime", "", ["sys"]).unwrap())
            .unwrap();
        save(&loaded, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("format_version = 2"));
        assert!(text.contains("theme = \"dark\""));
        assert_eq!(load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("snippets.toml");
        save(&sample(), &path).unwrap();

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_remove_then_get_is_not_found() {
        let mut collection = sample();
        let id = collection.iter().next().unwrap().id().to_string();

        collection.remove(&id).unwrap();
        assert!(matches!(collection.get(&id), Err(Error::NotFound(_))));
        assert!(matches!(collection.remove(&id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_add_rejects_duplicate_id_and_alias() {
        let mut collection = Collection::new();
        let snippet = Snippet::new("ls", "", ["fs"]).unwrap();
        collection.add(snippet.clone()).unwrap();
        assert!(matches!(
            collection.add(snippet.clone()),
            Err(Error::Validation(_))
        ));

        let id = snippet.id().to_string();
        collection
            .update(
                &id,
                SnippetUpdate {
                    alias: Some(Some("l".to_string())),
                    ..Default::default()
                },
            )
            .unwrap();

        let other = Snippet::new("ls -la", "", ["fs"]).unwrap();
        let other_id = other.id().to_string();
        collection.add(other).unwrap();
        let result = collection.update(
            &other_id,
            SnippetUpdate {
                alias: Some(Some("l".to_string())),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::Validation(_))));

        // re-assigning a snippet its own alias is fine
        collection
            .update(
                &id,
                SnippetUpdate {
                    alias: Some(Some("l".to_string())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(collection.lookup("l").unwrap().id().as_str(), id);
    }

    #[test]
    fn test_search_is_case_insensitive_and_ordered() {
        let collection = sample();
        let hits = collection.search("DOCKER");
        assert_eq!(hits.len(), 1);
        assert_eq!(collection.search("run a").len(), 1);
        assert_eq!(collection.search("GIT").len(), 1);
        assert!(collection.search("kubectl").is_empty());

        let all = collection.search("");
        let ids: Vec<_> = all.iter().map(|s| s.id().clone()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_find_and_tags() {
        let collection = sample();
        assert_eq!(collection.find(|s| s.has_parameters()).len(), 1);
        assert_eq!(collection.with_tag("GIT").len(), 1);
        let counts = collection.tag_counts();
        assert_eq!(counts.get("docker"), Some(&1));
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_store_open_save_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snippets.toml");

        let mut store = Store::open(&path).unwrap();
        assert!(store.collection().is_empty());
        store
            .collection_mut()
            .add(Snippet::new("df -h", "Disk usage", ["sys"]).unwrap())
            .unwrap();
        store.save().unwrap();

        let mut other = Store::open(&path).unwrap();
        assert_eq!(other.collection(), store.collection());

        let id = store.collection().iter().next().unwrap().id().to_string();
        store.collection_mut().remove(&id).unwrap();
        store.save().unwrap();
        other.reload().unwrap();
        assert!(other.collection().is_empty());
    }

    fn describe(collection: &mut Collection, id: &str, text: &str) {
        collection
            .update(
                id,
                SnippetUpdate {
                    description: Some(text.to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn test_merge_takes_one_sided_changes() {
        let base = sample();
        let ids: Vec<String> = base.iter().map(|s| s.id().to_string()).collect();

        let mut ours = base.clone();
        ours.add(Snippet::new("uptime", "", ["sys"]).unwrap()).unwrap();
        describe(&mut ours, &ids[0], "edited here");

        let mut theirs = base.clone();
        theirs.add(Snippet::new("whoami", "", ["sys"]).unwrap()).unwrap();
        theirs.remove(&ids[1]).unwrap();

        let merged = Collection::merge(&base, &ours, &theirs).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(&ids[0]).unwrap().description(), "edited here");
        assert!(merged.get(&ids[1]).is_err());
        assert_eq!(merged.search("uptime").len(), 1);
        assert_eq!(merged.search("whoami").len(), 1);
    }

    #[test]
    fn test_merge_reports_snippets_edited_on_both_sides() {
        let base = sample();
        let id = base.iter().next().unwrap().id().to_string();

        let mut ours = base.clone();
        describe(&mut ours, &id, "mine");
        let mut theirs = base.clone();
        describe(&mut theirs, &id, "theirs");

        assert_eq!(Collection::merge(&base, &ours, &theirs), Err(vec![id]));
    }

    #[test]
    fn test_parse_reports_given_path() {
        let err = parse("snippets = 3", Path::new("remote:snippets.toml")).unwrap_err();
        match err {
            Error::CorruptStore { path, .. } => {
                assert_eq!(path, PathBuf::from("remote:snippets.toml"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
