// crates/cmdstash-core/tests/workflow.rs - Store and template engine together

use std::collections::HashMap;

use cmdstash_core::{AliasManager, Error, ParameterEngine, Snippet, SnippetUpdate, Store};
use tempfile::TempDir;

fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_create_save_reload_resolve() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snippets.toml");

    let mut store = Store::open(&path).unwrap();
    let mut snippet = Snippet::new(
        "docker run -p {port}:80 -e ENV={env=development} {image}",
        "Run a container",
        ["docker"],
    )
    .unwrap();
    snippet
        .set_parameter_default("port", Some("8080".to_string()))
        .unwrap();
    let id = snippet.id().to_string();
    store.collection_mut().add(snippet).unwrap();
    store.save().unwrap();

    let reopened = Store::open(&path).unwrap();
    let snippet = reopened.collection().get(&id).unwrap();
    let names: Vec<&str> = snippet.parameters().keys().map(String::as_str).collect();
    assert_eq!(names, ["port", "env", "image"]);

    let command = ParameterEngine::resolve(
        snippet.command(),
        snippet.parameters(),
        &values(&[("image", "nginx")]),
    )
    .unwrap();
    assert_eq!(command, "docker run -p 8080:80 -e ENV=development nginx");

    let err = ParameterEngine::resolve(snippet.command(), snippet.parameters(), &HashMap::new())
        .unwrap_err();
    match err {
        Error::MissingParameter(names) => assert_eq!(names, ["image"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_command_edit_replaces_parameters_and_survives_reload() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snippets.toml");

    let mut store = Store::open(&path).unwrap();
    let snippet = Snippet::new("ssh {host}", "", ["ssh"]).unwrap();
    let id = snippet.id().to_string();
    store.collection_mut().add(snippet).unwrap();
    store
        .collection_mut()
        .set_parameter_default(&id, "host", Some("db1".to_string()))
        .unwrap();
    store
        .collection_mut()
        .update(
            &id,
            SnippetUpdate {
                command: Some("ssh {user}@{host}".to_string()),
                alias: Some(Some("go".to_string())),
                ..Default::default()
            },
        )
        .unwrap();
    store.save().unwrap();

    let reopened = Store::open(&path).unwrap();
    let snippet = reopened.collection().lookup("go").unwrap();
    assert_eq!(snippet.id().as_str(), id);
    assert_eq!(snippet.parameters().len(), 2);
    // the table was rebuilt, so the old default is gone
    assert!(snippet.parameters()["host"].default.is_none());
    assert!(snippet.updated_at() > snippet.created_at());

    let script = AliasManager::new(temp.path().join("aliases.sh"))
        .render(reopened.collection(), "cmdstash");
    assert!(script.contains("go() {"));
}
