//! Integration tests for the registry store.

use mcpi_core::error::McpiError;
use mcpi_core::registry::{CommandConfig, RegistryStore, ServerRecord};
use serde_json::Value;
use tempfile::TempDir;

fn record(name: &str) -> ServerRecord {
    ServerRecord::new(name, format!("https://github.com/acme/{}", name), name)
        .with_description(format!("{} server", name))
}

#[test]
fn first_run_persists_empty_registry() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("registry.json");

    let store = RegistryStore::load(&path).unwrap();

    assert!(store.is_empty());
    let content: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(content["servers"].as_object().unwrap().is_empty());
    assert!(content["lastUpdated"].is_string());
}

#[test]
fn register_is_idempotent_and_replaces_fully() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry.json");
    let mut store = RegistryStore::load(&path).unwrap();

    store
        .upsert(record("weather").with_keywords(["forecast"]))
        .unwrap();
    store.upsert(record("maps")).unwrap();
    store.upsert(record("weather")).unwrap();

    assert_eq!(store.len(), 2);
    let names: Vec<&str> = store.list().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["weather", "maps"]);
    assert!(store.get("weather").unwrap().keywords.is_empty());

    let reloaded = RegistryStore::load(&path).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get("maps"), store.get("maps"));
}

#[test]
fn find_matches_substring_but_remove_is_exact() {
    let temp = TempDir::new().unwrap();
    let mut store = RegistryStore::load(temp.path().join("registry.json")).unwrap();
    store.upsert(record("@scope/foo")).unwrap();

    assert_eq!(store.find("foo").unwrap().name, "@scope/foo");
    assert_eq!(store.resolve("foo").unwrap().name, "@scope/foo");
    assert!(store.get("foo").is_none());

    assert!(!store.remove("foo").unwrap());
    assert_eq!(store.len(), 1);

    assert!(store.remove("@scope/foo").unwrap());
    assert!(store.is_empty());
}

#[test]
fn find_returns_first_in_insertion_order() {
    let temp = TempDir::new().unwrap();
    let mut store = RegistryStore::load(temp.path().join("registry.json")).unwrap();
    store.upsert(record("server-git")).unwrap();
    store.upsert(record("server-github")).unwrap();

    assert_eq!(store.find("git").unwrap().name, "server-git");
    assert_eq!(store.resolve("server-github").unwrap().name, "server-github");
}

#[test]
fn remove_of_absent_name_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry.json");
    let mut store = RegistryStore::load(&path).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    assert!(!store.remove("ghost").unwrap());

    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn corrupt_registry_is_reported_by_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry.json");
    std::fs::write(&path, "{\"servers\": [").unwrap();

    let err = RegistryStore::load(&path).unwrap_err();

    assert!(matches!(err, McpiError::CorruptRegistry { .. }));
    assert_eq!(err.code(), "CORRUPT_REGISTRY");
}

#[test]
fn corrupt_registry_is_moved_aside_by_load_or_reset() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry.json");
    std::fs::write(&path, "not json at all").unwrap();

    let store = RegistryStore::load_or_reset(&path).unwrap();

    assert!(store.is_empty());
    let backup = temp.path().join("registry.json.corrupt");
    assert_eq!(std::fs::read_to_string(backup).unwrap(), "not json at all");
    assert!(RegistryStore::load(&path).unwrap().is_empty());
}

#[test]
fn command_config_round_trips_through_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry.json");
    let mut store = RegistryStore::load(&path).unwrap();
    store.upsert(record("weather")).unwrap();

    let config = CommandConfig::new("node", vec!["index.js".to_string()]);
    store.set_command_config("weather", config.clone()).unwrap();

    let reloaded = RegistryStore::load(&path).unwrap();
    assert_eq!(
        reloaded.get("weather").unwrap().command_config.as_ref(),
        Some(&config)
    );

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["servers"]["weather"]["commandConfig"]["command"], "node");
    assert_eq!(raw["servers"]["weather"]["repoUrl"], "https://github.com/acme/weather");
}

#[test]
fn command_config_for_unknown_server_fails() {
    let temp = TempDir::new().unwrap();
    let mut store = RegistryStore::load(temp.path().join("registry.json")).unwrap();

    let err = store
        .set_command_config("ghost", CommandConfig::new("x", Vec::new()))
        .unwrap_err();

    assert!(matches!(err, McpiError::NotRegistered(name) if name == "ghost"));
}

#[test]
fn array_form_registry_loads_and_is_rewritten_as_map() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry.json");
    std::fs::write(
        &path,
        r#"{"servers":[{"name":"@ns/server-git","repoUrl":"https://github.com/ns/servers","command":"npx -y @ns/server-git","description":"Git tools","keywords":["git"]}]}"#,
    )
    .unwrap();

    let mut store = RegistryStore::load_or_reset(&path).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("@ns/server-git").unwrap().keywords, vec!["git"]);
    assert!(!temp.path().join("registry.json.corrupt").exists());

    store.upsert(record("weather")).unwrap();

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let servers = raw["servers"].as_object().unwrap();
    assert_eq!(servers.len(), 2);
    assert_eq!(servers["@ns/server-git"]["description"], "Git tools");
}

#[test]
fn map_keys_that_disagree_with_names_are_rekeyed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry.json");
    std::fs::write(&path, r#"{"servers":{"a":{"name":"b","command":"x"}}}"#).unwrap();

    let mut store = RegistryStore::load(&path).unwrap();
    assert!(store.get("a").is_none());
    assert_eq!(store.get("b").unwrap().command, "x");

    store.upsert(ServerRecord::new("b", "", "y")).unwrap();

    let names: Vec<&str> = store.list().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["b"]);
    assert_eq!(store.get("b").unwrap().command, "y");
}

#[test]
fn failed_write_leaves_store_unchanged() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry.json");
    let mut store = RegistryStore::load(&path).unwrap();
    store.upsert(record("weather")).unwrap();

    // A directory in place of the file makes every write fail
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    assert!(store.upsert(record("maps")).is_err());
    assert!(
        store
            .set_command_config("weather", CommandConfig::new("node", Vec::new()))
            .is_err()
    );
    assert!(store.remove("weather").is_err());
    assert!(store.merge_discovered(vec![record("search")]).is_err());

    assert_eq!(store.len(), 1);
    assert!(store.get("maps").is_none());
    assert!(store.get("weather").unwrap().command_config.is_none());
}
