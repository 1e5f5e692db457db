use std::fs;
use tempfile::tempdir;
use tts_converter::storage::FileStorage;
use tts_converter::store::{ConfigStore, DEFAULT_CONFIG_ID, SETTINGS_KEY};
use tts_converter::{ConfigurationSet, StoreError};

const DEFAULT_ENDPOINT: &str = "/convert/tts";

#[test]
fn test_corrupted_file_falls_back_to_default() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(format!("{}.json", SETTINGS_KEY)), "\u{0}\u{1}garbage{").unwrap();

    let store = ConfigStore::load(FileStorage::new(dir.path()), DEFAULT_ENDPOINT);
    assert_eq!(store.set(), &ConfigurationSet::with_default(DEFAULT_ENDPOINT));
}

#[test]
fn test_invalid_persisted_url_falls_back_to_default() {
    let dir = tempdir().unwrap();
    let raw = r#"{"apiConfigs":[{"id":"x","title":"Bad","url":"/a//b"}],"selectedApiId":"x"}"#;
    fs::write(dir.path().join("ttsSettings.json"), raw).unwrap();

    let store = ConfigStore::load(FileStorage::new(dir.path()), DEFAULT_ENDPOINT);
    assert_eq!(store.selected().id, DEFAULT_CONFIG_ID);
}

#[test]
fn test_configurations_survive_restart() {
    let dir = tempdir().unwrap();

    let mut store = ConfigStore::load(FileStorage::new(dir.path()), DEFAULT_ENDPOINT);
    store.add("Lab server", "http://localhost:7777/tts").unwrap();
    store.add("Cloud", "https://tts.example.com/v1/speak").unwrap();
    let cloud_id = store.selected_id().to_string();
    store.select(DEFAULT_CONFIG_ID).unwrap();
    store.delete(&cloud_id).unwrap();

    let restarted = ConfigStore::load(FileStorage::new(dir.path()), DEFAULT_ENDPOINT);
    let titles: Vec<&str> = restarted.configs().iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles.len(), 2);
    assert_eq!(titles[1], "Lab server");
    assert_eq!(restarted.selected().id, DEFAULT_CONFIG_ID);

    let raw = fs::read_to_string(dir.path().join("ttsSettings.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json.get("apiConfigs").is_some());
    assert_eq!(json["selectedApiId"], DEFAULT_CONFIG_ID);
}

#[test]
fn test_rejected_mutation_leaves_file_untouched() {
    let dir = tempdir().unwrap();
    let mut store = ConfigStore::load(FileStorage::new(dir.path()), DEFAULT_ENDPOINT);

    assert!(matches!(
        store.delete(DEFAULT_CONFIG_ID),
        Err(StoreError::LastConfiguration)
    ));
    assert!(!dir.path().join("ttsSettings.json").exists());
}

#[test]
fn test_default_endpoint_is_used_only_without_stored_data() {
    let dir = tempdir().unwrap();
    let mut store = ConfigStore::load(FileStorage::new(dir.path()), "/first/default");
    store.add("Other", "/other").unwrap();

    let reloaded = ConfigStore::load(FileStorage::new(dir.path()), "/second/default");
    assert_eq!(reloaded.configs()[0].url, "/first/default");
}
