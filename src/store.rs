//! Named endpoint configurations and the current selection.
//!
//! Every successful mutation builds the next set, writes it to storage once,
//! and only then replaces the in-memory state. A failed write leaves the
//! store unchanged.

use crate::error::StoreError;
use crate::storage::SettingsStorage;
use crate::validator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Storage key holding the serialized configuration set.
pub const SETTINGS_KEY: &str = "ttsSettings";

/// Reserved id of the built-in configuration. It can be edited but never deleted.
pub const DEFAULT_CONFIG_ID: &str = "default";

pub const DEFAULT_CONFIG_TITLE: &str = "Default TTS endpoint";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub id: String,
    pub title: String,
    pub url: String,
}

impl EndpointConfig {
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_CONFIG_ID
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSet {
    pub api_configs: Vec<EndpointConfig>,
    pub selected_api_id: String,
}

impl ConfigurationSet {
    /// A set holding only the built-in configuration, pointing at `endpoint`.
    pub fn with_default(endpoint: &str) -> Self {
        Self {
            api_configs: vec![EndpointConfig {
                id: DEFAULT_CONFIG_ID.to_string(),
                title: DEFAULT_CONFIG_TITLE.to_string(),
                url: endpoint.to_string(),
            }],
            selected_api_id: DEFAULT_CONFIG_ID.to_string(),
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.api_configs.iter().position(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Removes entries that would not pass a save and returns them. A removed
    /// selection moves to the first remaining entry.
    pub fn drop_invalid(&mut self) -> Vec<EndpointConfig> {
        let selection_known = self.contains(&self.selected_api_id);
        let (kept, dropped): (Vec<_>, Vec<_>) = self
            .api_configs
            .drain(..)
            .partition(|c| check_fields(&c.title, &c.url).is_ok());
        self.api_configs = kept;
        if selection_known && !self.contains(&self.selected_api_id) {
            if let Some(first) = self.api_configs.first() {
                self.selected_api_id = first.id.clone();
            }
        }
        dropped
    }

    /// Non-empty, selection resolves, and every entry would pass a save.
    pub fn is_consistent(&self) -> bool {
        !self.api_configs.is_empty()
            && self.contains(&self.selected_api_id)
            && self
                .api_configs
                .iter()
                .all(|c| check_fields(&c.title, &c.url).is_ok())
    }
}

/// Non-empty title and URL, and a URL the validator accepts.
pub fn check_fields(title: &str, url: &str) -> Result<(), StoreError> {
    if title.trim().is_empty() || url.trim().is_empty() {
        return Err(StoreError::EmptyField);
    }
    validator::validate(url.trim())?;
    Ok(())
}

fn parse_stored(raw: &str) -> serde_json::Result<ConfigurationSet> {
    let mut set: ConfigurationSet = serde_json::from_str(raw)?;
    for rejected in set.drop_invalid() {
        warn!(
            id = %rejected.id,
            title = %rejected.title,
            url = %rejected.url,
            "Dropping stored configuration that fails validation"
        );
    }
    Ok(set)
}

pub struct ConfigStore<S: SettingsStorage> {
    storage: S,
    set: ConfigurationSet,
}

impl<S: SettingsStorage> ConfigStore<S> {
    /// Restores the persisted set, or starts from the single default
    /// configuration when nothing usable is stored.
    pub fn load(storage: S, default_endpoint: &str) -> Self {
        let set = match storage.read(SETTINGS_KEY) {
            Ok(Some(raw)) => match parse_stored(&raw) {
                Ok(set) if set.is_consistent() => {
                    debug!(count = set.api_configs.len(), "Restored endpoint configurations");
                    set
                }
                Ok(_) => {
                    warn!("Stored settings are inconsistent, falling back to default configuration");
                    ConfigurationSet::with_default(default_endpoint)
                }
                Err(e) => {
                    warn!(error = %e, "Stored settings are corrupted, falling back to default configuration");
                    ConfigurationSet::with_default(default_endpoint)
                }
            },
            Ok(None) => ConfigurationSet::with_default(default_endpoint),
            Err(e) => {
                warn!(error = %e, "Could not read stored settings, falling back to default configuration");
                ConfigurationSet::with_default(default_endpoint)
            }
        };

        Self { storage, set }
    }

    pub fn set(&self) -> &ConfigurationSet {
        &self.set
    }

    pub fn configs(&self) -> &[EndpointConfig] {
        &self.set.api_configs
    }

    pub fn selected_id(&self) -> &str {
        &self.set.selected_api_id
    }

    pub fn get(&self, id: &str) -> Option<&EndpointConfig> {
        self.set.api_configs.iter().find(|c| c.id == id)
    }

    /// The selected configuration, or the first one if the selection dangles.
    pub fn selected(&self) -> &EndpointConfig {
        self.get(&self.set.selected_api_id)
            .unwrap_or(&self.set.api_configs[0]) // set is never empty
    }

    /// Writes the current set to storage.
    pub fn save(&self) -> Result<(), StoreError> {
        write_set(&self.storage, &self.set)
    }

    /// Appends a new configuration with a fresh id and selects it.
    pub fn add(&mut self, title: &str, url: &str) -> Result<&ConfigurationSet, StoreError> {
        check_fields(title, url)?;

        let id = self.fresh_id();
        let mut next = self.set.clone();
        next.api_configs.push(EndpointConfig {
            id: id.clone(),
            title: title.trim().to_string(),
            url: url.trim().to_string(),
        });
        next.selected_api_id = id.clone();

        info!(id = %id, title = title.trim(), "Added endpoint configuration");
        self.commit(next)
    }

    /// Replaces the entry with the same id, keeping its position.
    pub fn update(&mut self, config: EndpointConfig) -> Result<&ConfigurationSet, StoreError> {
        check_fields(&config.title, &config.url)?;

        let index = self
            .set
            .position(&config.id)
            .ok_or_else(|| StoreError::NotFound(config.id.clone()))?;

        let mut next = self.set.clone();
        next.api_configs[index] = EndpointConfig {
            id: config.id,
            title: config.title.trim().to_string(),
            url: config.url.trim().to_string(),
        };

        info!(id = %next.api_configs[index].id, "Updated endpoint configuration");
        self.commit(next)
    }

    pub fn delete(&mut self, id: &str) -> Result<&ConfigurationSet, StoreError> {
        if self.set.api_configs.len() <= 1 {
            return Err(StoreError::LastConfiguration);
        }
        if id == DEFAULT_CONFIG_ID {
            return Err(StoreError::DefaultConfiguration);
        }
        let index = self
            .set
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut next = self.set.clone();
        next.api_configs.remove(index);
        if next.selected_api_id == id {
            next.selected_api_id = next.api_configs[0].id.clone();
            debug!(selected = %next.selected_api_id, "Selection moved after delete");
        }

        info!(id = %id, "Deleted endpoint configuration");
        self.commit(next)
    }

    pub fn select(&mut self, id: &str) -> Result<&ConfigurationSet, StoreError> {
        if !self.set.contains(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let mut next = self.set.clone();
        next.selected_api_id = id.to_string();
        self.commit(next)
    }

    fn commit(&mut self, next: ConfigurationSet) -> Result<&ConfigurationSet, StoreError> {
        debug_assert!(next.is_consistent());
        write_set(&self.storage, &next)?;
        self.set = next;
        Ok(&self.set)
    }

    /// Time-based id, bumped until it is unused in this set.
    fn fresh_id(&self) -> String {
        let mut candidate = chrono::Utc::now().timestamp_millis();
        while self.set.contains(&candidate.to_string()) {
            candidate += 1;
        }
        candidate.to_string()
    }
}

fn write_set<S: SettingsStorage>(storage: &S, set: &ConfigurationSet) -> Result<(), StoreError> {
    let json = serde_json::to_string(set).map_err(crate::error::StorageError::from)?;
    storage.write(SETTINGS_KEY, &json)?;
    Ok(())
}
