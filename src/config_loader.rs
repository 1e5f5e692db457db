use crate::session::SessionTimings;
use crate::storage::FileStorage;
use crate::validator;
use config::{Config, ConfigBuilder, File};
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Endpoint used in development builds, and in production when no override is set.
pub const DEV_ENDPOINT: &str = "/convert/tts";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub dev_mode: bool,
    pub tts_server: String,     // Production override for the default endpoint
    pub base_url: String,       // Origin that root-relative endpoints resolve against
    pub storage_dir: String,    // Empty means ~/.config/tts-converter
    pub request_timeout_secs: u64,
    // Cosmetic timings
    pub progress_interval_ms: u64,
    pub autoplay_delay_ms: u64,
    pub progress_reset_delay_ms: u64,
    // Playback
    pub enable_audio: bool,
    pub playback_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dev_mode: false,
            tts_server: String::new(),
            base_url: "http://localhost:7777".to_string(),
            storage_dir: String::new(),
            request_timeout_secs: 60,
            progress_interval_ms: 300,
            autoplay_delay_ms: 300,
            progress_reset_delay_ms: 1000,
            enable_audio: true,
            playback_volume: 1.0,
        }
    }
}

impl Settings {
    /// Defaults, then `TtsConverter.*` in the working directory, then
    /// `~/.config/tts-converter/TtsConverter.*`, then `TTS_*` environment variables.
    pub fn new() -> Result<Self, config::ConfigError> {
        let user_file = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tts-converter")
            .join("TtsConverter");

        let builder = Self::defaults()?
            .add_source(File::with_name("TtsConverter").required(false))
            .add_source(File::from(user_file).required(false))
            // e.g. TTS_TTS_SERVER, TTS_DEV_MODE
            .add_source(config::Environment::with_prefix("TTS"));

        Self::finish(builder)
    }

    /// Defaults overlaid with one explicit file (which must exist) and the environment.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = Self::defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .add_source(config::Environment::with_prefix("TTS"));

        Self::finish(builder)
    }

    fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let d = Self::default();
        Config::builder()
            .set_default("dev_mode", d.dev_mode)?
            .set_default("tts_server", d.tts_server)?
            .set_default("base_url", d.base_url)?
            .set_default("storage_dir", d.storage_dir)?
            .set_default("request_timeout_secs", d.request_timeout_secs)?
            .set_default("progress_interval_ms", d.progress_interval_ms)?
            .set_default("autoplay_delay_ms", d.autoplay_delay_ms)?
            .set_default("progress_reset_delay_ms", d.progress_reset_delay_ms)?
            .set_default("enable_audio", d.enable_audio)?
            .set_default("playback_volume", d.playback_volume as f64)
    }

    fn finish(
        builder: ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.playback_volume < 0.0 || self.playback_volume > 1.0 {
            return Err(config::ConfigError::Message(format!(
                "Invalid playback_volume: {}. Must be between 0.0 and 1.0",
                self.playback_volume
            )));
        }
        if self.progress_interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "progress_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        match Url::parse(&self.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => {
                return Err(config::ConfigError::Message(format!(
                    "Invalid base_url: {}. Must be an absolute http(s) URL",
                    self.base_url
                )))
            }
        }
        let endpoint = self.default_endpoint();
        if let Err(reason) = validator::validate(&endpoint) {
            return Err(config::ConfigError::Message(format!(
                "Invalid default endpoint '{}': {}",
                endpoint, reason
            )));
        }
        Ok(())
    }

    /// The endpoint of the built-in configuration for this environment.
    pub fn default_endpoint(&self) -> String {
        let override_url = self.tts_server.trim();
        if self.dev_mode || override_url.is_empty() {
            DEV_ENDPOINT.to_string()
        } else {
            override_url.to_string()
        }
    }

    /// The parsed base URL. `None` only for settings that never passed `validate`.
    pub fn base_url(&self) -> Option<Url> {
        Url::parse(&self.base_url).ok()
    }

    pub fn storage(&self) -> FileStorage {
        if self.storage_dir.trim().is_empty() {
            FileStorage::in_config_dir()
        } else {
            FileStorage::new(self.storage_dir.trim())
        }
    }

    pub fn timings(&self) -> SessionTimings {
        SessionTimings {
            progress_interval: Duration::from_millis(self.progress_interval_ms),
            autoplay_delay: Duration::from_millis(self.autoplay_delay_ms),
            progress_reset_delay: Duration::from_millis(self.progress_reset_delay_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
