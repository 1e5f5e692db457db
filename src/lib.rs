//! Text-to-speech front-end: endpoint configurations, conversion sessions and playback.

pub mod audio;
pub mod config_loader;
pub mod console;
pub mod error;
pub mod logging;
pub mod progress;
pub mod session;
pub mod storage;
pub mod store;
pub mod validator;

pub use audio::{AudioOutput, AudioResource, DownloadedFile, NullOutput, RodioOutput};
pub use error::{ConversionError, PlaybackError, StorageError, StoreError};
pub use session::{ConversionSession, Playback, SessionStatus, SessionTimings};
pub use store::{ConfigStore, ConfigurationSet, EndpointConfig};
pub use validator::{validate, UrlRejection};
