use crate::error::PlaybackError;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

/// File name offered for every download.
pub const DOWNLOAD_FILE_NAME: &str = "tts-output.wav";

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// In-memory audio returned by a conversion, addressable by a `blob:` locator.
#[derive(Debug, Clone)]
pub struct AudioResource {
    locator: String,
    content_type: Option<String>,
    bytes: Arc<Vec<u8>>,
}

impl AudioResource {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        let id = NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            locator: format!("blob:tts-converter/{}", id),
            content_type,
            bytes: Arc::new(bytes),
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Header details when the payload is a WAV file, `None` otherwise.
    pub fn wav_summary(&self) -> Option<WavSummary> {
        let reader = hound::WavReader::new(Cursor::new(self.bytes.as_slice())).ok()?;
        let spec = reader.spec();
        let frames = reader.duration();
        let duration_secs = if spec.sample_rate > 0 {
            frames as f64 / spec.sample_rate as f64
        } else {
            0.0
        };
        Some(WavSummary {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            duration_secs,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavSummary {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub duration_secs: f64,
}

/// A download offered to the user: fixed file name, raw response bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_name: &'static str,
    pub bytes: Vec<u8>,
}

impl DownloadedFile {
    pub fn from_resource(resource: &AudioResource) -> Self {
        Self {
            file_name: DOWNLOAD_FILE_NAME,
            bytes: resource.bytes().to_vec(),
        }
    }

    /// Writes the file into `dir`, returning the full path.
    pub fn save_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
        let path = dir.join(self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Something that can play one loaded audio resource at a time.
pub trait AudioOutput: Send + Sync {
    /// Replaces whatever was loaded with `resource`, paused at the start.
    fn load(&self, resource: &AudioResource) -> Result<(), PlaybackError>;

    /// Starts or resumes playback of the loaded resource.
    fn play(&self) -> Result<(), PlaybackError>;

    fn pause(&self);

    /// True once the loaded resource has played to its end.
    fn is_finished(&self) -> bool;
}

/// Output that accepts everything and plays nothing. Used when audio is disabled.
#[derive(Default)]
pub struct NullOutput {
    loaded: Mutex<bool>,
}

impl NullOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioOutput for NullOutput {
    fn load(&self, _resource: &AudioResource) -> Result<(), PlaybackError> {
        if let Ok(mut loaded) = self.loaded.lock() {
            *loaded = true;
        }
        Ok(())
    }

    fn play(&self) -> Result<(), PlaybackError> {
        match self.loaded.lock() {
            Ok(loaded) if *loaded => Ok(()),
            _ => Err(PlaybackError::NothingLoaded),
        }
    }

    fn pause(&self) {}

    fn is_finished(&self) -> bool {
        true
    }
}

/// Speaker output through `rodio`.
///
/// The output stream is not `Send`, so it lives on its own thread for as long
/// as this value exists; sinks are created from the shared handle.
pub struct RodioOutput {
    handle: rodio::OutputStreamHandle,
    sink: Mutex<Option<rodio::Sink>>,
    volume: f32,
    _keepalive: Sender<()>,
}

impl RodioOutput {
    pub fn new(volume: f32) -> Result<Self, PlaybackError> {
        let (handle_tx, handle_rx) = channel();
        let (keepalive_tx, keepalive_rx) = channel::<()>();

        thread::spawn(move || {
            let (_stream, handle) = match rodio::OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    let _ = handle_tx.send(Err(e.to_string()));
                    return;
                }
            };
            let _ = handle_tx.send(Ok(handle));
            // Blocks until the owning RodioOutput is dropped.
            let _ = keepalive_rx.recv();
        });

        let handle = handle_rx
            .recv()
            .map_err(|e| PlaybackError::NoDevice(e.to_string()))?
            .map_err(PlaybackError::NoDevice)?;

        Ok(Self {
            handle,
            sink: Mutex::new(None),
            volume,
            _keepalive: keepalive_tx,
        })
    }
}

impl AudioOutput for RodioOutput {
    fn load(&self, resource: &AudioResource) -> Result<(), PlaybackError> {
        let mut slot = self.sink.lock().map_err(|_| PlaybackError::NothingLoaded)?;
        // The previous resource is gone even if the new one fails to decode.
        if let Some(previous) = slot.take() {
            previous.stop();
        }

        let source = rodio::Decoder::new(Cursor::new(resource.bytes().to_vec()))
            .map_err(|e| PlaybackError::Decode(e.to_string()))?;
        let sink = rodio::Sink::try_new(&self.handle)
            .map_err(|e| PlaybackError::NoDevice(e.to_string()))?;
        sink.pause();
        sink.set_volume(self.volume);
        sink.append(source);

        *slot = Some(sink);
        Ok(())
    }

    fn play(&self) -> Result<(), PlaybackError> {
        let slot = self.sink.lock().map_err(|_| PlaybackError::NothingLoaded)?;
        match slot.as_ref() {
            Some(sink) => {
                sink.play();
                Ok(())
            }
            None => Err(PlaybackError::NothingLoaded),
        }
    }

    fn pause(&self) {
        if let Ok(slot) = self.sink.lock() {
            if let Some(sink) = slot.as_ref() {
                sink.pause();
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.sink
            .lock()
            .map(|slot| slot.as_ref().map(|s| s.empty()).unwrap_or(true))
            .unwrap_or(true)
    }
}
