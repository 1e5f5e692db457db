//! One text-to-speech conversion at a time, against the selected endpoint.
//!
//! State machine: `Idle -> InFlight -> Succeeded | Failed`, and the next
//! attempt starts over from there. Input or endpoint validation failures set
//! `error_message` without leaving `Idle`.

use crate::audio::{AudioOutput, AudioResource, DownloadedFile};
use crate::error::{ConversionError, PlaybackError};
use crate::progress::{Progress, ScheduledTask, PROGRESS_DONE};
use crate::store::EndpointConfig;
use crate::validator::{self, UrlRejection};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Playing,
    Paused,
}

#[derive(Debug, Clone)]
pub struct SessionTimings {
    pub progress_interval: Duration,
    pub autoplay_delay: Duration,
    pub progress_reset_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(300),
            autoplay_delay: Duration::from_millis(300),
            progress_reset_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct ConvertRequest<'a> {
    text: &'a str,
}

pub struct ConversionSession {
    client: Client,
    base_url: Url,
    output: Arc<dyn AudioOutput>,
    timings: SessionTimings,
    input_text: String,
    status: SessionStatus,
    progress: Progress,
    result_audio: Option<AudioResource>,
    error_message: Option<String>,
    playback: Arc<Mutex<Playback>>,
    pending_reset: Option<ScheduledTask>,
    pending_autoplay: Option<ScheduledTask>,
}

impl ConversionSession {
    /// `base_url` is the origin root-relative endpoints are sent to.
    pub fn new(
        output: Arc<dyn AudioOutput>,
        base_url: Url,
        timings: SessionTimings,
    ) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timings.request_timeout).build()?;
        Ok(Self {
            client,
            base_url,
            output,
            timings,
            input_text: String::new(),
            status: SessionStatus::Idle,
            progress: Progress::new(),
            result_audio: None,
            error_message: None,
            playback: Arc::new(Mutex::new(Playback::Paused)),
            pending_reset: None,
            pending_autoplay: None,
        })
    }

    pub fn set_input_text(&mut self, text: impl Into<String>) {
        self.input_text = text.into();
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Cosmetic progress, 0..=100.
    pub fn progress(&self) -> u8 {
        self.progress.get()
    }

    /// Shared handle for rendering progress while a conversion is awaited.
    pub fn progress_handle(&self) -> Progress {
        self.progress.clone()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn result_audio(&self) -> Option<&AudioResource> {
        self.result_audio.as_ref()
    }

    /// Playback state, only meaningful once a result exists.
    pub fn playback(&self) -> Option<Playback> {
        self.result_audio.as_ref().map(|_| self.playback_state())
    }

    /// Sends the current input text to `endpoint` and stores the audio on success.
    ///
    /// Returns the same error that is recorded in `error_message`.
    pub async fn convert(&mut self, endpoint: &EndpointConfig) -> Result<(), ConversionError> {
        let target = match self.prepare(endpoint) {
            Ok(target) => target,
            Err(e) => {
                debug!(error = %e, "Conversion rejected before sending");
                self.status = SessionStatus::Idle;
                self.error_message = Some(e.to_string());
                return Err(e);
            }
        };

        // A previous attempt's delayed callbacks must not touch this one.
        if let Some(task) = self.pending_reset.take() {
            task.cancel();
        }
        if let Some(task) = self.pending_autoplay.take() {
            task.cancel();
        }

        self.status = SessionStatus::InFlight;
        self.error_message = None;
        let ticker = self.progress.start_ticker(self.timings.progress_interval);

        info!(endpoint = %target, chars = self.input_text.chars().count(), "Sending conversion request");
        let outcome = self.request(target).await;

        ticker.cancel();
        self.progress.set(PROGRESS_DONE);

        let result = match outcome {
            Ok(resource) => {
                info!(
                    bytes = resource.len(),
                    content_type = resource.content_type().unwrap_or("unknown"),
                    "Conversion succeeded"
                );
                self.accept_result(resource);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Conversion failed");
                self.status = SessionStatus::Failed;
                self.error_message = Some(e.to_string());
                Err(e)
            }
        };

        let progress = self.progress.clone();
        self.pending_reset = Some(ScheduledTask::after(
            self.timings.progress_reset_delay,
            move || progress.set(0),
        ));

        result
    }

    /// Pauses when playing, resumes when paused. Does nothing without a result.
    pub fn toggle_playback(&mut self) -> Result<Option<Playback>, PlaybackError> {
        let Some(resource) = self.result_audio.as_ref() else {
            return Ok(None);
        };

        // The user took over; a pending autoplay must not override them.
        if let Some(task) = self.pending_autoplay.take() {
            task.cancel();
        }

        let next = match self.playback_state() {
            Playback::Playing => {
                self.output.pause();
                Playback::Paused
            }
            Playback::Paused => {
                if self.output.is_finished() {
                    // Played to the end: start over, like an audio element does.
                    self.output.load(resource)?;
                }
                self.output.play()?;
                Playback::Playing
            }
        };
        self.set_playback_state(next);
        Ok(Some(next))
    }

    /// Picks up a natural end of playback. Returns the current state.
    pub fn sync_playback(&mut self) -> Option<Playback> {
        self.result_audio.as_ref()?;
        if self.playback_state() == Playback::Playing && self.output.is_finished() {
            debug!("Playback reached the end");
            self.set_playback_state(Playback::Paused);
        }
        self.playback()
    }

    /// The latest result as `tts-output.wav`, if there is one.
    pub fn download(&self) -> Option<DownloadedFile> {
        self.result_audio.as_ref().map(DownloadedFile::from_resource)
    }

    fn prepare(&self, endpoint: &EndpointConfig) -> Result<Url, ConversionError> {
        if self.input_text.trim().is_empty() {
            return Err(ConversionError::EmptyInput);
        }
        validator::validate(&endpoint.url)?;
        self.resolve(&endpoint.url)
    }

    fn resolve(&self, url: &str) -> Result<Url, ConversionError> {
        let resolved = if validator::is_relative(url) {
            self.base_url.join(url)
        } else {
            Url::parse(url)
        };
        resolved.map_err(|_| ConversionError::InvalidEndpointUrl(UrlRejection::InvalidAbsolute))
    }

    async fn request(&self, target: Url) -> Result<AudioResource, ConversionError> {
        let response = self
            .client
            .post(target)
            .json(&ConvertRequest {
                text: &self.input_text,
            })
            .send()
            .await
            .map_err(ConversionError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConversionError::HttpStatus {
                code: status.as_u16(),
                reason: reason_phrase(&response),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(ConversionError::transport)?;

        Ok(AudioResource::new(bytes.to_vec(), content_type))
    }

    fn accept_result(&mut self, resource: AudioResource) {
        self.set_playback_state(Playback::Paused);
        if let Err(e) = self.output.load(&resource) {
            warn!(error = %e, "Audio output could not load the result");
        }
        self.result_audio = Some(resource);
        self.status = SessionStatus::Succeeded;

        let output = self.output.clone();
        let playback = self.playback.clone();
        self.pending_autoplay = Some(ScheduledTask::after(self.timings.autoplay_delay, move || {
            match output.play() {
                Ok(()) => {
                    if let Ok(mut state) = playback.lock() {
                        *state = Playback::Playing;
                    }
                }
                Err(e) => warn!(error = %e, "Autoplay failed"),
            }
        }));
    }

    fn playback_state(&self) -> Playback {
        self.playback
            .lock()
            .map(|p| *p)
            .unwrap_or(Playback::Paused)
    }

    fn set_playback_state(&self, state: Playback) {
        if let Ok(mut p) = self.playback.lock() {
            *p = state;
        }
    }
}

/// The reason phrase the server sent, else the canonical one for the code.
fn reason_phrase(response: &reqwest::Response) -> String {
    response
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .and_then(|r| std::str::from_utf8(r.as_bytes()).ok())
        .or_else(|| response.status().canonical_reason())
        .unwrap_or_default()
        .to_string()
}
