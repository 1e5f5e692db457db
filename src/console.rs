//! Terminal rendering of sessions and configurations.

use crate::audio::AudioResource;
use crate::error::ConversionError;
use crate::progress::render_bar;
use crate::session::{ConversionSession, Playback};
use crate::store::{ConfigurationSet, EndpointConfig};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::interval;

const BAR_WIDTH: usize = 30;

/// Runs a conversion while redrawing the progress bar on `out`.
pub async fn convert_with_progress<W: Write>(
    session: &mut ConversionSession,
    endpoint: &EndpointConfig,
    out: &mut W,
) -> Result<(), ConversionError> {
    let progress = session.progress_handle();
    let mut redraw = interval(Duration::from_millis(100));

    let convert = session.convert(endpoint);
    tokio::pin!(convert);

    let result = loop {
        tokio::select! {
            biased;
            result = &mut convert => break result,
            _ = redraw.tick() => {
                let _ = write!(out, "\r{}", render_bar(progress.get(), BAR_WIDTH));
                let _ = out.flush();
            }
        }
    };

    // Only draw the final state when the request actually went out.
    if progress.get() > 0 {
        let _ = writeln!(out, "\r{}", render_bar(progress.get(), BAR_WIDTH));
    }
    result
}

/// One-line description of a conversion result.
pub fn describe_result(resource: &AudioResource) -> String {
    let mut line = format!(
        "Received {} bytes ({})",
        resource.len(),
        resource.content_type().unwrap_or("unknown type")
    );
    if let Some(wav) = resource.wav_summary() {
        line.push_str(&format!(
            ", WAV {} Hz, {} ch, {}-bit, {:.1}s",
            wav.sample_rate, wav.channels, wav.bits_per_sample, wav.duration_secs
        ));
    }
    line
}

/// Table of configurations, the selected one marked with `*`.
pub fn format_configs(set: &ConfigurationSet) -> String {
    let id_width = set
        .api_configs
        .iter()
        .map(|c| c.id.len())
        .max()
        .unwrap_or(2)
        .max(2);
    let title_width = set
        .api_configs
        .iter()
        .map(|c| c.title.chars().count())
        .max()
        .unwrap_or(5)
        .max(5);

    let mut out = format!("  {:<id_width$}  {:<title_width$}  URL\n", "ID", "TITLE");
    for config in &set.api_configs {
        let marker = if config.id == set.selected_api_id { '*' } else { ' ' };
        out.push_str(&format!(
            "{} {:<id_width$}  {:<title_width$}  {}\n",
            marker, config.id, config.title, config.url
        ));
    }
    out
}

fn playback_label(state: Option<Playback>) -> &'static str {
    match state {
        Some(Playback::Playing) => "playing",
        Some(Playback::Paused) => "paused",
        None => "no audio",
    }
}

/// Interactive playback controls: `p` toggles, `s` saves into `save_dir`, `q` quits.
///
/// Returns when the user quits or `input` reaches end of file.
pub async fn playback_prompt<R, W>(
    session: &mut ConversionSession,
    input: R,
    out: &mut W,
    save_dir: &Path,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "[p] play/pause  [s] save {}  [q] quit", crate::audio::DOWNLOAD_FILE_NAME)?;

    let mut lines = input.lines();
    let mut poll = interval(Duration::from_millis(250));
    let mut last = session.playback();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "p" => match session.toggle_playback() {
                        Ok(state) => writeln!(out, "{}", playback_label(state))?,
                        Err(e) => writeln!(out, "Playback error: {}", e)?,
                    },
                    "s" => match session.download() {
                        Some(file) => {
                            let path = file.save_to(save_dir)?;
                            writeln!(out, "Saved {}", path.display())?;
                        }
                        None => writeln!(out, "Nothing to save")?,
                    },
                    "q" => break,
                    "" => {}
                    other => writeln!(out, "Unknown command: {}", other)?,
                }
                last = session.playback();
            }
            _ = poll.tick() => {
                let now = session.sync_playback();
                if now != last {
                    writeln!(out, "{}", playback_label(now))?;
                    last = now;
                }
            }
        }
    }
    Ok(())
}

/// Waits for autoplay to start, then until playback ends.
pub async fn wait_for_playback(session: &mut ConversionSession, autoplay_delay: Duration) {
    tokio::time::sleep(autoplay_delay + Duration::from_millis(50)).await;
    let mut poll = interval(Duration::from_millis(250));
    while session.sync_playback() == Some(Playback::Playing) {
        poll.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_CONFIG_ID;

    #[test]
    fn test_format_configs_marks_selection() {
        let mut set = ConfigurationSet::with_default("/convert/tts");
        set.api_configs.push(EndpointConfig {
            id: "1700000000000".to_string(),
            title: "Remote".to_string(),
            url: "https://tts.example.com/speak".to_string(),
        });
        set.selected_api_id = "1700000000000".to_string();

        let table = format_configs(&set);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with(&format!("  {}", DEFAULT_CONFIG_ID)));
        assert!(lines[2].starts_with("* 1700000000000"));
        assert!(lines[2].ends_with("https://tts.example.com/speak"));
    }

    #[test]
    fn test_describe_non_wav_result() {
        let resource = AudioResource::new(vec![0; 12], Some("audio/mpeg".to_string()));
        assert_eq!(describe_result(&resource), "Received 12 bytes (audio/mpeg)");
    }

    #[test]
    fn test_describe_wav_result() {
        let bytes = crate::audio::test_support::wav_bytes(8000, 8000);
        let resource = AudioResource::new(bytes, None);
        let line = describe_result(&resource);
        assert!(line.contains("unknown type"));
        assert!(line.contains("WAV 8000 Hz, 1 ch, 16-bit, 1.0s"));
    }

    #[test]
    fn test_playback_labels() {
        assert_eq!(playback_label(Some(Playback::Playing)), "playing");
        assert_eq!(playback_label(Some(Playback::Paused)), "paused");
        assert_eq!(playback_label(None), "no audio");
    }
}
