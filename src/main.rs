//! tts-converter - send text to a TTS endpoint, play or save the audio,
//! and manage the endpoint configurations used for it.

use clap::{Parser, Subcommand};
use std::error::Error;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tts_converter::config_loader::Settings;
use tts_converter::storage::FileStorage;
use tts_converter::store::{ConfigStore, EndpointConfig};
use tts_converter::{console, logging, validator};
use tts_converter::{AudioOutput, ConversionSession, NullOutput, RodioOutput};

/// Text-to-speech converter for remote TTS endpoints
#[derive(Parser)]
#[command(name = "tts-converter")]
#[command(author = "StarTuz")]
#[command(version)]
#[command(about = "Convert text to speech through configurable TTS endpoints", long_about = None)]
struct Cli {
    /// Settings file to use instead of the default search path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert text to speech with the selected endpoint
    Convert {
        /// Text to convert; read from stdin when omitted
        text: Option<String>,
        /// Use this configuration instead of the selected one
        #[arg(short, long)]
        endpoint: Option<String>,
        /// Save the audio as tts-output.wav into this directory
        #[arg(short, long)]
        save: Option<PathBuf>,
        /// Do not play the audio or open the playback prompt
        #[arg(long)]
        no_play: bool,
    },

    /// Check whether an endpoint URL would be accepted
    Validate {
        url: String,
    },

    /// Manage endpoint configurations
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// List configurations (default)
    List,
    /// Add a configuration and select it
    Add {
        /// Display name
        #[arg(short, long)]
        title: String,
        /// Endpoint URL or /relative path
        #[arg(short, long)]
        url: String,
    },
    /// Edit a configuration's name or URL
    Edit {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Delete a configuration
    Delete {
        id: String,
    },
    /// Select the configuration used for conversions
    Select {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init_tracing("warn");
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::new()?,
    };

    let mut store = ConfigStore::load(settings.storage(), &settings.default_endpoint());

    match cli.command {
        Commands::Validate { url } => match validator::validate(&url) {
            Ok(()) => println!("OK: {}", url),
            Err(reason) => {
                eprintln!("Rejected: {}", reason);
                std::process::exit(1);
            }
        },
        Commands::Config { action } => run_config(&mut store, action.unwrap_or(ConfigAction::List))?,
        Commands::Convert {
            text,
            endpoint,
            save,
            no_play,
        } => run_convert(&settings, &store, text, endpoint, save, no_play).await?,
    }

    Ok(())
}

fn run_config(
    store: &mut ConfigStore<FileStorage>,
    action: ConfigAction,
) -> Result<(), Box<dyn Error>> {
    match action {
        ConfigAction::List => {}
        ConfigAction::Add { title, url } => {
            store.add(&title, &url)?;
            println!("Added and selected '{}'", title.trim());
        }
        ConfigAction::Edit { id, title, url } => {
            let current = store
                .get(&id)
                .cloned()
                .ok_or_else(|| format!("no configuration with id '{}'", id))?;
            store.update(EndpointConfig {
                id,
                title: title.unwrap_or(current.title),
                url: url.unwrap_or(current.url),
            })?;
            println!("Updated");
        }
        ConfigAction::Delete { id } => {
            store.delete(&id)?;
            println!("Deleted '{}'", id);
        }
        ConfigAction::Select { id } => {
            store.select(&id)?;
            println!("Selected '{}'", store.selected().title);
        }
    }

    print!("{}", console::format_configs(store.set()));
    Ok(())
}

async fn run_convert(
    settings: &Settings,
    store: &ConfigStore<FileStorage>,
    text: Option<String>,
    endpoint_id: Option<String>,
    save: Option<PathBuf>,
    no_play: bool,
) -> Result<(), Box<dyn Error>> {
    let interactive = text.is_some();
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let endpoint = match endpoint_id {
        Some(id) => store
            .get(&id)
            .cloned()
            .ok_or_else(|| format!("no configuration with id '{}'", id))?,
        None => store.selected().clone(),
    };

    let play = settings.enable_audio && !no_play;
    let output: Arc<dyn AudioOutput> = if play {
        match RodioOutput::new(settings.playback_volume) {
            Ok(output) => Arc::new(output),
            Err(e) => {
                warn!(error = %e, "Audio output unavailable, playback disabled");
                Arc::new(NullOutput::new())
            }
        }
    } else {
        Arc::new(NullOutput::new())
    };

    let base_url = settings
        .base_url()
        .ok_or_else(|| format!("invalid base_url: {}", settings.base_url))?;
    let mut session = ConversionSession::new(output, base_url, settings.timings())?;
    session.set_input_text(text);

    eprintln!("Converting with '{}' ({})", endpoint.title, endpoint.url);
    let mut stderr = std::io::stderr();
    if let Err(e) = console::convert_with_progress(&mut session, &endpoint, &mut stderr).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Some(resource) = session.result_audio() {
        eprintln!("{}", console::describe_result(resource));
    }

    if let Some(dir) = &save {
        if let Some(file) = session.download() {
            let path = file.save_to(dir)?;
            info!(path = %path.display(), "Saved audio");
            eprintln!("Saved {}", path.display());
        }
    }

    if play && interactive {
        let save_dir = save.unwrap_or_else(|| PathBuf::from("."));
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        console::playback_prompt(&mut session, stdin, &mut std::io::stdout(), &save_dir).await?;
    } else if play {
        // stdin already consumed by the text; just let the audio finish.
        console::wait_for_playback(&mut session, settings.timings().autoplay_delay).await;
    }

    Ok(())
}
