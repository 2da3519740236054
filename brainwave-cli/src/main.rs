//! Headless CLI host for the practice feedback engine.

mod render;
mod settings;
mod storage;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use brainwave_core::{
    list_input_devices, EngineConfig, HeuristicTranscriber, PracticeEngine, TranscriberHandle,
};
use settings::{default_settings_path, load_settings, save_settings, AppSettings};
use storage::LocalStore;

/// Record or analyze spoken practice clips and get heuristic feedback.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file path (defaults to the platform data directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record from the microphone, then analyze the take
    Practice {
        /// Input device name (defaults to the configured or system default)
        #[arg(short, long)]
        device: Option<String>,
        /// Fixed transcript seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Emit the report as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Analyze an existing clip file (WAV or raw f32 little-endian)
    Analyze {
        /// Path to the clip
        file: PathBuf,
        /// Sample rate for raw (headerless) input
        #[arg(long)]
        sample_rate: Option<u32>,
        /// Fixed transcript seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Emit the report as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// List available audio input devices
    Devices,
    /// Manage the practice-video catalog
    Videos {
        #[command(subcommand)]
        action: VideoAction,
    },
    /// Manage saved practice sessions
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
enum VideoAction {
    /// Add a video reference to the catalog
    Add {
        title: String,
        youtube_url: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "general")]
        exercise_type: String,
    },
    /// List catalog entries, newest first
    List {
        /// Only show entries of this exercise type
        #[arg(long)]
        exercise_type: Option<String>,
    },
    /// Remove an entry by id
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// Show recent practice sessions
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Delete saved sessions
    Clear {
        /// Only delete sessions older than this many days
        #[arg(long)]
        older_than_days: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let settings = load_settings(&settings_path);
    debug!(?settings_path, "settings loaded");
    // Persist normalized defaults on first run.
    if !settings_path.exists() {
        if let Err(e) = save_settings(&settings_path, &settings) {
            warn!("could not write settings file: {e}");
        }
    }

    match args.command {
        Command::Practice { device, seed, json } => {
            run_practice(&settings, device, seed, json).await
        }
        Command::Analyze {
            file,
            sample_rate,
            seed,
            json,
        } => run_analyze(&settings, &file, sample_rate, seed, json).await,
        Command::Devices => run_devices(),
        Command::Videos { action } => run_videos(action),
        Command::History { action } => run_history(action),
    }
}

fn build_engine(settings: &AppSettings, seed: Option<u64>, sample_rate: Option<u32>) -> PracticeEngine {
    let transcriber = match seed.or(settings.transcript_seed) {
        Some(seed) => HeuristicTranscriber::with_seed(seed),
        None => HeuristicTranscriber::new(),
    };
    PracticeEngine::new(
        EngineConfig {
            analysis_sample_rate: sample_rate.unwrap_or(settings.analysis_sample_rate),
        },
        TranscriberHandle::new(transcriber),
    )
}

async fn run_practice(
    settings: &AppSettings,
    device: Option<String>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let engine = build_engine(settings, seed, None);
    let device = device.or_else(|| settings.preferred_input_device.clone());

    // Coarse live level meter on stderr while recording.
    let mut levels = engine.subscribe_levels();
    let meter = tokio::spawn(async move {
        while let Ok(level) = levels.recv().await {
            if level.seq % 25 == 0 {
                let bars = (level.rms * 50.0).min(20.0) as usize;
                eprint!("\r[{:<20}]", "#".repeat(bars));
            }
        }
    });

    engine.start_recording_with_device(device)?;
    eprintln!("Recording... press Enter to stop.");

    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
    })
    .await
    .map_err(|e| anyhow!("stdin reader failed: {e}"))?;

    let clip = engine.stop_recording()?;
    meter.abort();
    eprintln!();
    info!(secs = clip.duration_secs(), "clip captured");

    let report = engine.analyze(clip).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_report(&report);
    }

    if settings.history_enabled {
        let store = LocalStore::new(LocalStore::default_db_path()).map_err(|e| anyhow!(e))?;
        let pruned = store.prune_sessions(settings.retention_days).map_err(|e| anyhow!(e))?;
        if pruned > 0 {
            debug!(pruned, "old sessions pruned");
        }
        let id = store.insert_session(&report).map_err(|e| anyhow!(e))?;
        info!(session = id.as_str(), "session saved");
    }
    Ok(())
}

async fn run_analyze(
    settings: &AppSettings,
    file: &Path,
    sample_rate: Option<u32>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let engine = build_engine(settings, seed, sample_rate);
    let report = engine.analyze_bytes(&bytes).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_report(&report);
    }
    Ok(())
}

fn run_devices() -> Result<()> {
    let devices = list_input_devices();
    if devices.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }
    for device in devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("{}{marker}", device.name);
    }
    Ok(())
}

fn run_videos(action: VideoAction) -> Result<()> {
    let store = LocalStore::new(LocalStore::default_db_path()).map_err(|e| anyhow!(e))?;
    match action {
        VideoAction::Add {
            title,
            youtube_url,
            description,
            exercise_type,
        } => {
            let entry = store
                .add_video(&title, &description, &youtube_url, &exercise_type)
                .map_err(|e| anyhow!(e))?;
            println!("Added {} ({})", entry.title, entry.id);
        }
        VideoAction::List { exercise_type } => {
            let entries = store
                .list_videos(exercise_type.as_deref())
                .map_err(|e| anyhow!(e))?;
            if entries.is_empty() {
                println!("No videos saved.");
            }
            for entry in entries {
                println!(
                    "{}  [{}]  {}\n    {}  added {}",
                    entry.id, entry.exercise_type, entry.title, entry.youtube_url, entry.date_added
                );
            }
        }
        VideoAction::Remove { id } => {
            if store.delete_video(&id).map_err(|e| anyhow!(e))? {
                println!("Removed {id}");
            } else {
                println!("No video with id {id}");
            }
        }
    }
    Ok(())
}

fn run_history(action: HistoryAction) -> Result<()> {
    let store = LocalStore::new(LocalStore::default_db_path()).map_err(|e| anyhow!(e))?;
    match action {
        HistoryAction::List { limit } => {
            let sessions = store.list_sessions(limit).map_err(|e| anyhow!(e))?;
            if sessions.is_empty() {
                println!("No saved sessions.");
            }
            for s in sessions {
                println!(
                    "{}  {}  {:.1}s, {} feedback item(s)",
                    s.id, s.created_at, s.descriptors.duration, s.feedback_count
                );
                println!("    {}", s.transcript);
            }
        }
        HistoryAction::Clear { older_than_days } => {
            let deleted = store.clear_sessions(older_than_days).map_err(|e| anyhow!(e))?;
            println!("Deleted {deleted} session(s)");
        }
    }
    Ok(())
}
