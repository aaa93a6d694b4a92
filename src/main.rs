//! poise: speaking-confidence scoring from the command line.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, warn};

use poise::audio::{self, chunk_queue};
use poise::collab::OnnxRegressionScorer;
use poise::config::{self, paths, AppConfig};
use poise::engine::{LiveAnalyzer, StreamCommand, StreamUpdate};
use poise::record::{assemble_answer, JsonFileSink, Question, ResultSink};
use poise::{logging, ConfidenceEngine, ConfidenceResult, ModePolicy, ProfileRegistry};

/// Heuristic speaking-confidence scoring.
#[derive(Parser, Debug)]
#[command(name = "poise")]
#[command(about = "Score speaking confidence from recordings or a live microphone")]
struct Args {
    /// Config file (default: <data dir>/poise_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List scoring profiles
    Profiles,

    /// List audio input devices
    Devices,

    /// Score a WAV recording
    Score {
        wav: PathBuf,

        #[arg(short, long)]
        profile: Option<String>,

        /// Question text stored with the saved record
        #[arg(short, long, default_value = "")]
        question: String,

        /// Write the answer record as JSON into this directory
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Record from the microphone for a fixed time, then score
    Record {
        #[arg(short, long, default_value_t = 15)]
        seconds: u64,

        #[arg(short, long)]
        profile: Option<String>,

        /// Write the answer record as JSON (default: <data dir>/results)
        #[arg(long)]
        save: bool,
    },

    /// Score the microphone continuously until Ctrl-C.
    /// Type `profile <key>` or `reset` to control a running session.
    Live {
        #[arg(short, long)]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(&paths::get_log_dir(), &args.log_level)?;

    let config = match &args.config {
        Some(path) => config::read_app_config_from(path),
        None => config::read_app_config(),
    };
    debug!(?config, "Effective configuration");
    let registry = config.load_registry()?;

    match args.command {
        Command::Profiles => {
            for p in registry.list() {
                println!("{:<18} {:<18} {}", p.key, p.name, p.description);
            }
        }
        Command::Devices => {
            for name in audio::list_devices() {
                println!("{name}");
            }
        }
        Command::Score {
            wav,
            profile,
            question,
            save,
        } => {
            let mut engine = batch_engine(&config, registry, profile.as_deref())?;
            let samples = audio::read_wav(&wav, config.sample_rate)?;
            let result = engine.score_recording(&samples);
            println!("{}", serde_json::to_string_pretty(&result)?);
            if let Some(dir) = save {
                save_answer(&dir, &question, &samples, &config, result)?;
            }
        }
        Command::Record {
            seconds,
            profile,
            save,
        } => {
            let mut engine = batch_engine(&config, registry, profile.as_deref())?;
            let settings = *engine.settings();
            let device = config.input_device.clone();
            println!("Recording for {seconds} s...");
            let samples = tokio::task::spawn_blocking(move || {
                audio::record_for(
                    Duration::from_secs(seconds),
                    device.as_deref(),
                    settings.sample_rate,
                    settings.chunk_len(),
                )
            })
            .await
            .context("Recording task failed")??;

            let result = engine.score_recording(&samples);
            print_answer(&result);
            if save {
                save_answer(&paths::get_results_dir(), "", &samples, &config, result)?;
            }
        }
        Command::Live { profile } => {
            run_live(&config, registry, profile.as_deref()).await?;
        }
    }

    Ok(())
}

fn attach_model(engine: ConfidenceEngine, config: &AppConfig) -> ConfidenceEngine {
    match &config.model_path {
        Some(path) => engine.with_regression(Box::new(OnnxRegressionScorer::load(path))),
        None => engine,
    }
}

fn batch_engine(
    config: &AppConfig,
    registry: ProfileRegistry,
    profile: Option<&str>,
) -> Result<ConfidenceEngine> {
    let key = profile.unwrap_or(&config.profile);
    let engine = ConfidenceEngine::new(ModePolicy::batch(), config.engine_settings(), registry, key)?;
    Ok(attach_model(engine, config))
}

fn print_answer(result: &ConfidenceResult) {
    if !result.speech_detected {
        println!("No speech detected ({:.1} s of audio)", result.audio_duration);
        return;
    }
    let f = &result.clipped_features;
    println!("Confidence: {:.1}/100 [{}]", result.confidence, result.rating);
    if let Some(ml) = result.ml_confidence {
        println!("Model:      {ml:.1}/100");
    }
    println!(
        "Pauses/min {:.1}  avg pause {:.2} s  silence {:.0}%  rate {:.1}  pitch sd {:.1} Hz",
        f.pause_freq,
        f.avg_pause,
        f.silence_ratio * 100.0,
        f.speech_rate,
        f.pitch_std
    );
}

fn save_answer(
    dir: &Path,
    question: &str,
    samples: &[f32],
    config: &AppConfig,
    result: ConfidenceResult,
) -> Result<()> {
    let mut sink = JsonFileSink::new(dir)?;
    let record = assemble_answer(
        Question {
            number: 1,
            text: question,
            reference: None,
        },
        samples,
        config.sample_rate,
        result,
        None,
        None,
    );
    let path = sink.save_answer(&record)?;
    println!("Saved {}", path.display());
    Ok(())
}

async fn run_live(config: &AppConfig, registry: ProfileRegistry, profile: Option<&str>) -> Result<()> {
    let key = profile.unwrap_or(&config.profile);
    let engine = ConfidenceEngine::new(
        ModePolicy::streaming(),
        config.engine_settings(),
        registry,
        key,
    )?;
    let engine = attach_model(engine, config);
    let settings = *engine.settings();

    let (producer, consumer) = chunk_queue(Some(config.queue_capacity));
    let stream = audio::start_capture(
        producer,
        config.input_device.as_deref(),
        settings.sample_rate,
        settings.chunk_len(),
    )?;

    let running = Arc::new(AtomicBool::new(true));
    let (mut analyzer, commands) = LiveAnalyzer::new(engine, consumer);
    spawn_stdin_reader(commands);
    let worker = {
        let running = Arc::clone(&running);
        std::thread::spawn(move || analyzer.run(&running, print_update))
    };

    println!("Listening... type `profile <key>` or `reset`, Ctrl-C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    running.store(false, Ordering::SeqCst);
    drop(stream);
    if worker.join().is_err() {
        anyhow::bail!("Live analysis thread panicked");
    }
    Ok(())
}

/// Forward console commands to the live analyzer until stdin closes or the
/// analyzer goes away.
fn spawn_stdin_reader(tx: Sender<StreamCommand>) {
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let text = match line {
                Ok(text) => text,
                Err(e) => {
                    error!("stdin read error: {}", e);
                    break;
                }
            };
            if text.trim().is_empty() {
                continue;
            }
            match StreamCommand::parse(&text) {
                Some(cmd) => {
                    debug!(?cmd, "Console command");
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                None => {
                    warn!(input = %text.trim(), "Unknown console command");
                    eprintln!("Commands: profile <key> | reset");
                }
            }
        }
        debug!("stdin reader thread exiting");
    });
}

fn print_update(update: StreamUpdate) {
    match update {
        StreamUpdate::WarmingUp(status) => println!("Warming up: {status}"),
        StreamUpdate::Score { inference, result } => {
            let f = &result.clipped_features;
            println!(
                "#{inference:<4} {:>5.1} {:<10} pauses/min {:>5.1}  silence {:>3.0}%  rate {:>4.1}  pitch sd {:>4.1}",
                result.confidence,
                result.rating.to_string(),
                f.pause_freq,
                f.silence_ratio * 100.0,
                f.speech_rate,
                f.pitch_std
            );
        }
        StreamUpdate::ProfileChanged(key) => println!("Profile: {key}"),
        StreamUpdate::SessionReset => println!("Session reset"),
        StreamUpdate::ChunksDropped(total) => println!("Warning: {total} chunks dropped"),
        StreamUpdate::Error(e) => eprintln!("Error: {e}"),
    }
}
