use anyhow::{Context, Result};
use auris::audio::capture::{list_devices, CpalAudioSource};
use auris::audio::level::LevelMonitor;
use auris::config::Config;
use auris::detect::machine::CaptureMachine;
use auris::dispatch::{Dispatcher, HttpClassifier, MemorySession, StdoutSink};
use auris::gate::ListeningGate;
use auris::vad::{TranscriptionCapture, VadPipeline};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "auris", version, about = "Ambient sound event detection client")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Audio input device name
    #[arg(short, long)]
    device: Option<String>,

    /// Classification service base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token for the classification service
    #[arg(long)]
    token: Option<String>,

    /// Amplitude threshold (0-255) that triggers a capture
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Also run the voice activity pipeline on its own stream
    #[arg(long)]
    vad: bool,

    /// List available audio input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Print per-transition status lines
    #[arg(short, long)]
    verbose: bool,
}

/// Transcription capture stand-in that reports session boundaries.
struct LoggingCapture;

impl TranscriptionCapture for LoggingCapture {
    fn start(&mut self) -> auris::Result<()> {
        println!("auris: transcription session started");
        Ok(())
    }

    fn stop(&mut self) -> auris::Result<()> {
        println!("auris: transcription session stopped");
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        for name in list_devices().context("Failed to enumerate audio devices")? {
            println!("{name}");
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    config = config.with_env_overrides();
    if let Some(device) = cli.device {
        config.audio.device = Some(device);
    }
    if let Some(url) = cli.api_url {
        config.service.base_url = url;
    }
    if let Some(token) = cli.token {
        config.service.token = Some(token);
    }
    if let Some(threshold) = cli.threshold {
        config.detector.level_threshold = threshold;
    }

    let session = Arc::new(MemorySession::new(config.service.token.clone()));
    let classifier = Arc::new(HttpClassifier::new(&config.service, session.clone())?);
    let dispatcher = Arc::new(Dispatcher::new(classifier, Arc::new(StdoutSink)));

    let source = CpalAudioSource::new(config.audio.device.as_deref())?;
    let mut monitor = LevelMonitor::new(Box::new(source), config.audio.sample_rate);
    monitor
        .open()
        .context("Failed to open the audio input stream")?;
    let monitor = Arc::new(monitor);

    let gate = ListeningGate::new(true);
    let machine = CaptureMachine::new(
        Arc::clone(&monitor),
        dispatcher,
        gate.clone(),
        &config.detector,
    )?;
    let status = machine.status_handle();
    let detector = machine.spawn();

    let vad_handle = if cli.vad {
        let vad_source = CpalAudioSource::new(config.audio.device.as_deref())?;
        Some(VadPipeline::spawn(
            Box::new(vad_source),
            config.vad.clone(),
            config.audio.sample_rate,
            Box::new(LoggingCapture),
        )?)
    } else {
        None
    };

    println!(
        "auris {} listening (threshold {})",
        auris::version_string(),
        config.detector.level_threshold
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    if cli.verbose {
        runtime.block_on(async {
            let mut last = String::new();
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = tokio::time::sleep(std::time::Duration::from_millis(250)) => {
                        let line = status
                            .lock()
                            .map(|s| s.to_string())
                            .unwrap_or_default();
                        if line != last {
                            println!("auris: {line}");
                            last = line;
                        }
                    }
                }
            }
        });
    } else {
        runtime.block_on(tokio::signal::ctrl_c())?;
    }

    println!("auris: shutting down");
    detector.stop();
    if let Some(handle) = vad_handle {
        handle.stop();
    }

    Ok(())
}
