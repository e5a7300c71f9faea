//! Brainwave Monitor - headless EEG band-power analysis
//!
//! Three entry points around the engine: live monitoring of a streaming
//! source, whole-file trend analysis, and statistical comparison of two
//! recorded sessions.

mod service;

use anyhow::{bail, Context};
use brainwave_core::EngineConfig;
use brainwave_stream::{
    load_recording, start_eeg_stream, FileSource, Recorder, RecorderConfig, StreamCommand,
    StreamConfig,
};
use service::LiveMonitor;
use std::path::{Path, PathBuf};
use tokio::time::{Duration, Instant};
use tracing::{info, warn};

const USAGE: &str = "\
Usage:
  brainwave-monitor live [--record <file.csv>] [--config <config.json>]
  brainwave-monitor analyze <file.csv> [--config <config.json>]
  brainwave-monitor compare <a.csv> <b.csv> [--config <config.json>]
  brainwave-monitor replay <file.csv> [--config <config.json>]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(&args)?;

    match args.first().map(String::as_str) {
        Some("live") => run_live(config, flag_value(&args, "--record")).await,
        Some("analyze") => {
            let path = positional(&args, 1)?;
            run_analyze(config, Path::new(&path))
        }
        Some("compare") => {
            let path_a = positional(&args, 1)?;
            let path_b = positional(&args, 2)?;
            run_compare(config, Path::new(&path_a), Path::new(&path_b))
        }
        Some("replay") => {
            let path = positional(&args, 1)?;
            run_replay(config, Path::new(&path))
        }
        _ => bail!("{}", USAGE),
    }
}

/// Optional JSON override for the engine configuration
fn load_config(args: &[String]) -> anyhow::Result<EngineConfig> {
    let config = match flag_value(args, "--config") {
        Some(path) => {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Cannot read config file {}", path))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Cannot parse config file {}", path))?
        }
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|idx| args.get(idx + 1))
        .cloned()
}

fn positional(args: &[String], index: usize) -> anyhow::Result<String> {
    match args.get(index) {
        Some(value) if !value.starts_with("--") => Ok(value.clone()),
        _ => bail!("{}", USAGE),
    }
}

/// Stream from the synthetic source, logging envelope values every tick
/// batch and a windowed-PSD readout once per second, until ctrl-c
async fn run_live(config: EngineConfig, record_path: Option<String>) -> anyhow::Result<()> {
    let mut stream_config = StreamConfig::default();
    stream_config.update_rate = config.update_rate;
    stream_config.simulator.sampling_rate = config.sampling_rate;
    stream_config.simulator.channel_count = config.channel_count;
    let (mut receiver, control) = start_eeg_stream(stream_config).await?;

    let mut recorder = record_path.map(|path| {
        let mut recorder = Recorder::new(RecorderConfig::new(PathBuf::from(path)));
        recorder.start(receiver.resubscribe());
        recorder
    });

    control.send(StreamCommand::Start).await?;
    let mut monitor = LiveMonitor::new(config)?;
    let band_names = monitor.band_names();
    let mut last_readout = Instant::now();

    info!("Live monitoring started; press ctrl-c to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            result = receiver.recv() => {
                let chunk = match result {
                    Ok(chunk) => chunk,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Monitor lagging behind the stream");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };

                if let Err(error) = monitor.ingest(chunk) {
                    warn!(%error, "Skipping chunk");
                    continue;
                }

                if last_readout.elapsed() >= Duration::from_secs(1) {
                    last_readout = Instant::now();
                    info!(
                        envelope = %format_bands(&band_names, &monitor.envelope_values()),
                        psd = %format_bands(&band_names, &monitor.spectral_snapshot()),
                        "Band power"
                    );
                }
            }
        }
    }

    control.send(StreamCommand::Stop).await.ok();
    if let Some(recorder) = recorder.as_mut() {
        let rows = recorder.stop().await?;
        info!(rows, "Recording flushed");
    }
    info!("Live monitoring stopped");
    Ok(())
}

/// Whole-file trend analysis with a per-band summary
fn run_analyze(config: EngineConfig, path: &Path) -> anyhow::Result<()> {
    let recording = load_recording(path)?;
    info!(
        path = %path.display(),
        seconds = recording.duration(config.sampling_rate),
        "Analyzing recording"
    );

    let analysis = service::analyze_recording(&config, &recording)?;
    info!(steps = analysis.series.len(), "Trend extracted");

    for (band_idx, band_name) in analysis.series.band_names.iter().enumerate() {
        let trend = &analysis.trend[band_idx];
        let mean = trend.iter().sum::<f64>() / trend.len().max(1) as f64;
        let min = trend.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = trend.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        info!(band = %band_name, mean, min, max, "Band trend");
    }
    Ok(())
}

/// Statistical comparison of two recordings, band by band
fn run_compare(config: EngineConfig, path_a: &Path, path_b: &Path) -> anyhow::Result<()> {
    let recording_a = load_recording(path_a)?;
    let recording_b = load_recording(path_b)?;
    info!(a = %path_a.display(), b = %path_b.display(), "Comparing recordings");

    let results = service::compare_recordings(&config, &recording_a, &recording_b)?;
    for (band_name, outcome) in results {
        match outcome {
            Ok(result) => info!(
                band = %band_name,
                mean_a = result.mean_a,
                mean_b = result.mean_b,
                percent_change = result.percent_change,
                p_value = result.p_value,
                significant = result.significant,
                conclusion = %result.conclusion,
                "Comparison"
            ),
            Err(error) => warn!(band = %band_name, %error, "Band not comparable"),
        }
    }
    Ok(())
}

/// Replay a recording through the live envelope pipeline
fn run_replay(config: EngineConfig, path: &Path) -> anyhow::Result<()> {
    let recording = load_recording(path)?;
    let chunk_frames = (config.sampling_rate / config.update_rate) as usize;
    let mut source = FileSource::new(recording, config.sampling_rate, chunk_frames.max(1))?;

    let band_names: Vec<String> = config.bands.iter().map(|b| b.name.clone()).collect();
    let values = service::replay_through_envelope(&config, &mut source)?;
    info!(
        envelope = %format_bands(&band_names, &values),
        "Replay finished"
    );
    Ok(())
}

fn format_bands(names: &[String], values: &[f64]) -> String {
    names
        .iter()
        .zip(values.iter())
        .map(|(name, value)| format!("{}={:.3}", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}
