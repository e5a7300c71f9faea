//! Chunk capture to append-mode CSV
//!
//! An independent service: subscribe it to a stream, `start()` it, and it
//! periodically persists accumulated rows so a crash loses at most a few
//! seconds. The header is written only when the destination file is new,
//! so a stopped and restarted recording appends cleanly.

use brainwave_core::{EngineError, EngineResult, SampleChunk};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

/// Number of sensor columns persisted per row
const SENSOR_COUNT: usize = 4;

/// Recorder settings
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Destination CSV file
    pub path: PathBuf,
    /// How often accumulated rows are flushed to disk
    pub flush_interval: Duration,
}

impl RecorderConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_interval: Duration::from_secs(3),
        }
    }
}

/// One buffered CSV row: timestamp plus the four sensor values
struct RecordRow {
    timestamp: String,
    sensors: [f64; SENSOR_COUNT],
}

/// Captures sample chunks from a broadcast stream into a CSV file
pub struct Recorder {
    config: RecorderConfig,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<EngineResult<u64>>>,
}

impl Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            shutdown: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Begin capturing from the given receiver. A second `start` while
    /// running is a no-op.
    pub fn start(&mut self, receiver: broadcast::Receiver<SampleChunk>) {
        if self.task.is_some() {
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = self.config.clone();
        info!(path = %config.path.display(), "Recording started");

        self.shutdown = Some(shutdown_tx);
        self.task = Some(tokio::spawn(record_loop(config, receiver, shutdown_rx)));
    }

    /// Stop capturing, flush the tail and return the number of rows
    /// written over the whole session
    pub async fn stop(&mut self) -> EngineResult<u64> {
        let task = match self.task.take() {
            Some(task) => task,
            None => return Ok(0),
        };
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }

        let rows = task.await.map_err(|e| EngineError::StreamError {
            reason: format!("Recorder task failed: {}", e),
        })??;
        info!(rows, "Recording stopped");
        Ok(rows)
    }
}

async fn record_loop(
    config: RecorderConfig,
    mut receiver: broadcast::Receiver<SampleChunk>,
    mut shutdown: watch::Receiver<bool>,
) -> EngineResult<u64> {
    let mut pending: Vec<RecordRow> = Vec::new();
    let mut total_rows = 0u64;
    let mut ticker = interval(config.flush_interval);
    // The first interval tick fires immediately; skip it
    ticker.tick().await;

    loop {
        tokio::select! {
            result = receiver.recv() => match result {
                Ok(chunk) => buffer_chunk(&mut pending, chunk),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Recorder lagging behind the stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = ticker.tick() => {
                total_rows += flush_rows(&config.path, &mut pending)?;
            }
            _ = shutdown.changed() => {
                // Drain whatever is already queued before the final flush
                while let Ok(chunk) = receiver.try_recv() {
                    buffer_chunk(&mut pending, chunk);
                }
                break;
            }
        }
    }

    total_rows += flush_rows(&config.path, &mut pending)?;
    Ok(total_rows)
}

fn buffer_chunk(pending: &mut Vec<RecordRow>, chunk: SampleChunk) {
    if chunk.is_empty() {
        return;
    }
    if chunk.channel_count < SENSOR_COUNT {
        warn!(
            channels = chunk.channel_count,
            "Skipping chunk with too few channels for the recording format"
        );
        return;
    }

    let chunk = chunk.truncate_channels(SENSOR_COUNT);
    let timestamp = chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string();

    for frame_idx in 0..chunk.frame_count() {
        let start = frame_idx * SENSOR_COUNT;
        let mut sensors = [0.0; SENSOR_COUNT];
        sensors.copy_from_slice(&chunk.data[start..start + SENSOR_COUNT]);
        pending.push(RecordRow {
            timestamp: timestamp.clone(),
            sensors,
        });
    }
}

/// Append buffered rows to the file, writing the header only when the
/// destination does not exist yet
fn flush_rows(path: &Path, pending: &mut Vec<RecordRow>) -> EngineResult<u64> {
    if pending.is_empty() {
        return Ok(0);
    }

    let write_header = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| EngineError::StreamError {
            reason: format!("Cannot open {}: {}", path.display(), e),
        })?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if write_header {
        writer
            .write_record(["TimeStamp", "TP9", "AF7", "AF8", "TP10"])
            .map_err(|e| EngineError::StreamError {
                reason: format!("Cannot write header: {}", e),
            })?;
    }

    let count = pending.len() as u64;
    for row in pending.drain(..) {
        let mut record = vec![row.timestamp];
        record.extend(row.sensors.iter().map(|v| v.to_string()));
        writer
            .write_record(&record)
            .map_err(|e| EngineError::StreamError {
                reason: format!("Cannot write row: {}", e),
            })?;
    }

    writer.flush().map_err(|e| EngineError::StreamError {
        reason: format!("Cannot flush {}: {}", path.display(), e),
    })?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::load_recording;
    use tokio::sync::broadcast;

    fn chunk_of(value: f64, frames: usize) -> SampleChunk {
        SampleChunk::new(vec![value; frames * 4], 4, 256.0).unwrap()
    }

    #[tokio::test]
    async fn test_record_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.csv");

        let (sender, receiver) = broadcast::channel(16);
        let mut recorder = Recorder::new(RecorderConfig::new(&path));
        recorder.start(receiver);

        sender.send(chunk_of(1.5, 10)).unwrap();
        sender.send(chunk_of(-2.5, 6)).unwrap();
        drop(sender);

        let rows = recorder.stop().await.unwrap();
        assert_eq!(rows, 16);

        let recording = load_recording(&path).unwrap();
        assert_eq!(recording.frame_count(), 16);
        assert_eq!(recording.channels.len(), 4);
        assert_eq!(recording.channels[0][0], 1.5);
        assert_eq!(recording.channels[3][15], -2.5);
    }

    #[tokio::test]
    async fn test_header_written_once_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("append.csv");

        for _ in 0..2 {
            let (sender, receiver) = broadcast::channel(16);
            let mut recorder = Recorder::new(RecorderConfig::new(&path));
            recorder.start(receiver);
            sender.send(chunk_of(1.0, 4)).unwrap();
            drop(sender);
            recorder.stop().await.unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let header_lines = contents
            .lines()
            .filter(|line| line.starts_with("TimeStamp"))
            .count();
        assert_eq!(header_lines, 1);

        let recording = load_recording(&path).unwrap();
        assert_eq!(recording.frame_count(), 8);
    }

    #[tokio::test]
    async fn test_wide_chunks_are_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.csv");

        let (sender, receiver) = broadcast::channel(16);
        let mut recorder = Recorder::new(RecorderConfig::new(&path));
        recorder.start(receiver);

        // 6-channel frames: AUX channels must not reach the file
        let chunk = SampleChunk::new((0..12).map(|i| i as f64).collect(), 6, 256.0).unwrap();
        sender.send(chunk).unwrap();
        drop(sender);
        recorder.stop().await.unwrap();

        let recording = load_recording(&path).unwrap();
        assert_eq!(recording.frame_count(), 2);
        assert_eq!(recording.channels[0], vec![0.0, 6.0]);
        assert_eq!(recording.channels[3], vec![3.0, 9.0]);
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let mut recorder = Recorder::new(RecorderConfig::new("unused.csv"));
        assert_eq!(recorder.stop().await.unwrap(), 0);
        assert!(!recorder.is_running());
    }
}
