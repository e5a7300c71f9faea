//! Real-time EEG chunk streaming
//!
//! Runs the signal source on its own task so pulling data never blocks a
//! consumer, and fans fully-formed immutable chunks out over a broadcast
//! channel. Consumers are tick-driven and simply take whatever arrived
//! since their last tick.

use crate::simulator::{EegSimulator, SimulatorConfig};
use brainwave_core::{EngineError, EngineResult, SampleChunk};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::{interval, Duration};
use tracing::{info, warn};

/// Configuration for real-time streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Signal source configuration
    pub simulator: SimulatorConfig,
    /// Chunk duration in seconds (e.g. 0.1 for 100 ms chunks)
    pub chunk_duration: f64,
    /// Broadcast buffer size (number of chunks kept for slow consumers)
    pub buffer_size: usize,
    /// Chunk emissions per second
    pub update_rate: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            simulator: SimulatorConfig::default(),
            chunk_duration: 0.1,
            buffer_size: 64,
            update_rate: 10.0,
        }
    }
}

/// Commands for controlling the stream
#[derive(Debug, Clone)]
pub enum StreamCommand {
    Start,
    Stop,
    Pause,
    Resume,
    UpdateConfig(StreamConfig),
}

/// Stream statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStats {
    pub is_running: bool,
    pub chunks_generated: u64,
    pub total_duration: f64,
}

/// Real-time EEG chunk stream
pub struct RealTimeEegStream {
    config: StreamConfig,
    simulator: Arc<Mutex<EegSimulator>>,
    data_sender: broadcast::Sender<SampleChunk>,
    control_receiver: mpsc::Receiver<StreamCommand>,
    control_sender: mpsc::Sender<StreamCommand>,
    is_running: Arc<Mutex<bool>>,
}

impl RealTimeEegStream {
    pub fn new(config: StreamConfig) -> EngineResult<Self> {
        if config.update_rate <= 0.0 || config.chunk_duration <= 0.0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Stream update rate and chunk duration must be positive".to_string(),
            });
        }

        let simulator = EegSimulator::new(config.simulator.clone())?;
        let (data_sender, _) = broadcast::channel(config.buffer_size.max(1));
        let (control_sender, control_receiver) = mpsc::channel(32);

        Ok(RealTimeEegStream {
            config,
            simulator: Arc::new(Mutex::new(simulator)),
            data_sender,
            control_receiver,
            control_sender,
            is_running: Arc::new(Mutex::new(false)),
        })
    }

    /// Get a receiver for chunk updates
    pub fn subscribe(&self) -> broadcast::Receiver<SampleChunk> {
        self.data_sender.subscribe()
    }

    /// Get a sender for control commands
    pub fn control_handle(&self) -> mpsc::Sender<StreamCommand> {
        self.control_sender.clone()
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.lock().await
    }

    /// Drive the stream until the control channel closes
    pub async fn run(&mut self) -> EngineResult<()> {
        let mut ticker = interval(Duration::from_secs_f64(1.0 / self.config.update_rate));
        let mut stats = StreamStats {
            is_running: false,
            chunks_generated: 0,
            total_duration: 0.0,
        };

        info!(
            update_rate = self.config.update_rate,
            chunk_ms = self.config.chunk_duration * 1000.0,
            "EEG stream task started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !*self.is_running.lock().await {
                        continue;
                    }

                    let chunk = {
                        let mut simulator = self.simulator.lock().await;
                        simulator.generate_chunk(self.config.chunk_duration)?
                    };

                    stats.chunks_generated += 1;
                    stats.total_duration += chunk.duration();

                    // Ignore the error when nobody is subscribed yet
                    let _ = self.data_sender.send(chunk);
                }

                command = self.control_receiver.recv() => {
                    match command {
                        Some(StreamCommand::Start) => {
                            *self.is_running.lock().await = true;
                            stats.is_running = true;
                            info!("EEG stream started");
                        }
                        Some(StreamCommand::Stop) => {
                            *self.is_running.lock().await = false;
                            info!(
                                chunks = stats.chunks_generated,
                                seconds = stats.total_duration,
                                "EEG stream stopped"
                            );
                            stats.is_running = false;
                            stats.chunks_generated = 0;
                            stats.total_duration = 0.0;
                            self.simulator.lock().await.reset_time();
                        }
                        Some(StreamCommand::Pause) => {
                            *self.is_running.lock().await = false;
                            stats.is_running = false;
                            info!("EEG stream paused");
                        }
                        Some(StreamCommand::Resume) => {
                            *self.is_running.lock().await = true;
                            stats.is_running = true;
                            info!("EEG stream resumed");
                        }
                        Some(StreamCommand::UpdateConfig(new_config)) => {
                            if let Err(error) = self
                                .simulator
                                .lock()
                                .await
                                .update_config(new_config.simulator.clone())
                            {
                                warn!(%error, "Rejected stream config update");
                                continue;
                            }
                            ticker = interval(Duration::from_secs_f64(
                                1.0 / new_config.update_rate.max(0.1),
                            ));
                            self.config = new_config;
                            info!("EEG stream configuration updated");
                        }
                        None => {
                            info!("EEG stream control channel closed");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Create a stream, spawn its task in the background and hand back the
/// consumer-facing handles
pub async fn start_eeg_stream(
    config: StreamConfig,
) -> EngineResult<(broadcast::Receiver<SampleChunk>, mpsc::Sender<StreamCommand>)> {
    let mut stream = RealTimeEegStream::new(config)?;
    let data_receiver = stream.subscribe();
    let control_sender = stream.control_handle();

    tokio::spawn(async move {
        if let Err(error) = stream.run().await {
            warn!(%error, "EEG stream task failed");
        }
    });

    Ok((data_receiver, control_sender))
}
