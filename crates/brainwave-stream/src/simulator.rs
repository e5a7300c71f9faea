//! Synthetic EEG signal generation
//!
//! Sum of band-limited oscillations plus Gaussian noise, with a small
//! deterministic gain and phase spread across channels so the sensors are
//! correlated but not identical. Useful as a drop-in source when no
//! headset is streaming.

use crate::source::ChunkSource;
use brainwave_core::{EngineError, EngineResult, SampleChunk};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::Duration;

/// One sinusoidal component of the synthetic signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ToneConfig {
    pub frequency_hz: f64,
    pub amplitude: f64,
}

impl ToneConfig {
    pub fn new(frequency_hz: f64, amplitude: f64) -> Self {
        Self {
            frequency_hz,
            amplitude,
        }
    }
}

/// Configuration for the synthetic EEG source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Number of channels to synthesize
    pub channel_count: usize,
    /// Oscillations mixed into every channel
    pub tones: Vec<ToneConfig>,
    /// Gaussian noise standard deviation (0.0 = clean)
    pub noise_std: f64,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 256.0,
            channel_count: 4,
            // One oscillator per canonical band, strongest at the low end
            // like resting-state EEG
            tones: vec![
                ToneConfig::new(2.0, 20.0),
                ToneConfig::new(6.0, 12.0),
                ToneConfig::new(10.0, 15.0),
                ToneConfig::new(20.0, 6.0),
                ToneConfig::new(35.0, 2.0),
            ],
            noise_std: 4.0,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// A clean single-tone configuration, handy in tests
    pub fn pure_tone(frequency_hz: f64, amplitude: f64) -> Self {
        Self {
            tones: vec![ToneConfig::new(frequency_hz, amplitude)],
            noise_std: 0.0,
            seed: Some(0),
            ..Self::default()
        }
    }
}

/// Synthetic EEG source
pub struct EegSimulator {
    config: SimulatorConfig,
    rng: StdRng,
    noise: Option<Normal<f64>>,
    time_offset: f64,
}

impl EegSimulator {
    pub fn new(config: SimulatorConfig) -> EngineResult<Self> {
        if config.sampling_rate <= 0.0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Simulator sampling rate must be positive".to_string(),
            });
        }
        if config.channel_count == 0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Simulator needs at least one channel".to_string(),
            });
        }

        let seed = config.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        });
        let rng = StdRng::seed_from_u64(seed);

        let noise = if config.noise_std > 0.0 {
            Some(Normal::new(0.0, config.noise_std).map_err(|e| {
                EngineError::InvalidConfiguration {
                    reason: format!("Bad noise configuration: {}", e),
                }
            })?)
        } else {
            None
        };

        Ok(EegSimulator {
            config,
            rng,
            noise,
            time_offset: 0.0,
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Generate the next `duration` seconds of signal as one chunk
    pub fn generate_chunk(&mut self, duration: f64) -> EngineResult<SampleChunk> {
        let frames = (duration * self.config.sampling_rate) as usize;
        let channels = self.config.channel_count;
        let dt = 1.0 / self.config.sampling_rate;
        let mut data = Vec::with_capacity(frames * channels);

        for frame_idx in 0..frames {
            let time = self.time_offset + frame_idx as f64 * dt;
            for channel_idx in 0..channels {
                // Sensors see the same sources with slightly different
                // coupling; keep the spread deterministic so band content
                // stays comparable across channels
                let gain = 1.0 + 0.05 * channel_idx as f64;
                let phase = 0.3 * channel_idx as f64;

                let mut sample = 0.0;
                for tone in &self.config.tones {
                    sample +=
                        tone.amplitude * (2.0 * PI * tone.frequency_hz * time + phase).sin();
                }
                sample *= gain;

                if let Some(noise) = &self.noise {
                    sample += noise.sample(&mut self.rng);
                }
                data.push(sample);
            }
        }

        self.time_offset += frames as f64 * dt;
        SampleChunk::new(data, channels, self.config.sampling_rate)
    }

    /// Restart generation at t = 0
    pub fn reset_time(&mut self) {
        self.time_offset = 0.0;
    }

    pub fn update_config(&mut self, config: SimulatorConfig) -> EngineResult<()> {
        let mut replacement = EegSimulator::new(config)?;
        replacement.time_offset = self.time_offset;
        *self = replacement;
        Ok(())
    }
}

impl ChunkSource for EegSimulator {
    fn pull_chunk(&mut self, timeout: Duration) -> EngineResult<SampleChunk> {
        self.generate_chunk(timeout.as_secs_f64())
    }

    fn sampling_rate(&self) -> f64 {
        self.config.sampling_rate
    }

    fn channel_count(&self) -> usize {
        self.config.channel_count
    }
}
