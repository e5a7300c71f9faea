//! Engine configuration
//!
//! All tunable constants live in one immutable value passed to pipeline
//! constructors, so independent pipelines (e.g. two files being compared)
//! cannot interfere through shared globals.

use crate::bands::BandDef;
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// How multi-channel PSD values are collapsed into one value per band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChannelAggregation {
    /// Mean power across all selected channels (canonical default)
    #[default]
    Average,
    /// Left-channel-subset power minus right-channel-subset power.
    /// Requires at least 4 channels; falls back to Average otherwise.
    HemisphericDifference,
}

/// Configuration consumed by every engine pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Number of sensor channels
    pub channel_count: usize,
    /// Frequency band table
    pub bands: Vec<BandDef>,
    /// Lowpass cutoff for envelope smoothing, in Hz
    pub smoothing_cutoff_hz: f64,
    /// Butterworth order for band isolation
    pub bandpass_order: usize,
    /// Butterworth order for envelope smoothing
    pub smoothing_order: usize,
    /// Seconds of history held in each display buffer
    pub window_seconds: f64,
    /// Display/analysis updates per second
    pub update_rate: f64,
    /// Moving-average window for trend curves, in samples
    pub trend_window: usize,
    /// Outlier threshold for the comparator, in standard deviations
    pub outlier_sigma: f64,
    /// Channel aggregation mode for spectral band power
    pub aggregation: ChannelAggregation,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 256.0,
            channel_count: 4,
            bands: BandDef::eeg_bands(),
            smoothing_cutoff_hz: 0.5,
            bandpass_order: 3,
            smoothing_order: 1,
            window_seconds: 30.0,
            update_rate: 10.0,
            trend_window: 30,
            outlier_sigma: 3.0,
            aggregation: ChannelAggregation::Average,
        }
    }
}

impl EngineConfig {
    /// Analysis window length in samples (one second of signal)
    pub fn window_size(&self) -> usize {
        self.sampling_rate as usize
    }

    /// Hop between analysis windows, in samples (fractional)
    pub fn step_size(&self) -> f64 {
        self.sampling_rate / self.update_rate
    }

    /// Capacity of a display buffer, in samples
    pub fn display_capacity(&self) -> usize {
        (self.sampling_rate * self.window_seconds) as usize
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.sampling_rate <= 0.0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Sampling rate must be positive".to_string(),
            });
        }
        if self.channel_count == 0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Channel count must be at least 1".to_string(),
            });
        }
        if self.bands.is_empty() {
            return Err(EngineError::InvalidConfiguration {
                reason: "Band table cannot be empty".to_string(),
            });
        }
        for band in &self.bands {
            if band.low_hz >= band.high_hz {
                return Err(EngineError::InvalidConfiguration {
                    reason: format!(
                        "Band '{}' has low edge {} >= high edge {}",
                        band.name, band.low_hz, band.high_hz
                    ),
                });
            }
        }
        if self.smoothing_cutoff_hz <= 0.0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Smoothing cutoff must be positive".to_string(),
            });
        }
        if self.bandpass_order == 0 || self.smoothing_order == 0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Filter orders must be at least 1".to_string(),
            });
        }
        if self.window_seconds <= 0.0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Display window must be positive".to_string(),
            });
        }
        if self.update_rate <= 0.0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Update rate must be positive".to_string(),
            });
        }
        if self.trend_window == 0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Trend window must be at least 1 sample".to_string(),
            });
        }
        if self.outlier_sigma <= 0.0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Outlier threshold must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_size(), 256);
        assert!((config.step_size() - 25.6).abs() < 1e-12);
        assert_eq!(config.display_capacity(), 256 * 30);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut config = EngineConfig::default();
        config.sampling_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.bands[0].low_hz = 10.0;
        config.bands[0].high_hz = 4.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.bands.clear();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.trend_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_aggregation_default_is_average() {
        assert_eq!(
            EngineConfig::default().aggregation,
            ChannelAggregation::Average
        );
    }
}
