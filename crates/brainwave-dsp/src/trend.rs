//! Sliding-window trend extraction over recorded signals
//!
//! Drives the spectral estimator across a finite recording at a fixed hop,
//! producing one power value per band per time step plus a moving-average
//! trend curve over each series.

use crate::spectral::SpectralEstimator;
use brainwave_core::EngineConfig;

/// Per-band power series over a recording.
///
/// `values[band][step]` pairs with `timestamps[step]` (seconds from the
/// start of the recording). Built once per analysis; never reordered.
#[derive(Debug, Clone)]
pub struct BandPowerSeries {
    pub band_names: Vec<String>,
    pub timestamps: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

impl BandPowerSeries {
    /// Number of time steps
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Raw series for one band
    pub fn band_series(&self, band_index: usize) -> Option<&[f64]> {
        self.values.get(band_index).map(|v| v.as_slice())
    }

    /// Centered moving-average trend per band; edges are filled with the
    /// nearest valid value so the curves have no gaps
    pub fn trend(&self, window: usize) -> Vec<Vec<f64>> {
        self.values
            .iter()
            .map(|series| moving_average(series, window, true))
            .collect()
    }
}

/// Runs the spectral estimator over a recording with a sliding window.
///
/// Window k covers `[floor(k * step), floor(k * step) + window_size)` and
/// windows are taken while they fit entirely inside the recording, so a
/// recording of N samples yields `floor((N - window) / step) + 1` steps
/// with the first timestamp at 0.0.
pub struct TrendBuilder {
    window_size: usize,
    step_size: f64,
    sampling_rate: f64,
    estimator: SpectralEstimator,
}

impl TrendBuilder {
    /// Builder with the configured defaults: 1-second window, hop of
    /// `sampling_rate / update_rate` samples
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_params(config, config.window_size(), config.step_size())
    }

    pub fn with_params(config: &EngineConfig, window_size: usize, step_size: f64) -> Self {
        Self {
            window_size,
            step_size,
            sampling_rate: config.sampling_rate,
            estimator: SpectralEstimator::new(config),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Analyze a whole recording (`channels[channel][sample]`)
    pub fn analyze(&mut self, channels: &[Vec<f64>]) -> BandPowerSeries {
        let band_names = self.estimator.band_names();
        let total_samples = channels.first().map(|c| c.len()).unwrap_or(0);

        let mut timestamps = Vec::new();
        let mut values = vec![Vec::new(); band_names.len()];

        if self.window_size > 0 && self.step_size > 0.0 {
            let mut step_index = 0usize;
            loop {
                let start = (step_index as f64 * self.step_size) as usize;
                if start + self.window_size > total_samples {
                    break;
                }

                let window: Vec<Vec<f64>> = channels
                    .iter()
                    .map(|ch| ch[start..start + self.window_size].to_vec())
                    .collect();
                let powers = self.estimator.band_powers(&window);

                timestamps.push(start as f64 / self.sampling_rate);
                for (band_idx, power) in powers.into_iter().enumerate() {
                    values[band_idx].push(power);
                }
                step_index += 1;
            }
        }

        BandPowerSeries {
            band_names,
            timestamps,
            values,
        }
    }
}

/// Moving average with nearest-valid-value edge filling.
///
/// `centered` averages the window around each point (the batch-analysis
/// trend); otherwise the window trails the point (the live trend). Points
/// without a complete window take the nearest computed value, backward
/// fill first, then forward. A series shorter than the window degenerates
/// to its overall mean.
pub fn moving_average(series: &[f64], window: usize, centered: bool) -> Vec<f64> {
    let n = series.len();
    if n == 0 || window == 0 {
        return Vec::new();
    }
    if n < window {
        let mean = series.iter().sum::<f64>() / n as f64;
        return vec![mean; n];
    }

    let mut trend = vec![f64::NAN; n];
    for i in 0..n {
        let (lo, hi) = if centered {
            (
                i as isize - ((window - 1) / 2) as isize,
                i as isize + (window / 2) as isize,
            )
        } else {
            (i as isize - (window as isize - 1), i as isize)
        };
        if lo >= 0 && (hi as usize) < n {
            let slice = &series[lo as usize..=hi as usize];
            trend[i] = slice.iter().sum::<f64>() / window as f64;
        }
    }

    // Backward fill then forward fill
    if let Some(first_valid) = trend.iter().position(|v| !v.is_nan()) {
        let fill = trend[first_valid];
        for slot in trend[..first_valid].iter_mut() {
            *slot = fill;
        }
    }
    if let Some(last_valid) = trend.iter().rposition(|v| !v.is_nan()) {
        let fill = trend[last_valid];
        for slot in trend[last_valid + 1..].iter_mut() {
            *slot = fill;
        }
    }
    trend
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn pure_tone_recording(freq: f64, amplitude: f64, seconds: usize) -> Vec<Vec<f64>> {
        let samples = seconds * 256;
        (0..4)
            .map(|_| {
                (0..samples)
                    .map(|i| amplitude * (2.0 * PI * freq * i as f64 / 256.0).sin())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_step_count_and_first_timestamp() {
        // 20 s at 256 Hz, 1 s window, 10 Hz update rate:
        // floor((5120 - 256) / 25.6) + 1 = 191 steps
        let config = EngineConfig::default();
        let mut builder = TrendBuilder::new(&config);
        let recording = pure_tone_recording(10.0, 50.0, 20);

        let series = builder.analyze(&recording);
        assert_eq!(series.len(), 191);
        assert_eq!(series.timestamps[0], 0.0);
        assert_eq!(series.values.len(), 5);
        assert_eq!(series.values[0].len(), 191);

        // Last window starts exactly at total - window
        let last = *series.timestamps.last().unwrap();
        assert!((last - 4864.0 / 256.0).abs() < 1e-9);
    }

    #[test]
    fn test_alpha_dominates_every_step() {
        // End-to-end: a pure 10 Hz tone keeps Alpha above every other band
        // at every time step of the trend
        let config = EngineConfig::default();
        let mut builder = TrendBuilder::new(&config);
        let recording = pure_tone_recording(10.0, 50.0, 10);

        let series = builder.analyze(&recording);
        assert!(!series.is_empty());

        let trend = series.trend(config.trend_window);
        for step in 0..series.len() {
            let alpha = trend[2][step];
            for band in [0usize, 1, 3, 4] {
                assert!(
                    alpha > trend[band][step],
                    "step {}: alpha {} vs band {} at {}",
                    step,
                    alpha,
                    band,
                    trend[band][step]
                );
            }
        }
    }

    #[test]
    fn test_too_short_recording_yields_empty_series() {
        let config = EngineConfig::default();
        let mut builder = TrendBuilder::new(&config);
        let recording = vec![vec![0.0; 100]; 4];

        let series = builder.analyze(&recording);
        assert!(series.is_empty());
        assert_eq!(series.band_names.len(), 5);
    }

    #[test]
    fn test_moving_average_centered_fill() {
        let series: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let trend = moving_average(&series, 4, true);

        assert_eq!(trend.len(), 10);
        // Valid core: window [i-1, i+2]
        assert!((trend[1] - 1.5).abs() < 1e-12);
        assert!((trend[7] - 7.5).abs() < 1e-12);
        // Edges take the nearest valid value
        assert_eq!(trend[0], trend[1]);
        assert_eq!(trend[9], trend[8]);
        assert_eq!(trend[8], trend[7]);
        assert!(trend.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_moving_average_trailing() {
        let series = vec![2.0, 4.0, 6.0, 8.0];
        let trend = moving_average(&series, 2, false);

        assert_eq!(trend[1], 3.0);
        assert_eq!(trend[2], 5.0);
        assert_eq!(trend[3], 7.0);
        // Leading edge backward-filled
        assert_eq!(trend[0], 3.0);
    }

    #[test]
    fn test_moving_average_short_series() {
        let series = vec![1.0, 2.0, 3.0];
        let trend = moving_average(&series, 30, true);
        assert_eq!(trend, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_moving_average_empty() {
        assert!(moving_average(&[], 5, true).is_empty());
    }
}
