//! Windowed band-power estimation via Welch's method
//!
//! The discrete counterpart to the envelope pipeline: one analysis window
//! of raw samples in, one log-power value per band out. Used both for the
//! live 1-second refresh and, driven by the trend builder, for dense
//! whole-file analysis. Stateless across invocations: identical input and
//! configuration always produce identical output.

use brainwave_core::{BandDef, ChannelAggregation, EngineConfig};
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::f64::consts::PI;
use std::sync::Arc;

/// Added to band power before taking log10, so silent bands map to a
/// finite floor instead of -inf
pub const PSD_LOG_EPSILON: f64 = 1e-6;

/// Per-band spectral power estimator.
///
/// Computes a one-sided PSD per channel with Welch's method (periodic Hann
/// window, 50% overlap, per-segment mean removal, density scaling) and
/// averages the bins falling inside each band's `[low, high]` range.
pub struct SpectralEstimator {
    sampling_rate: f64,
    bands: Vec<BandDef>,
    aggregation: ChannelAggregation,
    planner: RealFftPlanner<f64>,
}

impl SpectralEstimator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            sampling_rate: config.sampling_rate,
            bands: config.bands.clone(),
            aggregation: config.aggregation,
            planner: RealFftPlanner::new(),
        }
    }

    pub fn band_names(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.name.clone()).collect()
    }

    pub fn aggregation(&self) -> ChannelAggregation {
        self.aggregation
    }

    /// Band powers for one analysis window, one `log10(power + epsilon)`
    /// value per configured band.
    ///
    /// `channels` holds one sample vector per channel, all equally long.
    /// A zero-length window yields a zero vector rather than an error.
    /// Hemispheric difference needs at least 4 channels (left = 0,1,
    /// right = 2,3) and falls back to the plain average otherwise.
    pub fn band_powers(&mut self, channels: &[Vec<f64>]) -> Vec<f64> {
        let band_count = self.bands.len();
        let window_len = channels.first().map(|c| c.len()).unwrap_or(0);
        if window_len == 0 {
            return vec![0.0; band_count];
        }

        let segment_len = window_len.min(self.sampling_rate as usize).max(1);
        let psds: Vec<Vec<f64>> = channels
            .iter()
            .map(|channel| self.welch_psd(channel, segment_len))
            .collect();

        let freq_step = self.sampling_rate / segment_len as f64;
        let hemispheric = self.aggregation == ChannelAggregation::HemisphericDifference
            && channels.len() >= 4;

        let mut powers = Vec::with_capacity(band_count);
        for band in &self.bands {
            let bins: Vec<usize> = (0..psds[0].len())
                .filter(|&k| band.contains(k as f64 * freq_step))
                .collect();

            let power = if bins.is_empty() {
                0.0
            } else if hemispheric {
                mean_over(&psds[0..2], &bins) - mean_over(&psds[2..4], &bins)
            } else {
                mean_over(&psds, &bins)
            };

            // Log compression; floor keeps a negative hemispheric
            // difference finite instead of NaN
            powers.push((power + PSD_LOG_EPSILON).max(PSD_LOG_EPSILON).log10());
        }
        powers
    }

    /// One-sided Welch PSD of a single channel, `segment_len / 2 + 1` bins
    /// in units of power per Hz
    fn welch_psd(&mut self, signal: &[f64], segment_len: usize) -> Vec<f64> {
        if segment_len < 2 {
            return vec![0.0; segment_len / 2 + 1];
        }

        let overlap = segment_len / 2;
        let hop = segment_len - overlap;
        let num_segments = (signal.len() - segment_len) / hop + 1;

        // Periodic Hann window
        let window: Vec<f64> = (0..segment_len)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / segment_len as f64).cos())
            .collect();
        let window_power: f64 = window.iter().map(|w| w * w).sum();

        let fft: Arc<dyn RealToComplex<f64>> = self.planner.plan_fft_forward(segment_len);
        let mut input = fft.make_input_vec();
        let mut spectrum: Vec<Complex<f64>> = fft.make_output_vec();

        let bin_count = segment_len / 2 + 1;
        let mut accumulated = vec![0.0; bin_count];

        for segment_idx in 0..num_segments {
            let start = segment_idx * hop;
            let segment = &signal[start..start + segment_len];

            // Constant detrend before windowing
            let mean = segment.iter().sum::<f64>() / segment_len as f64;
            for (slot, (&sample, &coeff)) in
                input.iter_mut().zip(segment.iter().zip(window.iter()))
            {
                *slot = (sample - mean) * coeff;
            }

            fft.process(&mut input, &mut spectrum)
                .expect("FFT buffer lengths fixed at construction");

            for (bin, value) in spectrum.iter().enumerate() {
                accumulated[bin] += value.norm_sqr();
            }
        }

        // Density scaling; DC and Nyquist bins are not doubled
        let scale = 1.0 / (self.sampling_rate * window_power * num_segments as f64);
        let has_nyquist_bin = segment_len % 2 == 0;
        for (bin, value) in accumulated.iter_mut().enumerate() {
            let one_sided = if bin == 0 || (has_nyquist_bin && bin == bin_count - 1) {
                1.0
            } else {
                2.0
            };
            *value *= scale * one_sided;
        }
        accumulated
    }
}

/// Mean PSD value over the given channels and bins
fn mean_over(psds: &[Vec<f64>], bins: &[usize]) -> f64 {
    let total: f64 = psds
        .iter()
        .map(|psd| bins.iter().map(|&k| psd[k]).sum::<f64>())
        .sum();
    total / (psds.len() * bins.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use brainwave_core::BandDef;

    fn test_config() -> EngineConfig {
        EngineConfig::default()
    }

    fn sine_channels(freq: f64, amplitude: f64, channels: usize, samples: usize) -> Vec<Vec<f64>> {
        (0..channels)
            .map(|_| {
                (0..samples)
                    .map(|i| amplitude * (2.0 * PI * freq * i as f64 / 256.0).sin())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_zero_window_returns_zeros() {
        let mut estimator = SpectralEstimator::new(&test_config());
        assert_eq!(estimator.band_powers(&[]), vec![0.0; 5]);
        assert_eq!(
            estimator.band_powers(&[Vec::new(), Vec::new()]),
            vec![0.0; 5]
        );
    }

    #[test]
    fn test_idempotent_on_same_window() {
        let mut estimator = SpectralEstimator::new(&test_config());
        let window = sine_channels(10.0, 20.0, 4, 256);

        let first = estimator.band_powers(&window);
        let second = estimator.band_powers(&window);
        assert_eq!(first, second);
    }

    #[test]
    fn test_alpha_tone_dominates_alpha_band() {
        let mut estimator = SpectralEstimator::new(&test_config());
        let window = sine_channels(10.0, 50.0, 4, 256);

        let powers = estimator.band_powers(&window);
        let alpha = powers[2];
        for (idx, &value) in powers.iter().enumerate() {
            if idx != 2 {
                assert!(
                    alpha > value,
                    "alpha {} should exceed band {} at {}",
                    alpha,
                    idx,
                    value
                );
            }
        }
    }

    #[test]
    fn test_welch_peak_bin_location() {
        let mut estimator = SpectralEstimator::new(&test_config());
        let signal: Vec<f64> = (0..1024)
            .map(|i| (2.0 * PI * 10.0 * i as f64 / 256.0).sin())
            .collect();

        let psd = estimator.welch_psd(&signal, 256);
        assert_eq!(psd.len(), 129);

        let peak_bin = psd[1..]
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(i, _)| i + 1)
            .unwrap();
        // 1 Hz per bin at 256-point segments
        assert_eq!(peak_bin, 10);
    }

    #[test]
    fn test_welch_total_power_matches_signal_power() {
        // A sinusoid of amplitude A carries A^2/2 of power
        let mut estimator = SpectralEstimator::new(&test_config());
        let amplitude = 2.0;
        let signal: Vec<f64> = (0..2048)
            .map(|i| amplitude * (2.0 * PI * 10.0 * i as f64 / 256.0).sin())
            .collect();

        let psd = estimator.welch_psd(&signal, 256);
        let freq_step = 1.0;
        let total: f64 = psd.iter().map(|v| v * freq_step).sum();
        let expected = amplitude * amplitude / 2.0;
        assert!(
            (total / expected - 1.0).abs() < 0.05,
            "total {} expected {}",
            total,
            expected
        );
    }

    #[test]
    fn test_silent_window_hits_epsilon_floor() {
        let mut estimator = SpectralEstimator::new(&test_config());
        let window = vec![vec![0.0; 256]; 4];

        let powers = estimator.band_powers(&window);
        for value in powers {
            assert!((value - PSD_LOG_EPSILON.log10()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_hemispheric_difference_mode() {
        let mut config = test_config();
        config.aggregation = ChannelAggregation::HemisphericDifference;
        let mut estimator = SpectralEstimator::new(&config);

        // Strong alpha on the left pair only
        let mut window = sine_channels(10.0, 50.0, 2, 256);
        window.push(vec![0.0; 256]);
        window.push(vec![0.0; 256]);

        let powers = estimator.band_powers(&window);

        // Left minus right is large and positive in alpha
        let mut avg_estimator = SpectralEstimator::new(&test_config());
        let silent = avg_estimator.band_powers(&vec![vec![0.0; 256]; 4]);
        assert!(powers[2] > silent[2] + 1.0);

        // Right-dominant signal saturates at the finite floor, never NaN
        let mut reversed = vec![vec![0.0; 256], vec![0.0; 256]];
        reversed.extend(sine_channels(10.0, 50.0, 2, 256));
        let reversed_powers = estimator.band_powers(&reversed);
        assert!((reversed_powers[2] - PSD_LOG_EPSILON.log10()).abs() < 1e-9);
        assert!(reversed_powers.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_hemispheric_falls_back_below_four_channels() {
        let mut config = test_config();
        config.aggregation = ChannelAggregation::HemisphericDifference;
        let mut hemispheric = SpectralEstimator::new(&config);

        config.aggregation = ChannelAggregation::Average;
        let mut average = SpectralEstimator::new(&config);

        let window = sine_channels(10.0, 20.0, 2, 256);
        assert_eq!(hemispheric.band_powers(&window), average.band_powers(&window));
    }

    #[test]
    fn test_custom_band_table() {
        let mut config = test_config();
        config.bands = vec![BandDef::new("Narrow", 9.0, 11.0)];
        let mut estimator = SpectralEstimator::new(&config);

        let powers = estimator.band_powers(&sine_channels(10.0, 10.0, 1, 512));
        assert_eq!(powers.len(), 1);
        assert!(powers[0] > 0.0);
    }
}
