//! Continuous Butterworth filtering over chunked sample streams
//!
//! One filter instance owns its coefficients and its internal state, so
//! filtering a signal chunk-by-chunk is numerically identical to filtering
//! it in one call. Designs are computed in zero-pole-gain form (analog
//! prototype, frequency pre-warp, bilinear transform) and realised as a
//! cascade of transposed direct-form II biquad sections.

use brainwave_core::{EngineError, EngineResult};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Conjugate-pair tolerance when grouping digital poles into sections
const PAIRING_TOLERANCE: f64 = 1e-8;

/// Filter response type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    /// Passes frequencies below the cutoff
    Lowpass { cutoff_hz: f64 },
    /// Passes frequencies between the two cutoffs
    Bandpass { low_hz: f64, high_hz: f64 },
}

/// One second-order section with its streaming state
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    // Transposed direct form II state
    z1: f64,
    z2: f64,
    // Steady state for a unit constant input, used to seed z1/z2 so a
    // constant stream produces no startup transient
    z1_unit: f64,
    z2_unit: f64,
}

impl Biquad {
    #[inline]
    fn step(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

/// A stateful Butterworth filter (lowpass or bandpass).
///
/// `process` consumes one chunk and advances the internal state; two calls
/// over `[a, b]` produce exactly the same output as one call over `a ++ b`.
/// State is scoped to one pipeline instance and reset with [`reset`].
///
/// [`reset`]: ButterworthFilter::reset
#[derive(Debug, Clone)]
pub struct ButterworthFilter {
    kind: FilterKind,
    order: usize,
    sampling_rate: f64,
    sections: Vec<Biquad>,
    primed: bool,
}

impl ButterworthFilter {
    /// Design a filter. Fails with `InvalidDesign` for cutoffs at or above
    /// the Nyquist frequency, inverted band edges, non-positive cutoffs or
    /// a zero order.
    pub fn new(kind: FilterKind, order: usize, sampling_rate: f64) -> EngineResult<Self> {
        let sections = design_sections(&kind, order, sampling_rate)?;
        Ok(ButterworthFilter {
            kind,
            order,
            sampling_rate,
            sections,
            primed: false,
        })
    }

    /// Bandpass isolating `[low_hz, high_hz]`
    pub fn bandpass(low_hz: f64, high_hz: f64, order: usize, sampling_rate: f64) -> EngineResult<Self> {
        Self::new(FilterKind::Bandpass { low_hz, high_hz }, order, sampling_rate)
    }

    /// Lowpass below `cutoff_hz`
    pub fn lowpass(cutoff_hz: f64, order: usize, sampling_rate: f64) -> EngineResult<Self> {
        Self::new(FilterKind::Lowpass { cutoff_hz }, order, sampling_rate)
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Filter one chunk, returning the filtered chunk of identical length.
    ///
    /// The first sample ever seen scales the pre-computed steady state, so
    /// a constant input stream is passed through without a ramp-up.
    pub fn process(&mut self, chunk: &[f64]) -> Vec<f64> {
        if chunk.is_empty() {
            return Vec::new();
        }

        if !self.primed {
            let x0 = chunk[0];
            for section in &mut self.sections {
                section.z1 = section.z1_unit * x0;
                section.z2 = section.z2_unit * x0;
            }
            self.primed = true;
        }

        let mut output = Vec::with_capacity(chunk.len());
        for &sample in chunk {
            let mut value = sample;
            for section in &mut self.sections {
                value = section.step(value);
            }
            output.push(value);
        }
        output
    }

    /// Discard streaming state; the next chunk re-seeds it
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.z1 = 0.0;
            section.z2 = 0.0;
        }
        self.primed = false;
    }

    /// Magnitude response of the cascade at a frequency in Hz
    pub fn magnitude_at(&self, freq_hz: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / self.sampling_rate;
        let z_inv = Complex64::new(omega.cos(), -omega.sin());
        let mut response = Complex64::new(1.0, 0.0);
        for s in &self.sections {
            let numerator = Complex64::new(s.b0, 0.0) + z_inv * (s.b1 + z_inv * s.b2);
            let denominator = Complex64::new(1.0, 0.0) + z_inv * (s.a1 + z_inv * s.a2);
            response *= numerator / denominator;
        }
        response.norm()
    }
}

/// Pre-warped analog frequency for the bilinear transform (internal fs = 2)
fn warp(freq_hz: f64, sampling_rate: f64) -> f64 {
    4.0 * (PI * freq_hz / sampling_rate).tan()
}

fn design_sections(
    kind: &FilterKind,
    order: usize,
    sampling_rate: f64,
) -> EngineResult<Vec<Biquad>> {
    if order == 0 {
        return Err(EngineError::InvalidDesign {
            reason: "Filter order must be at least 1".to_string(),
        });
    }
    if sampling_rate <= 0.0 {
        return Err(EngineError::InvalidDesign {
            reason: "Sampling rate must be positive".to_string(),
        });
    }
    let nyquist = sampling_rate / 2.0;

    // Normalised Butterworth prototype: poles evenly spaced on the left
    // half of the unit circle
    let prototype: Vec<Complex64> = (0..order)
        .map(|k| {
            let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
            Complex64::new(-theta.sin(), theta.cos())
        })
        .collect();

    let (analog_poles, analog_zeros, analog_gain) = match *kind {
        FilterKind::Lowpass { cutoff_hz } => {
            if cutoff_hz <= 0.0 {
                return Err(EngineError::InvalidDesign {
                    reason: format!("Lowpass cutoff must be positive, got {} Hz", cutoff_hz),
                });
            }
            if cutoff_hz >= nyquist {
                return Err(EngineError::InvalidDesign {
                    reason: format!(
                        "Lowpass cutoff {} Hz must be below the Nyquist frequency {} Hz",
                        cutoff_hz, nyquist
                    ),
                });
            }

            let wo = warp(cutoff_hz, sampling_rate);
            let poles: Vec<Complex64> = prototype.iter().map(|&p| p * wo).collect();
            (poles, Vec::new(), wo.powi(order as i32))
        }
        FilterKind::Bandpass { low_hz, high_hz } => {
            if low_hz <= 0.0 {
                return Err(EngineError::InvalidDesign {
                    reason: format!("Bandpass low edge must be positive, got {} Hz", low_hz),
                });
            }
            if low_hz >= high_hz {
                return Err(EngineError::InvalidDesign {
                    reason: format!(
                        "Bandpass low edge {} Hz must be below the high edge {} Hz",
                        low_hz, high_hz
                    ),
                });
            }
            if high_hz >= nyquist {
                return Err(EngineError::InvalidDesign {
                    reason: format!(
                        "Bandpass high edge {} Hz must be below the Nyquist frequency {} Hz",
                        high_hz, nyquist
                    ),
                });
            }

            let w1 = warp(low_hz, sampling_rate);
            let w2 = warp(high_hz, sampling_rate);
            let bandwidth = w2 - w1;
            let wo_sq = w1 * w2;

            // Lowpass-to-bandpass transform: every prototype pole splits
            // into a pair around the center frequency
            let mut poles = Vec::with_capacity(2 * order);
            for &p in &prototype {
                let p_lp = p * (bandwidth / 2.0);
                let disc = (p_lp * p_lp - Complex64::new(wo_sq, 0.0)).sqrt();
                poles.push(p_lp + disc);
                poles.push(p_lp - disc);
            }
            let zeros = vec![Complex64::new(0.0, 0.0); order];
            (poles, zeros, bandwidth.powi(order as i32))
        }
    };

    // Bilinear transform with internal fs = 2: z = (4 + s) / (4 - s)
    let fs2 = Complex64::new(4.0, 0.0);
    let digital_poles: Vec<Complex64> = analog_poles
        .iter()
        .map(|&p| (fs2 + p) / (fs2 - p))
        .collect();
    let mut digital_zeros: Vec<Complex64> = analog_zeros
        .iter()
        .map(|&z| (fs2 + z) / (fs2 - z))
        .collect();

    let numerator = analog_zeros
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &z| acc * (fs2 - z));
    let denominator = analog_poles
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let gain = analog_gain * (numerator / denominator).re;

    // The transform leaves a degree deficit; the missing zeros sit at Nyquist
    while digital_zeros.len() < digital_poles.len() {
        digital_zeros.push(Complex64::new(-1.0, 0.0));
    }

    Ok(pair_into_sections(&digital_poles, &digital_zeros, gain))
}

/// Group digital poles into biquad denominators, hand out the (+1 / -1)
/// zeros as numerators, and fold the overall gain into the first section.
fn pair_into_sections(poles: &[Complex64], zeros: &[Complex64], gain: f64) -> Vec<Biquad> {
    let mut upper: Vec<Complex64> = poles
        .iter()
        .filter(|p| p.im > PAIRING_TOLERANCE)
        .cloned()
        .collect();
    upper.sort_by(|a, b| a.re.partial_cmp(&b.re).unwrap_or(std::cmp::Ordering::Equal));

    let mut real: Vec<f64> = poles
        .iter()
        .filter(|p| p.im.abs() <= PAIRING_TOLERANCE)
        .map(|p| p.re)
        .collect();
    real.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    // Denominators first: conjugate pairs, then real poles two at a time,
    // then a possible leftover first-order tail
    let mut denominators: Vec<(f64, f64, usize)> = Vec::new();
    for p in &upper {
        denominators.push((-2.0 * p.re, p.norm_sqr(), 2));
    }
    while real.len() >= 2 {
        let q = real.pop().unwrap_or(0.0);
        let p = real.pop().unwrap_or(0.0);
        denominators.push((-(p + q), p * q, 2));
    }
    if let Some(p) = real.pop() {
        denominators.push((-p, 0.0, 1));
    }

    let mut at_dc = zeros.iter().filter(|z| z.re > 0.0).count();
    let mut at_nyquist = zeros.len() - at_dc;

    let mut sections = Vec::with_capacity(denominators.len());
    for (a1, a2, pole_count) in denominators {
        let (b0, b1, b2) = if pole_count == 2 && at_dc >= 1 && at_nyquist >= 1 {
            at_dc -= 1;
            at_nyquist -= 1;
            // (z - 1)(z + 1)
            (1.0, 0.0, -1.0)
        } else if pole_count == 2 && at_nyquist >= 2 {
            at_nyquist -= 2;
            // (z + 1)^2
            (1.0, 2.0, 1.0)
        } else if at_nyquist >= 1 {
            at_nyquist -= 1;
            // (z + 1)
            (1.0, 1.0, 0.0)
        } else {
            (1.0, 0.0, 0.0)
        };

        sections.push(Biquad {
            b0,
            b1,
            b2,
            a1,
            a2,
            z1: 0.0,
            z2: 0.0,
            z1_unit: 0.0,
            z2_unit: 0.0,
        });
    }

    if let Some(first) = sections.first_mut() {
        first.b0 *= gain;
        first.b1 *= gain;
        first.b2 *= gain;
    }

    seed_steady_state(&mut sections);
    sections
}

/// Pre-compute per-section state such that a unit constant input yields a
/// constant output from the first sample (the `sosfilt_zi` construction)
fn seed_steady_state(sections: &mut [Biquad]) {
    let mut level = 1.0;
    for section in sections.iter_mut() {
        let denominator = 1.0 + section.a1 + section.a2;
        let dc_gain = if denominator.abs() > 1e-12 {
            (section.b0 + section.b1 + section.b2) / denominator
        } else {
            0.0
        };
        let output = level * dc_gain;
        section.z1_unit = output - section.b0 * level;
        section.z2_unit = section.b2 * level - section.a2 * output;
        level = output;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sampling_rate: f64, samples: usize) -> Vec<f64> {
        (0..samples)
            .map(|i| (2.0 * PI * freq * i as f64 / sampling_rate).sin())
            .collect()
    }

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64).sqrt()
    }

    #[test]
    fn test_streaming_equivalence() {
        // Core correctness property: chunked filtering == whole-signal
        // filtering, for arbitrary split points
        let signal = sine(10.0, 256.0, 1024);

        for split in [1usize, 17, 256, 1000] {
            let mut whole = ButterworthFilter::bandpass(8.0, 13.0, 3, 256.0).unwrap();
            let expected = whole.process(&signal);

            let mut chunked = ButterworthFilter::bandpass(8.0, 13.0, 3, 256.0).unwrap();
            let mut actual = chunked.process(&signal[..split]);
            actual.extend(chunked.process(&signal[split..]));

            for (a, b) in expected.iter().zip(actual.iter()) {
                assert!((a - b).abs() < 1e-9, "split {}: {} vs {}", split, a, b);
            }
        }
    }

    #[test]
    fn test_streaming_equivalence_lowpass() {
        let signal = sine(3.0, 256.0, 512);

        let mut whole = ButterworthFilter::lowpass(0.5, 1, 256.0).unwrap();
        let expected = whole.process(&signal);

        let mut chunked = ButterworthFilter::lowpass(0.5, 1, 256.0).unwrap();
        let mut actual = Vec::new();
        for chunk in signal.chunks(25) {
            actual.extend(chunked.process(chunk));
        }

        for (a, b) in expected.iter().zip(actual.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_input_constant_output() {
        // No startup ramp: a constant stream comes out constant immediately
        let mut filter = ButterworthFilter::lowpass(1.0, 2, 256.0).unwrap();
        let output = filter.process(&vec![5.0; 512]);

        for value in output {
            assert!((value - 5.0).abs() < 1e-8, "got {}", value);
        }
    }

    #[test]
    fn test_lowpass_dc_gain_is_unity() {
        for order in [1usize, 2, 3, 4] {
            let filter = ButterworthFilter::lowpass(10.0, order, 256.0).unwrap();
            assert!(
                (filter.magnitude_at(0.0) - 1.0).abs() < 1e-9,
                "order {} DC gain {}",
                order,
                filter.magnitude_at(0.0)
            );
        }
    }

    #[test]
    fn test_lowpass_half_power_at_cutoff() {
        // Pre-warping pins the -3 dB point exactly at the design cutoff
        let filter = ButterworthFilter::lowpass(30.0, 3, 256.0).unwrap();
        let magnitude = filter.magnitude_at(30.0);
        assert!(
            (magnitude - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9,
            "got {}",
            magnitude
        );
    }

    #[test]
    fn test_bandpass_selectivity() {
        let sampling_rate = 256.0;
        let samples = 256 * 4;
        let mut filter = ButterworthFilter::bandpass(8.0, 13.0, 3, sampling_rate).unwrap();

        // In-band tone passes near unity
        let in_band = filter.process(&sine(10.0, sampling_rate, samples));
        let in_band_rms = rms(&in_band[samples / 2..]);
        assert!(
            (in_band_rms - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.1,
            "in-band rms {}",
            in_band_rms
        );

        // Far out-of-band tone is strongly attenuated
        filter.reset();
        let out_of_band = filter.process(&sine(45.0, sampling_rate, samples));
        let out_rms = rms(&out_of_band[samples / 2..]);
        assert!(out_rms < 0.05, "out-of-band rms {}", out_rms);
    }

    #[test]
    fn test_bandpass_blocks_dc() {
        let mut filter = ButterworthFilter::bandpass(8.0, 13.0, 3, 256.0).unwrap();
        let output = filter.process(&vec![10.0; 1024]);
        // After settling, a DC offset must be rejected entirely
        let tail_rms = rms(&output[512..]);
        assert!(tail_rms < 1e-6, "tail rms {}", tail_rms);
    }

    #[test]
    fn test_wide_delta_band_designs_cleanly() {
        // The 0.5-4 Hz band is wide relative to its center; the transform
        // produces real pole pairs that still must form stable sections
        let filter = ButterworthFilter::bandpass(0.5, 4.0, 3, 256.0).unwrap();
        assert_eq!(filter.sections.len(), 3);
        for section in &filter.sections {
            // Stability: |a2| < 1 and |a1| < 1 + a2
            assert!(section.a2.abs() < 1.0);
            assert!(section.a1.abs() < 1.0 + section.a2);
        }
    }

    #[test]
    fn test_invalid_designs_rejected() {
        assert!(matches!(
            ButterworthFilter::lowpass(128.0, 2, 256.0),
            Err(EngineError::InvalidDesign { .. })
        ));
        assert!(matches!(
            ButterworthFilter::lowpass(200.0, 2, 256.0),
            Err(EngineError::InvalidDesign { .. })
        ));
        assert!(matches!(
            ButterworthFilter::bandpass(13.0, 8.0, 3, 256.0),
            Err(EngineError::InvalidDesign { .. })
        ));
        assert!(matches!(
            ButterworthFilter::bandpass(8.0, 130.0, 3, 256.0),
            Err(EngineError::InvalidDesign { .. })
        ));
        assert!(matches!(
            ButterworthFilter::bandpass(0.0, 4.0, 3, 256.0),
            Err(EngineError::InvalidDesign { .. })
        ));
        assert!(matches!(
            ButterworthFilter::lowpass(10.0, 0, 256.0),
            Err(EngineError::InvalidDesign { .. })
        ));
    }

    #[test]
    fn test_reset_restores_initial_behavior() {
        let signal = sine(10.0, 256.0, 512);

        let mut filter = ButterworthFilter::bandpass(8.0, 13.0, 3, 256.0).unwrap();
        let first = filter.process(&signal);
        filter.reset();
        let second = filter.process(&signal);

        for (a, b) in first.iter().zip(second.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut filter = ButterworthFilter::lowpass(1.0, 1, 256.0).unwrap();
        assert!(filter.process(&[]).is_empty());

        // State untouched: constant stream afterwards is still transient-free
        let output = filter.process(&vec![2.0; 64]);
        for value in output {
            assert!((value - 2.0).abs() < 1e-8);
        }
    }
}
