//! Continuous per-band envelope following
//!
//! The streaming counterpart to the spectral estimator: one scalar signal
//! in, one smoothed non-negative activity curve per band out, updated
//! chunk by chunk with no window boundaries.

use crate::filter::ButterworthFilter;
use brainwave_core::{BandDef, EngineConfig, EngineResult, RingBuffer};

/// One band's processing chain: isolate, then smooth
struct BandChain {
    bandpass: ButterworthFilter,
    smoother: ButterworthFilter,
}

/// Converts one scalar signal stream into N smoothed activity curves.
///
/// Per band and per chunk: bandpass-isolate, full-wave rectify, compress
/// with `ln(1 + x)` and smooth with a very low lowpass acting as an
/// envelope follower. Results land in fixed-length display buffers whose
/// oldest values are evicted as new ones arrive.
///
/// All state (filter memories, buffers) is owned by this instance and
/// lives for the duration of one stream; tear down and rebuild the
/// pipeline when switching sources.
pub struct BandEnvelopePipeline {
    bands: Vec<BandDef>,
    chains: Vec<BandChain>,
    displays: Vec<RingBuffer>,
}

impl BandEnvelopePipeline {
    /// Build the per-band chains from the configuration.
    ///
    /// Fails with `InvalidDesign` when a band edge or the smoothing cutoff
    /// cannot produce a stable filter at the configured sampling rate.
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let mut chains = Vec::with_capacity(config.bands.len());
        let mut displays = Vec::with_capacity(config.bands.len());
        for band in &config.bands {
            let bandpass = ButterworthFilter::bandpass(
                band.low_hz,
                band.high_hz,
                config.bandpass_order,
                config.sampling_rate,
            )?;
            let smoother = ButterworthFilter::lowpass(
                config.smoothing_cutoff_hz,
                config.smoothing_order,
                config.sampling_rate,
            )?;
            chains.push(BandChain { bandpass, smoother });
            displays.push(RingBuffer::with_capacity(config.display_capacity().max(1)));
        }

        Ok(Self {
            bands: config.bands.clone(),
            chains,
            displays,
        })
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Display buffer capacity in samples
    pub fn display_capacity(&self) -> usize {
        self.displays.first().map(|d| d.capacity()).unwrap_or(0)
    }

    /// Process one chunk of the scalar signal and append the new envelope
    /// values to the display buffers.
    ///
    /// Returns one fully-formed snapshot per band (oldest to newest),
    /// ready for plotting. An empty chunk leaves all state untouched and
    /// returns the current snapshots.
    pub fn process_and_store(&mut self, signal: &[f64]) -> Vec<Vec<f64>> {
        if !signal.is_empty() {
            for (chain, display) in self.chains.iter_mut().zip(self.displays.iter_mut()) {
                let isolated = chain.bandpass.process(signal);
                let compressed: Vec<f64> = isolated.iter().map(|x| x.abs().ln_1p()).collect();
                let envelope = chain.smoother.process(&compressed);
                display.push(&envelope);
            }
        }
        self.displays.iter().map(|d| d.snapshot()).collect()
    }

    /// Most recent envelope value per band
    pub fn current_values(&self) -> Vec<f64> {
        self.displays
            .iter()
            .map(|d| d.latest(1).first().copied().unwrap_or(0.0))
            .collect()
    }

    /// Drop all filter state and history, as when switching streams
    pub fn reset(&mut self) {
        for chain in &mut self.chains {
            chain.bandpass.reset();
            chain.smoother.reset();
        }
        for display in &mut self.displays {
            display.clear();
        }
    }
}
