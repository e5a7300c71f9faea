//! Analysis service bridging signal sources and the engine
//!
//! Owns one set of engine pipelines per session and exposes the three
//! operations the binary wires up: live chunk ingestion, whole-file trend
//! analysis and two-recording comparison. Pipelines are rebuilt whenever
//! the source changes; nothing here survives a stream switch.

use brainwave_core::{EngineConfig, EngineError, EngineResult, RingBuffer, SampleChunk};
use brainwave_dsp::{
    BandEnvelopePipeline, BandPowerSeries, ComparisonResult, SpectralEstimator,
    StatisticalAnalyzer, TrendBuilder,
};
use brainwave_stream::{ChunkSource, Recording};
use std::time::Duration;
use tracing::{debug, info};

/// Seconds of raw history kept for the windowed-PSD readout
const RAW_HISTORY_SECONDS: f64 = 2.0;

/// Live session state: envelope pipeline plus a short raw history for
/// spectral snapshots
pub struct LiveMonitor {
    config: EngineConfig,
    pipeline: BandEnvelopePipeline,
    estimator: SpectralEstimator,
    raw_history: Vec<RingBuffer>,
}

impl LiveMonitor {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let pipeline = BandEnvelopePipeline::new(&config)?;
        let estimator = SpectralEstimator::new(&config);
        let raw_capacity = ((config.sampling_rate * RAW_HISTORY_SECONDS) as usize).max(1);
        let raw_history = (0..config.channel_count)
            .map(|_| RingBuffer::with_capacity(raw_capacity))
            .collect();

        Ok(Self {
            config,
            pipeline,
            estimator,
            raw_history,
        })
    }

    pub fn band_names(&self) -> Vec<String> {
        self.pipeline
            .band_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Feed one tick's worth of data through the envelope pipeline.
    ///
    /// Oversized chunks are truncated to the configured channel count; a
    /// chunk with fewer channels is rejected so the caller can skip it.
    /// Empty chunks are a no-op.
    pub fn ingest(&mut self, chunk: SampleChunk) -> EngineResult<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        if chunk.channel_count < self.config.channel_count {
            return Err(EngineError::ChannelCountMismatch {
                expected: self.config.channel_count,
                actual: chunk.channel_count,
            });
        }

        let chunk = chunk.truncate_channels(self.config.channel_count);
        for (channel_idx, ring) in self.raw_history.iter_mut().enumerate() {
            let samples = chunk.channel_data(channel_idx)?;
            ring.push(&samples);
        }

        let global = chunk.mean_across_channels();
        self.pipeline.process_and_store(&global);
        Ok(())
    }

    /// Latest envelope value per band
    pub fn envelope_values(&self) -> Vec<f64> {
        self.pipeline.current_values()
    }

    /// Windowed-PSD band powers over the most recent one-second window
    pub fn spectral_snapshot(&mut self) -> Vec<f64> {
        let window: Vec<Vec<f64>> = self
            .raw_history
            .iter()
            .map(|ring| ring.latest(self.config.window_size()))
            .collect();
        self.estimator.band_powers(&window)
    }

    /// Tear down session state, as when the source changes
    pub fn reset(&mut self) {
        self.pipeline.reset();
        for ring in &mut self.raw_history {
            ring.clear();
        }
    }
}

/// Replay a recorded session through a `ChunkSource`, returning the final
/// per-band envelope values
pub fn replay_through_envelope(
    config: &EngineConfig,
    source: &mut dyn ChunkSource,
) -> EngineResult<Vec<f64>> {
    let mut monitor = LiveMonitor::new(config.clone())?;
    let tick = Duration::from_secs_f64(1.0 / config.update_rate);

    loop {
        let chunk = source.pull_chunk(tick)?;
        if chunk.is_empty() {
            break;
        }
        monitor.ingest(chunk)?;
    }
    Ok(monitor.envelope_values())
}

/// Whole-file trend analysis: band power series plus its trend curves
pub struct RecordingAnalysis {
    pub series: BandPowerSeries,
    pub trend: Vec<Vec<f64>>,
}

/// Run the sliding-window estimator over a loaded recording
pub fn analyze_recording(
    config: &EngineConfig,
    recording: &Recording,
) -> EngineResult<RecordingAnalysis> {
    if recording.is_empty() {
        return Err(EngineError::InsufficientData {
            required: config.window_size(),
            actual: 0,
        });
    }

    let mut builder = TrendBuilder::new(config);
    let series = builder.analyze(&recording.channels);
    debug!(
        steps = series.len(),
        bands = series.band_names.len(),
        "Trend extraction finished"
    );
    let trend = series.trend(config.trend_window);
    Ok(RecordingAnalysis { series, trend })
}

/// Compare two recordings band by band.
///
/// Each band yields either a comparison result or the error that made the
/// band unanalyzable (typically `InsufficientData` on short recordings).
pub fn compare_recordings(
    config: &EngineConfig,
    recording_a: &Recording,
    recording_b: &Recording,
) -> EngineResult<Vec<(String, EngineResult<ComparisonResult>)>> {
    // Fresh builders per file: filter and buffer state never crosses
    // recordings
    let series_a = analyze_recording(config, recording_a)?.series;
    let series_b = analyze_recording(config, recording_b)?.series;

    let analyzer = StatisticalAnalyzer::new(config.outlier_sigma);
    let mut results = Vec::with_capacity(series_a.band_names.len());
    for (band_idx, band_name) in series_a.band_names.iter().enumerate() {
        let outcome = analyzer.compare_bands(
            band_name,
            series_a.band_series(band_idx).unwrap_or(&[]),
            series_b.band_series(band_idx).unwrap_or(&[]),
        );
        results.push((band_name.clone(), outcome));
    }

    info!(bands = results.len(), "Comparison finished");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brainwave_stream::FileSource;
    use std::f64::consts::PI;

    fn tone_recording(freq: f64, amplitude: f64, seconds: usize) -> Recording {
        let samples = seconds * 256;
        Recording {
            channels: (0..4)
                .map(|_| {
                    (0..samples)
                        .map(|i| amplitude * (2.0 * PI * freq * i as f64 / 256.0).sin())
                        .collect()
                })
                .collect(),
        }
    }

    #[test]
    fn test_live_monitor_ingest_and_snapshot() {
        let mut monitor = LiveMonitor::new(EngineConfig::default()).unwrap();

        let samples: Vec<f64> = (0..1024)
            .flat_map(|i| {
                let v = 40.0 * (2.0 * PI * 10.0 * i as f64 / 256.0).sin();
                vec![v; 4]
            })
            .collect();
        let chunk = SampleChunk::new(samples, 4, 256.0).unwrap();
        monitor.ingest(chunk).unwrap();

        let spectral = monitor.spectral_snapshot();
        assert_eq!(spectral.len(), 5);
        // Alpha leads for a 10 Hz tone
        assert!(spectral[2] > spectral[0]);
        assert!(spectral[2] > spectral[4]);

        let envelopes = monitor.envelope_values();
        assert_eq!(envelopes.len(), 5);
    }

    #[test]
    fn test_ingest_narrow_chunk_rejected() {
        let mut monitor = LiveMonitor::new(EngineConfig::default()).unwrap();
        let chunk = SampleChunk::new(vec![0.0; 6], 2, 256.0).unwrap();
        assert!(matches!(
            monitor.ingest(chunk),
            Err(EngineError::ChannelCountMismatch { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_ingest_wide_chunk_truncated() {
        let mut monitor = LiveMonitor::new(EngineConfig::default()).unwrap();
        let chunk = SampleChunk::new(vec![1.0; 12], 6, 256.0).unwrap();
        assert!(monitor.ingest(chunk).is_ok());
    }

    #[test]
    fn test_replay_drives_envelopes() {
        let config = EngineConfig::default();
        let recording = tone_recording(10.0, 50.0, 5);
        let mut source = FileSource::new(recording, config.sampling_rate, 64).unwrap();

        let values = replay_through_envelope(&config, &mut source).unwrap();
        assert_eq!(values.len(), 5);
        // Alpha envelope ends highest
        let alpha = values[2];
        for (idx, &value) in values.iter().enumerate() {
            if idx != 2 {
                assert!(alpha > value, "alpha {} vs band {} at {}", alpha, idx, value);
            }
        }
    }

    #[test]
    fn test_analyze_recording() {
        let config = EngineConfig::default();
        let analysis = analyze_recording(&config, &tone_recording(10.0, 50.0, 5)).unwrap();

        assert_eq!(analysis.series.len(), analysis.trend[0].len());
        assert!(analysis.series.len() > 0);
        assert!(analysis.trend.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_analyze_empty_recording_rejected() {
        let config = EngineConfig::default();
        let empty = Recording {
            channels: vec![Vec::new(); 4],
        };
        assert!(matches!(
            analyze_recording(&config, &empty),
            Err(EngineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_compare_recordings_detects_alpha_shift() {
        let config = EngineConfig::default();
        let weak = tone_recording(10.0, 10.0, 6);
        let strong = tone_recording(10.0, 60.0, 6);

        let results = compare_recordings(&config, &weak, &strong).unwrap();
        assert_eq!(results.len(), 5);

        let (name, alpha) = &results[2];
        assert_eq!(name, "Alpha");
        let alpha = alpha.as_ref().unwrap();
        assert!(alpha.significant);
        assert!(alpha.mean_b > alpha.mean_a);
        assert!(alpha.conclusion.contains("HIGHER"));
    }
}
