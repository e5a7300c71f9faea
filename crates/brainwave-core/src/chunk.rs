//! SampleChunk: container for one batch of multi-channel samples

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One batch of raw samples as delivered by a signal source.
///
/// Data is stored frame-major: `data[frame * channel_count + channel]`.
/// Chunks are immutable once handed to a consumer; pipelines never mutate
/// them, only read.
#[derive(Debug, Clone)]
pub struct SampleChunk {
    /// Unique identifier for this chunk
    pub id: Uuid,
    /// Interleaved sample data (frame-major)
    pub data: Vec<f64>,
    /// Number of channels per frame
    pub channel_count: usize,
    /// Sampling rate the source produced this chunk at, in Hz
    pub sampling_rate: f64,
    /// Creation timestamp (ms since epoch)
    pub created_at: u64,
}

impl SampleChunk {
    /// Create a chunk from interleaved data.
    ///
    /// Fails when the data length is not a multiple of the channel count.
    pub fn new(data: Vec<f64>, channel_count: usize, sampling_rate: f64) -> EngineResult<Self> {
        if channel_count == 0 {
            return Err(EngineError::MalformedInput {
                reason: "Chunk must have at least one channel".to_string(),
            });
        }
        if data.len() % channel_count != 0 {
            return Err(EngineError::MalformedInput {
                reason: format!(
                    "Data length {} is not a multiple of channel count {}",
                    data.len(),
                    channel_count
                ),
            });
        }

        Ok(SampleChunk {
            id: Uuid::new_v4(),
            data,
            channel_count,
            sampling_rate,
            created_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        })
    }

    /// Create a chunk from a sequence of frames (one Vec per frame)
    pub fn from_frames(
        frames: &[Vec<f64>],
        channel_count: usize,
        sampling_rate: f64,
    ) -> EngineResult<Self> {
        let mut data = Vec::with_capacity(frames.len() * channel_count);
        for frame in frames {
            if frame.len() < channel_count {
                return Err(EngineError::ChannelCountMismatch {
                    expected: channel_count,
                    actual: frame.len(),
                });
            }
            // Extra channels (e.g. an AUX electrode) are dropped
            data.extend_from_slice(&frame[..channel_count]);
        }
        SampleChunk::new(data, channel_count, sampling_rate)
    }

    /// An empty chunk, legitimately returned by a source on a quiet tick
    pub fn empty(channel_count: usize, sampling_rate: f64) -> Self {
        SampleChunk {
            id: Uuid::new_v4(),
            data: Vec::new(),
            channel_count,
            sampling_rate,
            created_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.data.len() / self.channel_count
    }

    /// Extract the samples of one channel
    pub fn channel_data(&self, channel_index: usize) -> EngineResult<Vec<f64>> {
        if channel_index >= self.channel_count {
            return Err(EngineError::ChannelCountMismatch {
                expected: self.channel_count,
                actual: channel_index + 1,
            });
        }

        let frames = self.frame_count();
        let mut channel = Vec::with_capacity(frames);
        for frame_idx in 0..frames {
            channel.push(self.data[frame_idx * self.channel_count + channel_index]);
        }
        Ok(channel)
    }

    /// All channels as separate vectors
    pub fn all_channels(&self) -> Vec<Vec<f64>> {
        (0..self.channel_count)
            .map(|ch| {
                self.channel_data(ch)
                    .expect("channel index within channel_count")
            })
            .collect()
    }

    /// Average the channels into one "global" scalar signal per frame
    pub fn mean_across_channels(&self) -> Vec<f64> {
        let frames = self.frame_count();
        let mut global = Vec::with_capacity(frames);
        for frame_idx in 0..frames {
            let start = frame_idx * self.channel_count;
            let sum: f64 = self.data[start..start + self.channel_count].iter().sum();
            global.push(sum / self.channel_count as f64);
        }
        global
    }

    /// Reduce an oversized chunk to its first `max_channels` channels.
    ///
    /// Sources with extra electrodes deliver wider frames; the engine only
    /// ever sees the first four. Chunks already narrow enough are returned
    /// unchanged.
    pub fn truncate_channels(self, max_channels: usize) -> Self {
        if self.channel_count <= max_channels {
            return self;
        }

        let frames = self.frame_count();
        let mut data = Vec::with_capacity(frames * max_channels);
        for frame_idx in 0..frames {
            let start = frame_idx * self.channel_count;
            data.extend_from_slice(&self.data[start..start + max_channels]);
        }

        SampleChunk {
            id: self.id,
            data,
            channel_count: max_channels,
            sampling_rate: self.sampling_rate,
            created_at: self.created_at,
        }
    }

    /// Chunk duration in seconds
    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / self.sampling_rate
    }
}

/// Basic statistics for one channel of samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub rms: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl ChannelStats {
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                rms: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let rms = (data.iter().map(|x| x * x).sum::<f64>() / n).sqrt();
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean,
            rms,
            std_dev: variance.sqrt(),
            min,
            max,
        }
    }
}
