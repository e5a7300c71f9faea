//! Replaying recorded sessions through the source interface

use crate::recording::Recording;
use crate::source::ChunkSource;
use brainwave_core::{EngineError, EngineResult, SampleChunk};
use std::time::Duration;

/// Replays a loaded recording chunk by chunk, so the live pipelines can be
/// exercised against recorded data without a headset.
///
/// Returns empty chunks once the recording is exhausted, matching a live
/// source that has gone quiet.
pub struct FileSource {
    recording: Recording,
    sampling_rate: f64,
    chunk_frames: usize,
    position: usize,
}

impl FileSource {
    pub fn new(
        recording: Recording,
        sampling_rate: f64,
        chunk_frames: usize,
    ) -> EngineResult<Self> {
        if chunk_frames == 0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Playback chunk size must be at least one frame".to_string(),
            });
        }
        if sampling_rate <= 0.0 {
            return Err(EngineError::InvalidConfiguration {
                reason: "Playback sampling rate must be positive".to_string(),
            });
        }

        Ok(Self {
            recording,
            sampling_rate,
            chunk_frames,
            position: 0,
        })
    }

    /// Frames not yet replayed
    pub fn remaining(&self) -> usize {
        self.recording.frame_count().saturating_sub(self.position)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Restart playback from the beginning
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl ChunkSource for FileSource {
    fn pull_chunk(&mut self, _timeout: Duration) -> EngineResult<SampleChunk> {
        let channel_count = self.recording.channels.len();
        let total = self.recording.frame_count();
        if self.position >= total {
            return Ok(SampleChunk::empty(channel_count, self.sampling_rate));
        }

        let end = (self.position + self.chunk_frames).min(total);
        let mut data = Vec::with_capacity((end - self.position) * channel_count);
        for frame_idx in self.position..end {
            for channel in &self.recording.channels {
                data.push(channel[frame_idx]);
            }
        }
        self.position = end;

        SampleChunk::new(data, channel_count, self.sampling_rate)
    }

    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn channel_count(&self) -> usize {
        self.recording.channels.len()
    }
}
