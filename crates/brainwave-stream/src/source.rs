//! Signal source contract

use brainwave_core::{EngineResult, SampleChunk};
use std::time::Duration;

/// A source of sample chunks: a live headset, a simulator or a recorded
/// file being replayed.
///
/// `pull_chunk` may legitimately return an empty chunk on a quiet tick.
/// The sampling rate and channel count are fixed for the session and read
/// once at pipeline construction.
pub trait ChunkSource: Send {
    /// Pull whatever samples arrived within `timeout`
    fn pull_chunk(&mut self, timeout: Duration) -> EngineResult<SampleChunk>;

    /// Sampling rate in Hz, fixed for the session
    fn sampling_rate(&self) -> f64;

    /// Channels per frame, fixed for the session
    fn channel_count(&self) -> usize;
}
