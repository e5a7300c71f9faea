//! Brainwave-Stream: signal sources, recording and playback
//!
//! Collaborators around the core engine: a synthetic EEG source for
//! development and tests, a tokio-driven real-time stream, a CSV recorder
//! and the loader/playback pair for recorded sessions.

pub mod playback;
pub mod real_time_stream;
pub mod recorder;
pub mod recording;
pub mod simulator;
pub mod source;

pub use playback::FileSource;
pub use real_time_stream::*;
pub use recorder::{Recorder, RecorderConfig};
pub use recording::{load_recording, Recording, SENSOR_COLUMNS};
pub use simulator::{EegSimulator, SimulatorConfig, ToneConfig};
pub use source::ChunkSource;
