//! Brainwave-Core: Foundation types for the EEG band-power engine
//!
//! Sample containers, band definitions, configuration and errors shared by
//! every crate in the workspace.

pub mod bands;
pub mod chunk;
pub mod config;
pub mod error;
pub mod ring;

pub use bands::*;
pub use chunk::*;
pub use config::*;
pub use error::{EngineError, EngineResult};
pub use ring::RingBuffer;
