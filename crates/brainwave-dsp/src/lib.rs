//! Brainwave-DSP: the streaming band-power engine
//!
//! Stateful continuous filtering, envelope following, Welch band-power
//! estimation, sliding-window trend extraction and recording comparison.
//! Everything here is synchronous and allocation-light; scheduling is the
//! caller's concern.

pub mod envelope;
pub mod filter;
pub mod spectral;
pub mod stats;
pub mod trend;

pub use envelope::BandEnvelopePipeline;
pub use filter::{ButterworthFilter, FilterKind};
pub use spectral::{SpectralEstimator, PSD_LOG_EPSILON};
pub use stats::{ComparisonResult, StatisticalAnalyzer, SIGNIFICANCE_LEVEL};
pub use trend::{moving_average, BandPowerSeries, TrendBuilder};
