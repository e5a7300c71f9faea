//! Canonical EEG frequency bands

use serde::{Deserialize, Serialize};

/// A named frequency interval of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandDef {
    pub name: String,
    pub low_hz: f64,
    pub high_hz: f64,
}

impl BandDef {
    pub fn new(name: &str, low_hz: f64, high_hz: f64) -> Self {
        Self {
            name: name.to_string(),
            low_hz,
            high_hz,
        }
    }

    /// The five canonical EEG bands
    pub fn eeg_bands() -> Vec<BandDef> {
        vec![
            BandDef::new("Delta", 0.5, 4.0),
            BandDef::new("Theta", 4.0, 8.0),
            BandDef::new("Alpha", 8.0, 13.0),
            BandDef::new("Beta", 13.0, 30.0),
            BandDef::new("Gamma", 30.0, 45.0),
        ]
    }

    /// Center frequency of the band in Hz
    pub fn center_hz(&self) -> f64 {
        (self.low_hz + self.high_hz) / 2.0
    }

    /// Band width in Hz
    pub fn bandwidth_hz(&self) -> f64 {
        self.high_hz - self.low_hz
    }

    /// True if the frequency falls inside the band, edges inclusive
    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }
}
