//! Loading recorded sessions back from CSV

use brainwave_core::{EngineError, EngineResult};
use std::path::Path;

/// Standard sensor layout: left temporal, left/right frontal, right
/// temporal
pub const SENSOR_COLUMNS: [&str; 4] = ["TP9", "AF7", "AF8", "TP10"];

/// A fully loaded recording, one sample vector per sensor channel
#[derive(Debug, Clone)]
pub struct Recording {
    /// `channels[channel][sample]`, in `SENSOR_COLUMNS` order
    pub channels: Vec<Vec<f64>>,
}

impl Recording {
    pub fn frame_count(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Recording length in seconds at the given sampling rate
    pub fn duration(&self, sampling_rate: f64) -> f64 {
        self.frame_count() as f64 / sampling_rate
    }
}

/// Read the full channel matrix of a recorded file.
///
/// Files either carry the named sensor columns or, when unnamed, columns
/// 1-4 are assumed to be the four sensors in standard order after a
/// leading timestamp column. Anything else is `MalformedInput`.
pub fn load_recording(path: &Path) -> EngineResult<Recording> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| EngineError::MalformedInput {
        reason: format!("Cannot read {}: {}", path.display(), e),
    })?;

    let headers = reader
        .headers()
        .map_err(|e| EngineError::MalformedInput {
            reason: format!("Cannot read header row: {}", e),
        })?
        .clone();

    let positions: Vec<usize> = if SENSOR_COLUMNS
        .iter()
        .all(|name| headers.iter().any(|h| h == *name))
    {
        SENSOR_COLUMNS
            .iter()
            .map(|name| {
                headers
                    .iter()
                    .position(|h| h == *name)
                    .unwrap_or_default()
            })
            .collect()
    } else if headers.len() >= SENSOR_COLUMNS.len() + 1 {
        // Timestamp first, sensors next
        (1..=SENSOR_COLUMNS.len()).collect()
    } else {
        return Err(EngineError::MalformedInput {
            reason: format!(
                "{} has {} columns; expected named {:?} columns or a timestamp plus {} sensor columns",
                path.display(),
                headers.len(),
                SENSOR_COLUMNS,
                SENSOR_COLUMNS.len()
            ),
        });
    };

    let mut channels = vec![Vec::new(); SENSOR_COLUMNS.len()];
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| EngineError::MalformedInput {
            reason: format!("Row {}: {}", row_idx + 2, e),
        })?;

        for (channel_idx, &position) in positions.iter().enumerate() {
            let cell = record.get(position).ok_or_else(|| EngineError::MalformedInput {
                reason: format!("Row {} is missing column {}", row_idx + 2, position),
            })?;
            let value: f64 = cell.trim().parse().map_err(|_| EngineError::MalformedInput {
                reason: format!("Row {}: '{}' is not a number", row_idx + 2, cell),
            })?;
            channels[channel_idx].push(value);
        }
    }

    Ok(Recording { channels })
}
