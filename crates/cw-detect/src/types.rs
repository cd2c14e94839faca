//! Detector output types and tuning.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Detector tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    /// How many standard deviations below the mean filling delta a tick must
    /// fall to count as draining.
    pub std_multiplier: f64,
    /// Shortest draining run, in ticks, that becomes an event.
    pub min_duration: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            std_multiplier: 3.0,
            min_duration: 5,
        }
    }
}

/// Threshold a tick's level change is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DrainThreshold {
    /// Calibrated from the day's positive deltas: `mean - k * std`.
    Statistical { mean: f64, std: f64, threshold: f64 },
    /// Too few filling samples to estimate a distribution.
    Fixed(f64),
}

impl DrainThreshold {
    pub fn value(&self) -> f64 {
        match self {
            DrainThreshold::Statistical { threshold, .. } => *threshold,
            DrainThreshold::Fixed(t) => *t,
        }
    }

    /// Strictly-below comparison. An undefined change (NaN) never drains.
    pub fn is_draining(&self, level_change: f64) -> bool {
        level_change < self.value()
    }

    pub fn is_statistical(&self) -> bool {
        matches!(self, DrainThreshold::Statistical { .. })
    }
}

/// One contiguous run of draining ticks that met the minimum duration.
///
/// Indices are 0-based positions in the timestamp-sorted day sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainEvent {
    pub vessel_id: String,
    pub date: NaiveDate,
    pub start_index: usize,
    pub end_index: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub level_before: f64,
    pub level_after: f64,
    /// `level_before - level_after`; always > 0.
    pub volume: f64,
    pub duration_ticks: usize,
    pub avg_drop_rate: f64,
}
