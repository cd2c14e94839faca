//! Raw level-drop volume.
//!
//! Sums the magnitude of every single-tick change below `-drop_threshold`.
//! No run grouping, no calibration. More sensitive than the statistical
//! detector and noisier for it.

use cw_schemas::LevelReading;

/// Total raw drop across `readings` (sorted by timestamp internally).
pub fn raw_level_drop(readings: &[LevelReading], drop_threshold: f64) -> f64 {
    let mut sorted: Vec<&LevelReading> = readings.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    sorted
        .windows(2)
        .map(|w| w[1].level - w[0].level)
        .filter(|change| *change < -drop_threshold)
        .map(f64::abs)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn seq(levels: &[f64]) -> Vec<LevelReading> {
        levels
            .iter()
            .enumerate()
            .map(|(i, l)| {
                LevelReading::new("cauldron_001", Utc.timestamp_opt(60 * i as i64, 0).unwrap(), *l)
            })
            .collect()
    }

    #[test]
    fn sums_only_drops_beyond_threshold() {
        // changes: +5, -0.5, -1.0, -3, -20, +40
        let rs = seq(&[10.0, 15.0, 14.5, 13.5, 10.5, -9.5, 30.5]);
        assert!((raw_level_drop(&rs, 1.0) - 23.0).abs() < 1e-9);
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let mut rs = seq(&[50.0, 40.0, 45.0]);
        rs.reverse();
        assert!((raw_level_drop(&rs, 1.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn short_sequences_have_no_drop() {
        assert_eq!(raw_level_drop(&[], 1.0), 0.0);
        assert_eq!(raw_level_drop(&seq(&[3.0]), 1.0), 0.0);
    }
}
