//! Statistical drain event detector.
//!
//! For one vessel on one date:
//! 1. sort by timestamp; the position in that order is the tick index
//! 2. `change[i] = level[i] - level[i-1]` (NaN at 0)
//! 3. positive changes are "normal filling"; with more than
//!    [`MIN_FILLING_SAMPLES`] of them the threshold is
//!    `mean - std_multiplier * sample_std`, otherwise
//!    [`FALLBACK_DRAIN_THRESHOLD`]
//! 4. a tick drains when `change < threshold`
//! 5. maximal runs of draining ticks at least `min_duration` long become
//!    events; shorter runs are discarded

use chrono::NaiveDate;
use cw_schemas::LevelReading;
use tracing::debug;

use crate::types::{DetectorParams, DrainEvent, DrainThreshold};

/// Positive-delta count must exceed this for the statistical threshold.
pub const MIN_FILLING_SAMPLES: usize = 10;

/// Absolute per-tick drop used when filling data is too thin.
pub const FALLBACK_DRAIN_THRESHOLD: f64 = -5.0;

/// Per-tick level change; index 0 is NaN.
pub fn level_changes(levels: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(levels.len());
    for (i, level) in levels.iter().enumerate() {
        if i == 0 {
            out.push(f64::NAN);
        } else {
            out.push(level - levels[i - 1]);
        }
    }
    out
}

/// Threshold from the positive (filling) changes.
///
/// Zero spread is kept as-is: the threshold then equals the mean exactly.
pub fn compute_threshold(changes: &[f64], std_multiplier: f64) -> DrainThreshold {
    let filling: Vec<f64> = changes.iter().copied().filter(|c| *c > 0.0).collect();
    if filling.len() <= MIN_FILLING_SAMPLES {
        return DrainThreshold::Fixed(FALLBACK_DRAIN_THRESHOLD);
    }

    let n = filling.len() as f64;
    let mean = filling.iter().sum::<f64>() / n;
    let var = filling.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();

    DrainThreshold::Statistical {
        mean,
        std,
        threshold: mean - std_multiplier * std,
    }
}

pub fn flag_draining(changes: &[f64], threshold: &DrainThreshold) -> Vec<bool> {
    changes.iter().map(|c| threshold.is_draining(*c)).collect()
}

/// Maximal runs of `true`, as inclusive `(start, end)` index pairs.
pub fn draining_runs(flags: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (i, flag) in flags.iter().enumerate() {
        match (*flag, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s, i - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, flags.len() - 1));
    }
    runs
}

/// Detect drain events in one vessel's readings for one date.
///
/// `readings` need not be sorted. Events come out in index order.
pub fn detect_drain_events(
    vessel_id: &str,
    date: NaiveDate,
    readings: &[LevelReading],
    params: &DetectorParams,
) -> Vec<DrainEvent> {
    if readings.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&LevelReading> = readings.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    let levels: Vec<f64> = sorted.iter().map(|r| r.level).collect();
    let changes = level_changes(&levels);
    let threshold = compute_threshold(&changes, params.std_multiplier);
    let flags = flag_draining(&changes, &threshold);

    let mut events = Vec::new();
    for (start, end) in draining_runs(&flags) {
        let duration = end - start + 1;
        if duration < params.min_duration {
            continue;
        }

        let level_before = if start > 0 {
            levels[start - 1]
        } else {
            levels[start]
        };
        let level_after = levels[end];
        let volume = level_before - level_after;
        if volume <= 0.0 {
            // Only reachable when the statistical threshold sits above zero.
            debug!(vessel = vessel_id, date = %date, start, end, volume, "non-positive run dropped");
            continue;
        }

        events.push(DrainEvent {
            vessel_id: vessel_id.to_string(),
            date,
            start_index: start,
            end_index: end,
            start_time: sorted[start].timestamp,
            end_time: sorted[end].timestamp,
            level_before,
            level_after,
            volume,
            duration_ticks: duration,
            avg_drop_rate: volume / duration as f64,
        });
    }

    debug!(
        vessel = vessel_id,
        date = %date,
        ticks = levels.len(),
        threshold = threshold.value(),
        statistical = threshold.is_statistical(),
        events = events.len(),
        "drain detection done"
    );
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_start_with_nan() {
        let c = level_changes(&[1.0, 3.0, 2.0]);
        assert!(c[0].is_nan());
        assert_eq!(&c[1..], &[2.0, -1.0]);
        assert!(level_changes(&[]).is_empty());
    }

    #[test]
    fn runs_are_maximal_and_inclusive() {
        let flags = [true, true, false, false, true, false, true, true, true];
        assert_eq!(draining_runs(&flags), vec![(0, 1), (4, 4), (6, 8)]);
        assert!(draining_runs(&[false, false]).is_empty());
        assert!(draining_runs(&[]).is_empty());
    }

    #[test]
    fn ten_filling_samples_is_not_enough() {
        let mut changes = vec![f64::NAN];
        changes.extend(std::iter::repeat(1.0).take(MIN_FILLING_SAMPLES));
        assert_eq!(
            compute_threshold(&changes, 3.0),
            DrainThreshold::Fixed(FALLBACK_DRAIN_THRESHOLD)
        );

        changes.push(1.0);
        assert!(compute_threshold(&changes, 3.0).is_statistical());
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        // 11 samples: ten 1.0 and one 12.0 -> mean 2, sum sq dev = 10 + 100 = 110
        let mut changes = vec![1.0; 10];
        changes.push(12.0);
        match compute_threshold(&changes, 1.0) {
            DrainThreshold::Statistical { mean, std, threshold } => {
                assert!((mean - 2.0).abs() < 1e-12);
                assert!((std - 11.0_f64.sqrt()).abs() < 1e-12);
                assert!((threshold - (2.0 - std)).abs() < 1e-12);
            }
            other => panic!("expected statistical threshold, got {other:?}"),
        }
    }

    #[test]
    fn nan_change_never_drains() {
        let t = DrainThreshold::Fixed(-5.0);
        assert!(!t.is_draining(f64::NAN));
        assert!(t.is_draining(-5.1));
        assert!(!t.is_draining(-5.0));
    }
}
