//! cw-detect
//!
//! Turns level sequences into drain volumes.
//!
//! Two distinct computations live here and are selected by configuration,
//! never blended:
//! - `statistical`: the multi-tick drain event detector. Its threshold is
//!   calibrated per vessel per day from that day's filling deltas.
//! - `raw_drop`: the sum of single-tick drops beyond a fixed absolute
//!   threshold.
//!
//! `aggregate` rolls either one up to a single volume per (vessel, date).
//!
//! Deterministic, pure logic. No IO.

pub mod aggregate;
pub mod raw_drop;
pub mod statistical;
mod types;

pub use aggregate::{
    aggregate_raw_drops, split_days_by_vessel, volumes, DrainAggregator, DrainVolumeMap,
    VesselDayAggregate,
};
pub use raw_drop::raw_level_drop;
pub use statistical::{
    compute_threshold, detect_drain_events, draining_runs, flag_draining, level_changes,
    FALLBACK_DRAIN_THRESHOLD, MIN_FILLING_SAMPLES,
};
pub use types::*;
