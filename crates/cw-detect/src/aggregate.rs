//! Roll detector output up to one volume per (vessel, date).
//!
//! Every (vessel, date) detection is independent, so the statistical
//! aggregator fans out over rayon and merges into a `BTreeMap`; output order
//! never depends on scheduling.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use cw_schemas::{LevelReading, VesselDayKey};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::raw_drop::raw_level_drop;
use crate::statistical::detect_drain_events;
use crate::types::{DetectorParams, DrainEvent};

/// Drain volume per (vessel, date), whichever method produced it.
pub type DrainVolumeMap = BTreeMap<VesselDayKey, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselDayAggregate {
    pub vessel_id: String,
    pub date: NaiveDate,
    pub drain_volume: f64,
    pub event_count: usize,
    pub events: Vec<DrainEvent>,
}

/// Split per-date batches into per-(vessel, date) sequences. The date is the
/// requested date the batch was loaded for.
pub fn split_days_by_vessel(
    days: &BTreeMap<NaiveDate, Vec<LevelReading>>,
) -> BTreeMap<VesselDayKey, Vec<LevelReading>> {
    let mut out: BTreeMap<VesselDayKey, Vec<LevelReading>> = BTreeMap::new();
    for (date, readings) in days {
        for r in readings {
            out.entry(VesselDayKey::new(r.vessel_id.clone(), *date))
                .or_default()
                .push(r.clone());
        }
    }
    out
}

/// Statistical aggregator.
#[derive(Debug, Clone)]
pub struct DrainAggregator {
    params: DetectorParams,
    workers: usize,
}

impl DrainAggregator {
    pub fn new(params: DetectorParams) -> Self {
        Self { params, workers: 0 }
    }

    /// Run detection on a dedicated pool of `workers` threads (0 = global pool).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Detect and sum per key. Keys whose total is not strictly positive are
    /// left out: absence means "no drain detected".
    pub fn aggregate(
        &self,
        groups: &BTreeMap<VesselDayKey, Vec<LevelReading>>,
    ) -> BTreeMap<VesselDayKey, VesselDayAggregate> {
        let detect_all = || -> Vec<(VesselDayKey, VesselDayAggregate)> {
            groups
                .par_iter()
                .filter_map(|(key, readings)| {
                    let events =
                        detect_drain_events(&key.vessel_id, key.date, readings, &self.params);
                    let drain_volume: f64 = events.iter().map(|e| e.volume).sum();
                    if drain_volume > 0.0 {
                        Some((
                            key.clone(),
                            VesselDayAggregate {
                                vessel_id: key.vessel_id.clone(),
                                date: key.date,
                                drain_volume,
                                event_count: events.len(),
                                events,
                            },
                        ))
                    } else {
                        None
                    }
                })
                .collect()
        };

        let detected = if self.workers > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
            {
                Ok(pool) => pool.install(detect_all),
                Err(e) => {
                    warn!(workers = self.workers, error = %e, "detector pool build failed; using global pool");
                    detect_all()
                }
            }
        } else {
            detect_all()
        };

        let out: BTreeMap<VesselDayKey, VesselDayAggregate> = detected.into_iter().collect();
        debug!(
            keys_in = groups.len(),
            keys_with_drains = out.len(),
            "statistical aggregation done"
        );
        out
    }
}

/// Drain volume per key from statistical aggregates.
pub fn volumes(aggregates: &BTreeMap<VesselDayKey, VesselDayAggregate>) -> DrainVolumeMap {
    aggregates
        .iter()
        .map(|(k, a)| (k.clone(), a.drain_volume))
        .collect()
}

/// Raw-drop volume per key. Zero-volume keys are kept: every observed
/// (vessel, date) is reported.
pub fn aggregate_raw_drops(
    groups: &BTreeMap<VesselDayKey, Vec<LevelReading>>,
    drop_threshold: f64,
) -> DrainVolumeMap {
    groups
        .iter()
        .map(|(k, readings)| (k.clone(), raw_level_drop(readings, drop_threshold)))
        .collect()
}
