//! Time Series Loader.
//!
//! Two entry points with different failure semantics:
//! - [`TimeSeriesLoader::load_dates`] is lenient. A date missing from the
//!   window table is skipped; a failed fetch degrades to "no data for that
//!   date" and the remaining dates still load.
//! - [`TimeSeriesLoader::load_window`] is strict. Any failure is returned.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use cw_config::DateWindowTable;
use cw_schemas::{LevelReading, VesselDayKey};
use tracing::{info, warn};

use crate::normalizer::decode_level_entries;
use crate::source::{LevelSource, SourceError};

/// Result of a lenient multi-date load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedDays {
    /// Readings per requested date (only dates that produced data).
    pub days: BTreeMap<NaiveDate, Vec<LevelReading>>,
    /// Requested dates absent from the window table.
    pub unsupported_dates: Vec<NaiveDate>,
    /// Dates whose fetch failed, with the error text.
    pub failed_dates: Vec<(NaiveDate, String)>,
}

impl LoadedDays {
    pub fn total_readings(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

pub struct TimeSeriesLoader<'a, S: LevelSource + ?Sized> {
    source: &'a S,
    windows: &'a DateWindowTable,
}

impl<'a, S: LevelSource + ?Sized> TimeSeriesLoader<'a, S> {
    pub fn new(source: &'a S, windows: &'a DateWindowTable) -> Self {
        Self { source, windows }
    }

    /// Readings for one supported date, or `Ok(None)` when the date has no
    /// window in the table.
    pub async fn load_date(
        &self,
        date: NaiveDate,
    ) -> Result<Option<Vec<LevelReading>>, SourceError> {
        let Some(window) = self.windows.get(date) else {
            return Ok(None);
        };
        let entries = self.source.fetch_levels(window.start, window.end).await?;
        Ok(Some(decode_level_entries(&entries).readings))
    }

    /// Load every requested date independently. Duplicate dates load once.
    pub async fn load_dates(&self, dates: &[NaiveDate]) -> LoadedDays {
        let mut out = LoadedDays::default();
        let unique: BTreeSet<NaiveDate> = dates.iter().copied().collect();

        for date in unique {
            match self.load_date(date).await {
                Ok(None) => {
                    warn!(date = %date, "date not in supported windows; skipped");
                    out.unsupported_dates.push(date);
                }
                Ok(Some(readings)) if readings.is_empty() => {
                    warn!(date = %date, source = self.source.source_name(), "no level data for date");
                }
                Ok(Some(readings)) => {
                    info!(date = %date, readings = readings.len(), "level data loaded");
                    out.days.insert(date, readings);
                }
                Err(e) => {
                    warn!(date = %date, error = %e, "level fetch failed; continuing without this date");
                    out.failed_dates.push((date, e.to_string()));
                }
            }
        }

        out
    }

    /// Fetch one arbitrary window; any failure is returned to the caller.
    pub async fn load_window(
        &self,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<LevelReading>, SourceError> {
        let entries = self.source.fetch_levels(start_ts, end_ts).await?;
        let decoded = decode_level_entries(&entries);
        info!(
            start_ts,
            end_ts,
            readings = decoded.readings.len(),
            "level window loaded"
        );
        Ok(decoded.readings)
    }
}

/// Reshape a flat batch into per-vessel sequences (input order preserved).
pub fn group_by_vessel(readings: &[LevelReading]) -> BTreeMap<String, Vec<LevelReading>> {
    let mut out: BTreeMap<String, Vec<LevelReading>> = BTreeMap::new();
    for r in readings {
        out.entry(r.vessel_id.clone()).or_default().push(r.clone());
    }
    out
}

/// Reshape a flat batch into per-(vessel, UTC calendar date) sequences.
pub fn group_by_vessel_day(readings: &[LevelReading]) -> BTreeMap<VesselDayKey, Vec<LevelReading>> {
    let mut out: BTreeMap<VesselDayKey, Vec<LevelReading>> = BTreeMap::new();
    for r in readings {
        let key = VesselDayKey::new(r.vessel_id.clone(), r.timestamp.date_naive());
        out.entry(key).or_default().push(r.clone());
    }
    out
}
