//! Report shapes handed back to callers.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use cw_config::DateWindow;
use cw_detect::{DrainEvent, VesselDayAggregate};
use cw_md::LoadedDays;
use cw_reconcile::{round_to, ReconcileSummary, ReconciliationResult};
use cw_schemas::VesselDayKey;
use serde::{Deserialize, Serialize};

/// Error text carried by a drain analysis that loaded nothing.
pub const NO_DATA_FETCHED: &str = "No data fetched";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedDate {
    pub date: NaiveDate,
    pub error: String,
}

/// Requested dates that contributed no level data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataGaps {
    pub unsupported_dates: Vec<NaiveDate>,
    pub failed_dates: Vec<FailedDate>,
}

impl DataGaps {
    pub fn from_loaded(loaded: &LoadedDays) -> Self {
        Self {
            unsupported_dates: loaded.unsupported_dates.clone(),
            failed_dates: loaded
                .failed_dates
                .iter()
                .map(|(date, error)| FailedDate {
                    date: *date,
                    error: error.clone(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unsupported_dates.is_empty() && self.failed_dates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Drain analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainEventSummary {
    pub start_minute: usize,
    pub end_minute: usize,
    pub duration_minutes: usize,
    pub volume: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub level_before: f64,
    pub level_after: f64,
    pub avg_drop_rate: f64,
}

impl From<&DrainEvent> for DrainEventSummary {
    fn from(e: &DrainEvent) -> Self {
        Self {
            start_minute: e.start_index,
            end_minute: e.end_index,
            duration_minutes: e.duration_ticks,
            volume: round_to(e.volume, 2),
            start_time: e.start_time,
            end_time: e.end_time,
            level_before: e.level_before,
            level_after: e.level_after,
            avg_drop_rate: round_to(e.avg_drop_rate, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauldronDrainSummary {
    pub cauldron_id: String,
    pub date_time: NaiveDate,
    pub drain_volume: f64,
    pub number_of_drains: usize,
    pub drain_events: Vec<DrainEventSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrainAnalysisSummary {
    /// Distinct vessels with at least one drain.
    pub total_cauldrons_analyzed: usize,
    /// Dates requested, supported or not.
    pub total_dates_analyzed: usize,
    pub total_drain_events: usize,
    pub total_volume_drained: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainAnalysisReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cauldron_data: Vec<CauldronDrainSummary>,
    pub summary: DrainAnalysisSummary,
    #[serde(default)]
    pub data_gaps: DataGaps,
}

impl DrainAnalysisReport {
    /// Nothing could be loaded for any requested date.
    pub fn no_data(dates_requested: usize, gaps: DataGaps) -> Self {
        Self {
            error: Some(NO_DATA_FETCHED.to_string()),
            cauldron_data: Vec::new(),
            summary: DrainAnalysisSummary {
                total_dates_analyzed: dates_requested,
                ..DrainAnalysisSummary::default()
            },
            data_gaps: gaps,
        }
    }

    /// Entries are ordered by date, then vessel.
    pub fn from_aggregates(
        aggregates: &BTreeMap<VesselDayKey, VesselDayAggregate>,
        dates_requested: usize,
        gaps: DataGaps,
    ) -> Self {
        let mut ordered: Vec<&VesselDayAggregate> = aggregates.values().collect();
        ordered.sort_by(|a, b| (a.date, &a.vessel_id).cmp(&(b.date, &b.vessel_id)));

        let cauldron_data: Vec<CauldronDrainSummary> = ordered
            .into_iter()
            .map(|a| CauldronDrainSummary {
                cauldron_id: a.vessel_id.clone(),
                date_time: a.date,
                drain_volume: round_to(a.drain_volume, 2),
                number_of_drains: a.event_count,
                drain_events: a.events.iter().map(DrainEventSummary::from).collect(),
            })
            .collect();

        let vessels: BTreeSet<&str> = cauldron_data.iter().map(|c| c.cauldron_id.as_str()).collect();
        let summary = DrainAnalysisSummary {
            total_cauldrons_analyzed: vessels.len(),
            total_dates_analyzed: dates_requested,
            total_drain_events: cauldron_data.iter().map(|c| c.number_of_drains).sum(),
            total_volume_drained: round_to(cauldron_data.iter().map(|c| c.drain_volume).sum(), 2),
        };

        Self {
            error: None,
            cauldron_data,
            summary,
            data_gaps: gaps,
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Parameters the comparison actually ran with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfiguration {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: usize,
    pub std_multiplier: f64,
    pub min_duration: usize,
    pub tolerance: f64,
    pub policy: String,
    pub drain_method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub summary: ReconcileSummary,
    pub results: Vec<ReconciliationResult>,
    pub configuration: ReportConfiguration,
    #[serde(default)]
    pub data_gaps: DataGaps,
}

// ---------------------------------------------------------------------------
// Discrepancy check
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyReport {
    pub window: DateWindow,
    pub policy: String,
    pub drain_method: String,
    pub summary: ReconcileSummary,
    pub results: Vec<ReconciliationResult>,
}
