//! Report and aggregate types shared by the policies and the engine.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use cw_schemas::VesselDayKey;
use serde::{Deserialize, Serialize};

/// Sum of all tickets sharing a (vessel, date) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDayAggregate {
    pub vessel_id: String,
    pub date: NaiveDate,
    pub ticket_amount: f64,
    pub ticket_count: usize,
}

/// Ticket amount per key, as fed to [`crate::reconcile`].
pub type TicketAmountMap = BTreeMap<VesselDayKey, f64>;

/// Tolerances every policy receives; each policy reads the ones it uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Absolute tolerance of the four-state comparison.
    pub tolerance: f64,
    /// Relative tolerance of the blend comparison (0.05 = 5%).
    pub relative_tolerance: f64,
    /// Absolute tolerance of the blend comparison.
    pub absolute_tolerance: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            tolerance: 5.0,
            relative_tolerance: 0.05,
            absolute_tolerance: 5.0,
        }
    }
}

/// Outcome of classifying one (vessel, date) pair.
///
/// The first five are produced by the four-state policy, the last four by
/// the relative-blend policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileStatus {
    Match,
    Mismatch,
    DrainNotDetected,
    TicketMissing,
    NoData,
    Ok,
    OverReported,
    UnderReported,
    MissingTicket,
}

/// Which summary bucket a status is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    Match,
    Mismatch,
    MissingTicket,
    MissingDrain,
    NoData,
}

impl ReconcileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileStatus::Match => "MATCH",
            ReconcileStatus::Mismatch => "MISMATCH",
            ReconcileStatus::DrainNotDetected => "DRAIN_NOT_DETECTED",
            ReconcileStatus::TicketMissing => "TICKET_MISSING",
            ReconcileStatus::NoData => "NO_DATA",
            ReconcileStatus::Ok => "OK",
            ReconcileStatus::OverReported => "OVER_REPORTED",
            ReconcileStatus::UnderReported => "UNDER_REPORTED",
            ReconcileStatus::MissingTicket => "MISSING_TICKET",
        }
    }

    /// Display colour used by report consumers.
    pub fn color(&self) -> &'static str {
        match self {
            ReconcileStatus::Match | ReconcileStatus::Ok => "green",
            ReconcileStatus::DrainNotDetected => "orange",
            ReconcileStatus::NoData => "gray",
            ReconcileStatus::Mismatch
            | ReconcileStatus::TicketMissing
            | ReconcileStatus::OverReported
            | ReconcileStatus::UnderReported
            | ReconcileStatus::MissingTicket => "red",
        }
    }

    pub fn bucket(&self) -> StatusBucket {
        match self {
            ReconcileStatus::Match | ReconcileStatus::Ok => StatusBucket::Match,
            ReconcileStatus::Mismatch
            | ReconcileStatus::OverReported
            | ReconcileStatus::UnderReported => StatusBucket::Mismatch,
            ReconcileStatus::TicketMissing | ReconcileStatus::MissingTicket => {
                StatusBucket::MissingTicket
            }
            ReconcileStatus::DrainNotDetected => StatusBucket::MissingDrain,
            ReconcileStatus::NoData => StatusBucket::NoData,
        }
    }
}

impl std::fmt::Display for ReconcileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the report. Amounts are rounded for output; the status was
/// computed from the unrounded values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    #[serde(rename = "cauldron_id")]
    pub vessel_id: String,
    pub date: NaiveDate,
    pub ticket_amount: f64,
    pub drain_volume: f64,
    /// `|ticket_amount - drain_volume|`
    pub difference: f64,
    /// `difference / max(drain_volume, 1e-6)`
    pub relative_difference: f64,
    pub status: ReconcileStatus,
    pub color: String,
}

impl ReconciliationResult {
    pub fn key(&self) -> VesselDayKey {
        VesselDayKey::new(self.vessel_id.clone(), self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub total_comparisons: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub missing_tickets: usize,
    pub missing_drains: usize,
    pub no_data: usize,
    /// Count per exact status label.
    pub status_counts: BTreeMap<ReconcileStatus, usize>,
    /// `matches / total * 100`, 2 dp; 0 when there is nothing to compare.
    pub match_percentage: f64,
    pub policy: String,
    pub tolerance_used: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub summary: ReconcileSummary,
    pub results: Vec<ReconciliationResult>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.summary.matches == self.summary.total_comparisons
    }
}
