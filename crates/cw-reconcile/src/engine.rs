//! Union reconciliation of ticket and drain aggregates.

use std::collections::{BTreeMap, BTreeSet};

use cw_schemas::VesselDayKey;
use tracing::debug;

use crate::policy::{ReconciliationPolicy, REL_EPSILON};
use crate::types::{
    ReconcileReport, ReconcileStatus, ReconcileSummary, ReconciliationResult, StatusBucket,
    TicketAmountMap, Tolerances,
};

/// Round half away from zero to `dp` decimal places.
pub fn round_to(value: f64, dp: i32) -> f64 {
    let scale = 10f64.powi(dp);
    (value * scale).round() / scale
}

fn summarize(
    results: &[ReconciliationResult],
    policy: &dyn ReconciliationPolicy,
    tol: &Tolerances,
) -> ReconcileSummary {
    let mut status_counts: BTreeMap<ReconcileStatus, usize> = BTreeMap::new();
    let (mut matches, mut mismatches, mut missing_tickets, mut missing_drains, mut no_data) =
        (0, 0, 0, 0, 0);

    for r in results {
        *status_counts.entry(r.status).or_default() += 1;
        match r.status.bucket() {
            StatusBucket::Match => matches += 1,
            StatusBucket::Mismatch => mismatches += 1,
            StatusBucket::MissingTicket => missing_tickets += 1,
            StatusBucket::MissingDrain => missing_drains += 1,
            StatusBucket::NoData => no_data += 1,
        }
    }

    let total = results.len();
    let match_percentage = if total == 0 {
        0.0
    } else {
        round_to(matches as f64 / total as f64 * 100.0, 2)
    };

    ReconcileSummary {
        total_comparisons: total,
        matches,
        mismatches,
        missing_tickets,
        missing_drains,
        no_data,
        status_counts,
        match_percentage,
        policy: policy.name().to_string(),
        tolerance_used: policy.tolerance_used(tol),
    }
}

/// Join ticket amounts and drain volumes on (vessel, date).
///
/// One result per key in the union of both maps, in key order. A key absent
/// on one side is compared as 0.0 on that side.
pub fn reconcile(
    tickets: &TicketAmountMap,
    drains: &BTreeMap<VesselDayKey, f64>,
    policy: &dyn ReconciliationPolicy,
    tol: &Tolerances,
) -> ReconcileReport {
    let keys: BTreeSet<&VesselDayKey> = tickets.keys().chain(drains.keys()).collect();

    let results: Vec<ReconciliationResult> = keys
        .into_iter()
        .map(|key| {
            let ticket_amount = tickets.get(key).copied().unwrap_or(0.0);
            let drain_volume = drains.get(key).copied().unwrap_or(0.0);
            let status = policy.classify(ticket_amount, drain_volume, tol);
            let difference = (ticket_amount - drain_volume).abs();
            let relative_difference = difference / drain_volume.max(REL_EPSILON);

            ReconciliationResult {
                vessel_id: key.vessel_id.clone(),
                date: key.date,
                ticket_amount: round_to(ticket_amount, 2),
                drain_volume: round_to(drain_volume, 2),
                difference: round_to(difference, 2),
                relative_difference: round_to(relative_difference, 3),
                status,
                color: status.color().to_string(),
            }
        })
        .collect();

    let summary = summarize(&results, policy, tol);
    debug!(
        policy = summary.policy.as_str(),
        total = summary.total_comparisons,
        matches = summary.matches,
        "reconcile done"
    );

    ReconcileReport { summary, results }
}
