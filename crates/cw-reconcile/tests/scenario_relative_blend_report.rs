//! Relative-blend reconciliation over raw-drop style volumes.
//!
//! GREEN when:
//! - relative OR absolute agreement is OK
//! - direction of the gap picks OVER/UNDER, a zero ticket is MISSING_TICKET
//! - summary buckets these statuses like their four-state counterparts

use std::collections::BTreeMap;

use chrono::NaiveDate;
use cw_reconcile::*;
use cw_schemas::VesselDayKey;

fn key(v: &str) -> VesselDayKey {
    VesselDayKey::new(v, NaiveDate::from_ymd_opt(2025, 11, 2).unwrap())
}

#[test]
fn blend_statuses_and_summary() {
    let tickets = BTreeMap::from([
        (key("cauldron_001"), 980.0),
        (key("cauldron_002"), 300.0),
        (key("cauldron_003"), 100.0),
        (key("cauldron_005"), 12.0),
    ]);
    let drains = BTreeMap::from([
        (key("cauldron_001"), 1000.0),
        (key("cauldron_002"), 200.0),
        (key("cauldron_003"), 200.0),
        (key("cauldron_004"), 75.0),
        (key("cauldron_005"), 0.0),
    ]);

    let report = reconcile(&tickets, &drains, &RelativeBlendPolicy, &Tolerances::default());
    let statuses: Vec<ReconcileStatus> = report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ReconcileStatus::Ok,
            ReconcileStatus::OverReported,
            ReconcileStatus::UnderReported,
            ReconcileStatus::MissingTicket,
            ReconcileStatus::OverReported,
        ]
    );

    assert_eq!(report.results[1].relative_difference, 0.5);
    // Zero drain: denominator floors at 1e-6.
    assert_eq!(report.results[4].relative_difference, 12_000_000.0);

    let s = &report.summary;
    assert_eq!(s.matches, 1);
    assert_eq!(s.mismatches, 3);
    assert_eq!(s.missing_tickets, 1);
    assert_eq!(s.match_percentage, 20.0);
    assert_eq!(s.policy, "relative_blend");
    assert_eq!(s.status_counts[&ReconcileStatus::OverReported], 2);
}

#[test]
fn policies_are_selectable_behind_one_interface() {
    let policies: Vec<Box<dyn ReconciliationPolicy>> =
        vec![Box::new(FourStatePolicy), Box::new(RelativeBlendPolicy)];
    let tol = Tolerances::default();

    // A 0-ticket, 0-drain pair is NO_DATA under one policy and OK under the other.
    let got: Vec<ReconcileStatus> = policies.iter().map(|p| p.classify(0.0, 0.0, &tol)).collect();
    assert_eq!(got, vec![ReconcileStatus::NoData, ReconcileStatus::Ok]);
}
