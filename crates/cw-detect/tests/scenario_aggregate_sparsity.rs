//! Aggregator scenarios.
//!
//! GREEN when:
//! - keys without a positive drain total are absent (not zero-valued)
//! - drain_volume is the sum of event volumes and event_count matches
//! - a dedicated worker pool gives the same map as the global pool
//! - raw-drop aggregation keeps zero-volume keys

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use cw_detect::*;
use cw_schemas::{LevelReading, VesselDayKey};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn ticks(vessel: &str, date: NaiveDate, levels: &[f64]) -> Vec<LevelReading> {
    let t0 = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap());
    levels
        .iter()
        .enumerate()
        .map(|(i, l)| LevelReading::new(vessel, t0 + Duration::minutes(i as i64), *l))
        .collect()
}

/// Two separate 3-tick drains of 30 each; no filling so the fixed threshold applies.
const TWO_DRAINS: [f64; 12] = [
    100.0, 90.0, 80.0, 70.0, 70.0, 70.0, 60.0, 50.0, 40.0, 40.0, 40.0, 40.0,
];
const FLAT: [f64; 6] = [55.0, 55.0, 55.0, 55.0, 55.0, 55.0];

fn days() -> BTreeMap<NaiveDate, Vec<LevelReading>> {
    let mut days = BTreeMap::new();
    let mut first = ticks("cauldron_001", d("2025-10-30"), &TWO_DRAINS);
    first.extend(ticks("cauldron_002", d("2025-10-30"), &FLAT));
    days.insert(d("2025-10-30"), first);

    let mut second = ticks("cauldron_001", d("2025-10-31"), &FLAT);
    second.extend(ticks("cauldron_002", d("2025-10-31"), &TWO_DRAINS));
    days.insert(d("2025-10-31"), second);
    days
}

fn params() -> DetectorParams {
    DetectorParams {
        std_multiplier: 3.0,
        min_duration: 3,
    }
}

#[test]
fn zero_drain_keys_are_absent() {
    let groups = split_days_by_vessel(&days());
    assert_eq!(groups.len(), 4);

    let aggs = DrainAggregator::new(params()).aggregate(&groups);

    let keys: Vec<VesselDayKey> = aggs.keys().cloned().collect();
    assert_eq!(
        keys,
        vec![
            VesselDayKey::new("cauldron_001", d("2025-10-30")),
            VesselDayKey::new("cauldron_002", d("2025-10-31")),
        ]
    );
    assert!(aggs.values().all(|a| a.drain_volume > 0.0));
}

#[test]
fn volume_is_sum_of_events() {
    let aggs = DrainAggregator::new(params()).aggregate(&split_days_by_vessel(&days()));
    let a = &aggs[&VesselDayKey::new("cauldron_001", d("2025-10-30"))];

    assert_eq!(a.event_count, 2);
    assert_eq!(a.events.len(), 2);
    assert_eq!(a.drain_volume, 60.0);
    assert_eq!(a.events[0].volume + a.events[1].volume, a.drain_volume);
    assert!(a.events[0].start_index < a.events[1].start_index);

    let v = volumes(&aggs);
    assert_eq!(v.len(), 2);
    assert_eq!(v[&VesselDayKey::new("cauldron_002", d("2025-10-31"))], 60.0);
}

#[test]
fn dedicated_pool_matches_global_pool() {
    let groups = split_days_by_vessel(&days());
    let global = DrainAggregator::new(params()).aggregate(&groups);
    let pooled = DrainAggregator::new(params()).with_workers(3).aggregate(&groups);
    assert_eq!(global, pooled);
}

#[test]
fn raw_drop_keeps_zero_keys() {
    let groups = split_days_by_vessel(&days());
    let raw = aggregate_raw_drops(&groups, 1.0);

    assert_eq!(raw.len(), 4);
    assert_eq!(raw[&VesselDayKey::new("cauldron_002", d("2025-10-30"))], 0.0);
    assert_eq!(raw[&VesselDayKey::new("cauldron_001", d("2025-10-30"))], 60.0);
}

#[test]
fn readings_are_keyed_by_requested_date() {
    // A batch loaded for 2025-10-30 whose timestamps spill past midnight
    // still belongs to 2025-10-30.
    let mut days = BTreeMap::new();
    let t0 = Utc.with_ymd_and_hms(2025, 10, 30, 23, 58, 0).unwrap();
    let readings: Vec<LevelReading> = (0..4)
        .map(|i| LevelReading::new("cauldron_003", t0 + Duration::minutes(i), 10.0))
        .collect();
    days.insert(d("2025-10-30"), readings);

    let groups = split_days_by_vessel(&days);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups.keys().next().unwrap().date, d("2025-10-30"));
}
