//! Raw wire shapes -> typed readings and tickets.
//!
//! A malformed tick, level value, or ticket is skipped and counted; it never
//! fails the batch it arrived in.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use cw_schemas::{LevelReading, RawLevelEntry, RawTicket, TicketRecord};
use serde_json::Value;
use tracing::warn;

/// Readings decoded from a batch of ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedLevels {
    pub readings: Vec<LevelReading>,
    /// Ticks dropped because their timestamp could not be parsed.
    pub skipped_entries: usize,
    /// Individual vessel levels dropped because they were not numeric.
    pub skipped_levels: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedTickets {
    pub records: Vec<TicketRecord>,
    pub skipped: usize,
}

/// Parse an upstream timestamp: epoch seconds (int, float, or numeric
/// string) or an ISO date-time. Naive ISO values are taken as UTC.
pub fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                return Utc.timestamp_opt(secs, 0).single();
            }
            n.as_f64().and_then(epoch_f64)
        }
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn epoch_f64(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    Utc.timestamp_opt(whole as i64, nanos.min(999_999_999)).single()
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(secs) = s.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    s.parse::<f64>().ok().and_then(epoch_f64)
}

fn level_value(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    f.is_finite().then_some(f)
}

/// Flatten ticks into one reading per (vessel, tick).
///
/// Readings come out in tick order, then vessel-id order within a tick.
pub fn decode_level_entries(entries: &[RawLevelEntry]) -> DecodedLevels {
    let mut out = DecodedLevels::default();

    for entry in entries {
        let Some(ts) = parse_timestamp(&entry.timestamp) else {
            out.skipped_entries += 1;
            continue;
        };
        for (vessel_id, raw_level) in &entry.cauldron_levels {
            match level_value(raw_level) {
                Some(level) => out
                    .readings
                    .push(LevelReading::new(vessel_id.clone(), ts, level)),
                None => out.skipped_levels += 1,
            }
        }
    }

    if out.skipped_entries > 0 || out.skipped_levels > 0 {
        warn!(
            skipped_entries = out.skipped_entries,
            skipped_levels = out.skipped_levels,
            "malformed level data skipped"
        );
    }
    out
}

/// Ticket date: an ISO date, optionally time-qualified. Anything after the
/// `T` (or a space) separator is dropped.
pub fn parse_ticket_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let day = s.split('T').next().unwrap_or(s);
    let day = day.split(' ').next().unwrap_or(day);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn decode_ticket(raw: &RawTicket) -> Result<TicketRecord, &'static str> {
    let vessel_id = match &raw.cauldron_id {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err("cauldron_id"),
    };
    let date = match &raw.date {
        Some(Value::String(s)) => parse_ticket_date(s).ok_or("date")?,
        _ => return Err("date"),
    };
    let amount = raw
        .amount_collected
        .as_ref()
        .and_then(level_value)
        .ok_or("amount_collected")?;
    Ok(TicketRecord::new(vessel_id, date, amount))
}

pub fn decode_tickets(raw: &[RawTicket]) -> DecodedTickets {
    let mut out = DecodedTickets::default();
    for (idx, t) in raw.iter().enumerate() {
        match decode_ticket(t) {
            Ok(rec) => out.records.push(rec),
            Err(field) => {
                warn!(index = idx, field, "malformed ticket skipped");
                out.skipped += 1;
            }
        }
    }
    out
}

/// Unwrap the ticket payload: `{"transport_tickets": [...]}`, a bare list,
/// or a single ticket object. Elements that are not ticket-shaped are
/// dropped here with a warning.
pub fn split_ticket_payload(body: Value) -> Vec<RawTicket> {
    let items = match body {
        Value::Object(mut map) => match map.remove("transport_tickets") {
            Some(Value::Array(items)) => items,
            Some(_) => Vec::new(),
            None => vec![Value::Object(map)],
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<RawTicket>(item) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(index = idx, error = %e, "non-object ticket entry skipped");
                None
            }
        })
        .collect()
}

/// Split a level payload (a JSON array of ticks) into raw entries, dropping
/// elements that are not tick-shaped.
pub fn split_level_payload(body: Value) -> Result<Vec<RawLevelEntry>, String> {
    let Value::Array(items) = body else {
        return Err("level payload is not a JSON array".to_string());
    };
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(
            |(idx, item)| match serde_json::from_value::<RawLevelEntry>(item) {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!(index = idx, error = %e, "non-object level entry skipped");
                    None
                }
            },
        )
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamp_epoch_and_iso_agree() {
        let a = parse_timestamp(&json!(1761782400)).unwrap();
        let b = parse_timestamp(&json!("2025-10-30T00:00:00Z")).unwrap();
        let c = parse_timestamp(&json!("2025-10-30T00:00:00")).unwrap();
        let d = parse_timestamp(&json!("2025-10-30 00:00:00")).unwrap();
        let e = parse_timestamp(&json!("1761782400")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
        assert_eq!(a, e);
    }

    #[test]
    fn timestamp_with_offset_is_converted() {
        let a = parse_timestamp(&json!("2025-10-30T02:00:00+02:00")).unwrap();
        assert_eq!(a.timestamp(), 1761782400);
    }

    #[test]
    fn timestamp_garbage_is_none() {
        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!(null)).is_none());
        assert!(parse_timestamp(&json!({"s": 1})).is_none());
    }

    #[test]
    fn decode_skips_bad_ticks_and_levels() {
        let entries: Vec<RawLevelEntry> = serde_json::from_value(json!([
            {"timestamp": "2025-10-30T00:00:00Z", "cauldron_levels": {"cauldron_002": 10.0, "cauldron_001": 5}},
            {"timestamp": "not a time", "cauldron_levels": {"cauldron_001": 6.0}},
            {"timestamp": "2025-10-30T00:01:00Z", "cauldron_levels": {"cauldron_001": null, "cauldron_002": "11.5"}}
        ]))
        .unwrap();

        let out = decode_level_entries(&entries);
        assert_eq!(out.skipped_entries, 1);
        assert_eq!(out.skipped_levels, 1);
        assert_eq!(out.readings.len(), 3);
        assert_eq!(out.readings[0].vessel_id, "cauldron_001");
        assert_eq!(out.readings[0].level, 5.0);
        assert_eq!(out.readings[2].vessel_id, "cauldron_002");
        assert_eq!(out.readings[2].level, 11.5);
    }

    #[test]
    fn ticket_date_truncates_time() {
        let d = NaiveDate::from_ymd_opt(2025, 10, 30).unwrap();
        assert_eq!(parse_ticket_date("2025-10-30T13:45:00Z"), Some(d));
        assert_eq!(parse_ticket_date("2025-10-30"), Some(d));
        assert_eq!(parse_ticket_date("2025-10-30 08:00:00"), Some(d));
        assert_eq!(parse_ticket_date("30/10/2025"), None);
    }

    #[test]
    fn decode_tickets_coerces_amount_and_skips_malformed() {
        let raw = split_ticket_payload(json!({
            "transport_tickets": [
                {"cauldron_id": "cauldron_001", "date": "2025-10-30T10:00:00", "amount_collected": "42.5"},
                {"cauldron_id": "cauldron_002", "date": "2025-10-30", "amount_collected": 10},
                {"cauldron_id": "cauldron_003", "amount_collected": 10},
                {"cauldron_id": 7, "date": "2025-10-30", "amount_collected": 10},
                {"cauldron_id": "cauldron_004", "date": "2025-10-30", "amount_collected": "lots"}
            ]
        }));
        assert_eq!(raw.len(), 5);

        let out = decode_tickets(&raw);
        assert_eq!(out.skipped, 3);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].amount_collected, 42.5);
        assert_eq!(
            out.records[0].date,
            NaiveDate::from_ymd_opt(2025, 10, 30).unwrap()
        );
    }

    #[test]
    fn ticket_payload_shapes() {
        let one = json!({"cauldron_id": "cauldron_001", "date": "2025-10-30", "amount_collected": 1});
        assert_eq!(split_ticket_payload(one.clone()).len(), 1);
        assert_eq!(split_ticket_payload(json!([one.clone(), one.clone(), 3])).len(), 2);
        assert!(split_ticket_payload(json!("nope")).is_empty());
        assert!(split_ticket_payload(json!({"transport_tickets": {}})).is_empty());
    }

    #[test]
    fn level_payload_must_be_array() {
        assert!(split_level_payload(json!({"data": []})).is_err());
        let entries = split_level_payload(json!([
            {"timestamp": 1761782400, "cauldron_levels": {"a": 1.0}},
            "junk"
        ]))
        .unwrap();
        assert_eq!(entries.len(), 1);
    }
}
