//! cw-schemas
//!
//! Value types shared by every stage of the analysis (loader, detector,
//! aggregator, reconciler) plus the raw upstream wire shapes they are decoded
//! from. Nothing here performs IO.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One sampled fill level for one vessel at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReading {
    pub vessel_id: String,
    pub timestamp: DateTime<Utc>,
    pub level: f64,
}

impl LevelReading {
    pub fn new(vessel_id: impl Into<String>, timestamp: DateTime<Utc>, level: f64) -> Self {
        Self {
            vessel_id: vessel_id.into(),
            timestamp,
            level,
        }
    }
}

/// Join key used by both aggregates and the reconciler.
///
/// Ordering is `(vessel_id, date)`, which is the order reports are emitted in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VesselDayKey {
    pub vessel_id: String,
    pub date: NaiveDate,
}

impl VesselDayKey {
    pub fn new(vessel_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            vessel_id: vessel_id.into(),
            date,
        }
    }
}

impl fmt::Display for VesselDayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.vessel_id, self.date.format("%Y-%m-%d"))
    }
}

/// A manually logged transport ticket, already normalised to a calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub vessel_id: String,
    pub date: NaiveDate,
    pub amount_collected: f64,
}

impl TicketRecord {
    pub fn new(vessel_id: impl Into<String>, date: NaiveDate, amount_collected: f64) -> Self {
        Self {
            vessel_id: vessel_id.into(),
            date,
            amount_collected,
        }
    }

    pub fn key(&self) -> VesselDayKey {
        VesselDayKey::new(self.vessel_id.clone(), self.date)
    }
}

// ---------------------------------------------------------------------------
// Upstream wire shapes
// ---------------------------------------------------------------------------

/// One sampling tick across all vessels, exactly as the level-data source
/// sends it. `timestamp` may be epoch seconds or an ISO string, so it stays
/// untyped until normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLevelEntry {
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub cauldron_levels: BTreeMap<String, Value>,
}

/// A transport ticket exactly as the ticket source sends it.
///
/// Every field is optional at this layer so one malformed record can be
/// skipped instead of failing the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTicket {
    #[serde(default)]
    pub cauldron_id: Option<Value>,
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default)]
    pub amount_collected: Option<Value>,
}
