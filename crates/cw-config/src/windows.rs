//! Supported-date window table.
//!
//! Maps a calendar date to the inclusive `[start, end]` epoch-second window
//! the level-data source is queried with for that date. A date absent from
//! the table is not fetched.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive epoch-second window for one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: i64,
    pub end: i64,
}

impl DateWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }
}

/// Read-only lookup table, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DateWindowTable {
    windows: BTreeMap<NaiveDate, DateWindow>,
}

/// Dates the hosted level-data source has per-minute history for.
const BUILTIN_WINDOWS: &[(&str, i64, i64)] = &[
    ("2025-10-30", 1761782400, 1761868740),
    ("2025-10-31", 1761868800, 1761955140),
    ("2025-11-01", 1761955200, 1762041540),
    ("2025-11-02", 1762041600, 1762127940),
    ("2025-11-03", 1762128000, 1762214340),
    ("2025-11-04", 1762214400, 1762300740),
    ("2025-11-05", 1762300800, 1762387140),
    ("2025-11-06", 1762387200, 1762473540),
    ("2025-11-07", 1762473600, 1762559940),
    ("2025-11-08", 1762560000, 1762638000),
];

impl DateWindowTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The table shipped with the binary.
    pub fn builtin() -> Self {
        let mut windows = BTreeMap::new();
        for (date, start, end) in BUILTIN_WINDOWS {
            // Constants above are valid ISO dates.
            if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                windows.insert(d, DateWindow::new(*start, *end));
            }
        }
        Self { windows }
    }

    /// Build from a `YYYY-MM-DD -> window` map as found in config.
    pub fn from_config_map(raw: &BTreeMap<String, DateWindow>) -> Result<Self> {
        let mut windows = BTreeMap::new();
        for (date, w) in raw {
            let d = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .with_context(|| format!("windows: invalid date key '{date}'"))?;
            if w.start > w.end {
                bail!(
                    "windows: start after end for {date} (start={} end={})",
                    w.start,
                    w.end
                );
            }
            windows.insert(d, *w);
        }
        Ok(Self { windows })
    }

    pub fn insert(&mut self, date: NaiveDate, window: DateWindow) {
        self.windows.insert(date, window);
    }

    pub fn get(&self, date: NaiveDate) -> Option<DateWindow> {
        self.windows.get(&date).copied()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.windows.contains_key(&date)
    }

    /// Supported dates, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.windows.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, DateWindow)> + '_ {
        self.windows.iter().map(|(d, w)| (*d, *w))
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
