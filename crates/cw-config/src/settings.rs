//! Typed analysis settings.
//!
//! Every section is optional in YAML; missing keys fall back to the defaults
//! below. `AnalysisConfig::from_json` validates ranges once so downstream
//! crates can take the values as given.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::windows::{DateWindow, DateWindowTable};

/// Upstream level-data and ticket sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub base_url: String,
    pub data_path: String,
    pub tickets_path: String,
    /// Upper bound for a single fetch. No retries are attempted.
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: "https://hackutd2025.eog.systems".to_string(),
            data_path: "/api/Data".to_string(),
            tickets_path: "/api/Tickets".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub std_multiplier: f64,
    pub min_duration: usize,
    /// Worker threads for per-(vessel, date) detection; 0 uses the global pool.
    pub workers: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            std_multiplier: 3.0,
            min_duration: 5,
            workers: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDropSettings {
    /// A tick contributes when `level_change < -drop_threshold`.
    pub drop_threshold: f64,
}

impl Default for RawDropSettings {
    fn default() -> Self {
        Self {
            drop_threshold: 1.0,
        }
    }
}

/// Which classification table a report is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// MATCH / MISMATCH / DRAIN_NOT_DETECTED / TICKET_MISSING / NO_DATA
    FourState,
    /// OK / OVER_REPORTED / UNDER_REPORTED / MISSING_TICKET
    RelativeBlend,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::FourState => "four_state",
            PolicyKind::RelativeBlend => "relative_blend",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "four_state" => Ok(PolicyKind::FourState),
            "relative_blend" | "relative" => Ok(PolicyKind::RelativeBlend),
            other => bail!(
                "invalid policy '{}'. expected one of: four_state | relative_blend",
                other
            ),
        }
    }
}

/// Which drain-volume computation backs a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainMethod {
    /// Multi-tick statistical event detector.
    Statistical,
    /// Sum of single-tick drops beyond a fixed threshold.
    RawDrop,
}

impl DrainMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrainMethod::Statistical => "statistical",
            DrainMethod::RawDrop => "raw_drop",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "statistical" => Ok(DrainMethod::Statistical),
            "raw_drop" | "raw" => Ok(DrainMethod::RawDrop),
            other => bail!(
                "invalid drain method '{}'. expected one of: statistical | raw_drop",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub policy: PolicyKind,
    pub drain_method: DrainMethod,
    /// Absolute tolerance for the four-state policy.
    pub tolerance: f64,
    /// Relative tolerance for the relative-blend policy.
    pub relative_tolerance: f64,
    /// Absolute tolerance for the relative-blend policy.
    pub absolute_tolerance: f64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            policy: PolicyKind::FourState,
            drain_method: DrainMethod::Statistical,
            tolerance: 5.0,
            relative_tolerance: 0.05,
            absolute_tolerance: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscrepancyCheckSettings {
    pub start_ts: i64,
    pub end_ts: i64,
    pub policy: PolicyKind,
    pub drain_method: DrainMethod,
}

impl Default for DiscrepancyCheckSettings {
    fn default() -> Self {
        Self {
            start_ts: 1761800400,
            end_ts: 1762754340,
            policy: PolicyKind::RelativeBlend,
            drain_method: DrainMethod::RawDrop,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawAnalysisConfig {
    sources: SourceSettings,
    detector: DetectorSettings,
    raw_drop: RawDropSettings,
    reconcile: ReconcileSettings,
    discrepancy_check: DiscrepancyCheckSettings,
    windows: Option<BTreeMap<String, DateWindow>>,
}

/// Fully resolved settings for one process.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub sources: SourceSettings,
    pub detector: DetectorSettings,
    pub raw_drop: RawDropSettings,
    pub reconcile: ReconcileSettings,
    pub discrepancy_check: DiscrepancyCheckSettings,
    pub windows: DateWindowTable,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sources: SourceSettings::default(),
            detector: DetectorSettings::default(),
            raw_drop: RawDropSettings::default(),
            reconcile: ReconcileSettings::default(),
            discrepancy_check: DiscrepancyCheckSettings::default(),
            windows: DateWindowTable::builtin(),
        }
    }
}

impl AnalysisConfig {
    /// Deserialize from a merged config document and validate it.
    pub fn from_json(v: &Value) -> Result<Self> {
        let raw: RawAnalysisConfig = if v.is_null() {
            RawAnalysisConfig::default()
        } else {
            serde_json::from_value(v.clone()).context("invalid analysis config")?
        };

        let windows = match raw.windows {
            Some(map) => DateWindowTable::from_config_map(&map)?,
            None => DateWindowTable::builtin(),
        };

        let cfg = Self {
            sources: raw.sources,
            detector: raw.detector,
            raw_drop: raw.raw_drop,
            reconcile: raw.reconcile,
            discrepancy_check: raw.discrepancy_check,
            windows,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Replace `sources.base_url` when an override (e.g. `CW_BASE_URL`) is set.
    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.sources.base_url = url.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.base_url.trim().is_empty() {
            bail!("sources.base_url must not be empty");
        }
        if self.sources.timeout_secs == 0 {
            bail!("sources.timeout_secs must be > 0");
        }
        check_non_negative("detector.std_multiplier", self.detector.std_multiplier)?;
        if self.detector.min_duration == 0 {
            bail!("detector.min_duration must be >= 1");
        }
        check_non_negative("raw_drop.drop_threshold", self.raw_drop.drop_threshold)?;
        check_non_negative("reconcile.tolerance", self.reconcile.tolerance)?;
        check_non_negative(
            "reconcile.relative_tolerance",
            self.reconcile.relative_tolerance,
        )?;
        check_non_negative(
            "reconcile.absolute_tolerance",
            self.reconcile.absolute_tolerance,
        )?;
        if self.discrepancy_check.start_ts > self.discrepancy_check.end_ts {
            bail!(
                "discrepancy_check.start_ts ({}) must not be after end_ts ({})",
                self.discrepancy_check.start_ts,
                self.discrepancy_check.end_ts
            );
        }
        Ok(())
    }
}

fn check_non_negative(name: &str, v: f64) -> Result<()> {
    if !v.is_finite() || v < 0.0 {
        bail!("{name} must be a finite number >= 0, got {v}");
    }
    Ok(())
}
