//! Config key audit.
//!
//! Keys are checked against the sections [`AnalysisConfig`] actually
//! deserializes, so the known-key list cannot drift from the typed settings.
//! Two findings come out of an audit:
//! - unknown keys: nothing reads them in any mode (usually a typo). These
//!   fail the load under [`UnusedKeyPolicy::Fail`].
//! - idle sections: known sections the current mode does not read. One
//!   shared file legitimately carries every section, so these are reported
//!   and never fail.
//!
//! [`AnalysisConfig`]: crate::AnalysisConfig

use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::settings::{
    DetectorSettings, DiscrepancyCheckSettings, RawDropSettings, ReconcileSettings,
    SourceSettings,
};
use crate::windows::DateWindow;

/// Which analysis path is about to consume the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    /// Ticket vs detected-drain comparison over a date range.
    Compare,
    /// Drain detection report only (no tickets).
    DrainAnalysis,
    /// Single-window ticket vs raw level-drop check.
    DiscrepancyCheck,
}

impl ConfigMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigMode::Compare => "COMPARE",
            ConfigMode::DrainAnalysis => "DRAIN_ANALYSIS",
            ConfigMode::DiscrepancyCheck => "DISCREPANCY_CHECK",
        }
    }

    /// Sections the runtime reads in this mode.
    pub fn sections(&self) -> &'static [Section] {
        match self {
            ConfigMode::Compare => &[
                Section::Sources,
                Section::Detector,
                Section::RawDrop,
                Section::Reconcile,
                Section::Windows,
            ],
            ConfigMode::DrainAnalysis => &[Section::Sources, Section::Detector, Section::Windows],
            ConfigMode::DiscrepancyCheck => &[
                Section::Sources,
                Section::Detector,
                Section::RawDrop,
                Section::Reconcile,
                Section::DiscrepancyCheck,
            ],
        }
    }
}

/// Top-level sections of the config document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Sources,
    Detector,
    RawDrop,
    Reconcile,
    DiscrepancyCheck,
    Windows,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Sources,
        Section::Detector,
        Section::RawDrop,
        Section::Reconcile,
        Section::DiscrepancyCheck,
        Section::Windows,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Section::Sources => "sources",
            Section::Detector => "detector",
            Section::RawDrop => "raw_drop",
            Section::Reconcile => "reconcile",
            Section::DiscrepancyCheck => "discrepancy_check",
            Section::Windows => "windows",
        }
    }

    fn from_key(key: &str) -> Option<Section> {
        Section::ALL.into_iter().find(|s| s.key() == key)
    }

    /// Field names of the section's settings struct. For `windows`, the
    /// fields of one date entry.
    fn fields(&self) -> Result<BTreeSet<String>> {
        let shape = match self {
            Section::Sources => serde_json::to_value(SourceSettings::default()),
            Section::Detector => serde_json::to_value(DetectorSettings::default()),
            Section::RawDrop => serde_json::to_value(RawDropSettings::default()),
            Section::Reconcile => serde_json::to_value(ReconcileSettings::default()),
            Section::DiscrepancyCheck => {
                serde_json::to_value(DiscrepancyCheckSettings::default())
            }
            Section::Windows => serde_json::to_value(DateWindow::new(0, 0)),
        }
        .with_context(|| format!("settings shape for section '{}'", self.key()))?;

        Ok(shape
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyAudit {
    pub mode: String,
    /// Dotted paths no section defines (sorted).
    pub unknown_keys: Vec<String>,
    /// Known sections present in the document that this mode does not read.
    pub idle_sections: Vec<String>,
}

impl KeyAudit {
    pub fn is_clean(&self) -> bool {
        self.unknown_keys.is_empty()
    }
}

/// Audit `doc` for `mode`. Under [`UnusedKeyPolicy::Fail`] unknown keys
/// are an error; idle sections never are.
pub fn audit_keys(mode: ConfigMode, doc: &Value, policy: UnusedKeyPolicy) -> Result<KeyAudit> {
    let mut unknown = Vec::new();
    let mut idle = Vec::new();

    if let Some(top) = doc.as_object() {
        for (key, body) in top {
            let Some(section) = Section::from_key(key) else {
                unknown.push(key.clone());
                continue;
            };
            if !mode.sections().contains(&section) {
                idle.push(key.clone());
            }

            let fields = section.fields()?;
            match (section, body.as_object()) {
                (Section::Windows, Some(dates)) => {
                    for (date, entry) in dates {
                        for field in stray_fields(entry, &fields) {
                            unknown.push(format!("windows.{date}.{field}"));
                        }
                    }
                }
                (_, Some(_)) => {
                    for field in stray_fields(body, &fields) {
                        unknown.push(format!("{key}.{field}"));
                    }
                }
                // Type errors are left to the typed load.
                (_, None) => {}
            }
        }
    }
    unknown.sort();

    let audit = KeyAudit {
        mode: mode.as_str().to_string(),
        unknown_keys: unknown,
        idle_sections: idle,
    };

    if policy == UnusedKeyPolicy::Fail && !audit.is_clean() {
        bail!(
            "CONFIG_UNKNOWN_KEYS (mode={}): {} key(s) no section reads: {:?}",
            audit.mode,
            audit.unknown_keys.len(),
            audit.unknown_keys.iter().take(12).collect::<Vec<_>>()
        );
    }
    Ok(audit)
}

fn stray_fields<'v>(body: &'v Value, known: &BTreeSet<String>) -> Vec<&'v str> {
    body.as_object()
        .map(|m| {
            m.keys()
                .filter(|k| !known.contains(k.as_str()))
                .map(String::as_str)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn section_fields_follow_settings_structs() {
        let fields = Section::Detector.fields().unwrap();
        assert!(fields.contains("std_multiplier"));
        assert!(fields.contains("min_duration"));
        assert!(fields.contains("workers"));
        assert_eq!(fields.len(), 3);

        let window = Section::Windows.fields().unwrap();
        assert_eq!(
            window.into_iter().collect::<Vec<_>>(),
            vec!["end".to_string(), "start".to_string()]
        );
    }

    #[test]
    fn every_mode_reads_sources() {
        for mode in [
            ConfigMode::Compare,
            ConfigMode::DrainAnalysis,
            ConfigMode::DiscrepancyCheck,
        ] {
            assert!(mode.sections().contains(&Section::Sources), "{}", mode.as_str());
        }
    }

    #[test]
    fn misspelled_field_is_unknown() {
        let doc = json!({"detector": {"min_durration": 3}});
        let audit = audit_keys(ConfigMode::DrainAnalysis, &doc, UnusedKeyPolicy::Warn).unwrap();
        assert_eq!(audit.unknown_keys, vec!["detector.min_durration".to_string()]);
        assert!(audit.idle_sections.is_empty());
    }

    #[test]
    fn non_object_section_is_left_to_typed_load() {
        let doc = json!({"reconcile": 5});
        let audit = audit_keys(ConfigMode::Compare, &doc, UnusedKeyPolicy::Fail).unwrap();
        assert!(audit.is_clean());
    }
}
