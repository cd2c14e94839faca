//! cw-config
//!
//! Layered YAML configuration for the analysis workspace.
//!
//! - `load_layered_yaml*` merges YAML documents in order (later overrides
//!   earlier), canonicalises the result and hashes it so every report can be
//!   tied back to the exact settings that produced it.
//! - `settings` turns the merged JSON into a typed [`AnalysisConfig`].
//! - `audit` checks the merged document's keys against those settings.
//! - `windows` owns the supported-date lookup table used to bound per-date
//!   level fetches. It is loaded once and handed to the loader; nothing reads
//!   it as ambient state.

pub mod audit;
pub mod settings;
pub mod windows;

pub use audit::{audit_keys, ConfigMode, KeyAudit, Section, UnusedKeyPolicy};
pub use settings::{
    AnalysisConfig, DetectorSettings, DiscrepancyCheckSettings, DrainMethod, PolicyKind,
    RawDropSettings, ReconcileSettings, SourceSettings,
};
pub use windows::{DateWindow, DateWindowTable};

use std::fs;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// String values starting with any of these abort loading with
/// CONFIG_SECRET_DETECTED. Source credentials belong in the environment.
const SECRET_PREFIXES: &[&str] = &[
    "sk-", "sk_live", "sk_test", "AKIA", "-----BEGIN", "ghp_", "glpat-", "xoxb-",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// SHA-256 of `canonical_json`, hex encoded.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view of the merged document.
    pub fn analysis(&self) -> Result<AnalysisConfig> {
        AnalysisConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}")))
        .collect::<Result<Vec<String>>>()?;

    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let layer: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("config layer {i} is not valid yaml"))?;
        let layer = serde_json::to_value(layer)
            .with_context(|| format!("config layer {i} has non-json values"))?;
        overlay(&mut merged, layer);
    }

    if let Some(path) = find_secret(&merged, "") {
        bail!("CONFIG_SECRET_DETECTED key={path} value=REDACTED");
    }

    // serde_json's default Map keeps keys sorted, so this is independent of
    // key order in the source YAML.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; any other value replaces. A null layer (an
/// empty YAML document) changes nothing.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (k, v) in layer_map {
                overlay(base_map.entry(k).or_insert(Value::Null), v);
            }
        }
        (slot, v) => *slot = v,
    }
}

/// Dotted path of the first string that looks like a credential.
fn find_secret(v: &Value, path: &str) -> Option<String> {
    let child = |k: &str| {
        if path.is_empty() {
            k.to_string()
        } else {
            format!("{path}.{k}")
        }
    };
    match v {
        Value::String(s) => looks_like_secret(s).then(|| path.to_string()),
        Value::Object(m) => m.iter().find_map(|(k, vv)| find_secret(vv, &child(k))),
        Value::Array(a) => a
            .iter()
            .enumerate()
            .find_map(|(i, vv)| find_secret(vv, &child(&i.to_string()))),
        _ => None,
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_overlay_keeps_base() {
        let loaded = load_layered_yaml_from_strings(&["detector:\n  min_duration: 7\n", ""]).unwrap();
        assert_eq!(
            loaded.config_json.pointer("/detector/min_duration"),
            Some(&serde_json::json!(7))
        );
    }

    #[test]
    fn overlay_replaces_scalars_and_merges_sections() {
        let loaded = load_layered_yaml_from_strings(&[
            "detector:\n  min_duration: 7\n  workers: 2\n",
            "detector:\n  workers: 4\n",
        ])
        .unwrap();
        assert_eq!(
            loaded.config_json,
            serde_json::json!({"detector": {"min_duration": 7, "workers": 4}})
        );
    }

    #[test]
    fn secret_literal_is_rejected_with_its_path() {
        let err = load_layered_yaml_from_strings(&["sources:\n  token: \"ghp_abcdefghijkl\"\n"])
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("CONFIG_SECRET_DETECTED"));
        assert!(msg.contains("key=sources.token"));
        assert!(!msg.contains("ghp_abcdefghijkl"));
    }

    #[test]
    fn short_prefix_match_is_not_a_secret() {
        assert!(!looks_like_secret("sk-1"));
        assert!(looks_like_secret("AKIAABCDEFGH"));
    }
}
