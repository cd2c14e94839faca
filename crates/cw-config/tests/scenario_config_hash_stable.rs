//! Config hash stability.
//!
//! GREEN when:
//! - the same layers hash identically across calls
//! - key order inside YAML does not change the hash
//! - different values produce different hashes
//! - overlays take effect and the merged hash is stable

use cw_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
sources:
  base_url: "https://levels.example"
  timeout_secs: 30
detector:
  std_multiplier: 3.0
  min_duration: 5
reconcile:
  tolerance: 5.0
"#;

const BASE_YAML_REORDERED: &str = r#"
reconcile:
  tolerance: 5.0
detector:
  min_duration: 5
  std_multiplier: 3.0
sources:
  timeout_secs: 30
  base_url: "https://levels.example"
"#;

const OVERLAY_YAML: &str = r#"
detector:
  min_duration: 3
reconcile:
  tolerance: 2.5
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash"
    );
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_base_and_reaches_typed_settings() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let again = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(loaded.config_hash, again.config_hash);

    let cfg = loaded.analysis().unwrap();
    assert_eq!(cfg.detector.min_duration, 3);
    assert!((cfg.detector.std_multiplier - 3.0).abs() < 1e-12);
    assert!((cfg.reconcile.tolerance - 2.5).abs() < 1e-12);
    assert_eq!(cfg.sources.base_url, "https://levels.example");
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}
