//! Command handler modules for cwr.
//!
//! Shared config, request and output helpers live here. Pipeline-backed
//! commands live in `analysis`.

pub mod analysis;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cw_config::{audit_keys, AnalysisConfig, ConfigMode, LoadedConfig, UnusedKeyPolicy};
use cw_runtime::CompareRequest;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Used when no `--config` is given and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

/// Overrides `sources.base_url`.
pub const ENV_BASE_URL: &str = "CW_BASE_URL";

/// Load layered config, audit its keys for `mode`, apply env overrides.
pub fn load_config(
    config_paths: &[String],
    mode: Option<ConfigMode>,
    strict: bool,
) -> Result<(LoadedConfig, AnalysisConfig)> {
    let loaded = if config_paths.is_empty() {
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            cw_config::load_layered_yaml(&[DEFAULT_CONFIG_PATH])?
        } else {
            cw_config::load_layered_yaml_from_strings(&[])?
        }
    } else {
        let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
        cw_config::load_layered_yaml(&path_refs)?
    };

    if let Some(mode) = mode {
        let policy = if strict {
            UnusedKeyPolicy::Fail
        } else {
            UnusedKeyPolicy::Warn
        };
        let audit = audit_keys(mode, &loaded.config_json, policy)?;
        if !audit.is_clean() {
            warn!(
                mode = audit.mode.as_str(),
                unknown_keys = ?audit.unknown_keys,
                "CONFIG_UNKNOWN_KEYS"
            );
        }
        if !audit.idle_sections.is_empty() {
            debug!(
                mode = audit.mode.as_str(),
                idle = ?audit.idle_sections,
                "config sections not read by this command"
            );
        }
    }

    let cfg = loaded
        .analysis()
        .context("config does not describe a valid analysis")?
        .with_base_url_override(std::env::var(ENV_BASE_URL).ok());

    info!(
        config_hash = loaded.config_hash.as_str(),
        base_url = cfg.sources.base_url.as_str(),
        "config loaded"
    );
    Ok((loaded, cfg))
}

/// Read a compare request body from a JSON file.
pub fn load_request_file(path: &str) -> Result<CompareRequest> {
    let bytes = fs::read(path).with_context(|| format!("read request-file failed: {}", path))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    let raw = String::from_utf8(bytes.to_vec()).context("request-file must be UTF-8 text")?;
    let req = CompareRequest::from_json(raw.trim())
        .with_context(|| format!("request-file {} is not a valid compare request", path))?;
    Ok(req)
}

/// Pretty JSON to `out`, or to stdout when no path is given.
pub fn write_report<T: Serialize>(report: &T, out: Option<&str>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("report serialize failed")?;
    match out {
        Some(path) => {
            fs::write(path, json.as_bytes())
                .with_context(|| format!("write report failed: {}", path))?;
            println!("report_written=true path={}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
