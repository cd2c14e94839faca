//! Pipeline-backed commands: analyze, compare, check-discrepancies.
//!
//! Requests are validated before the HTTP source is built, so a bad
//! request never reaches the network.

use anyhow::{Context, Result};
use chrono::Utc;
use cw_config::ConfigMode;
use cw_md::HttpSource;
use cw_runtime::{AnalyzeRequest, CompareRequest, Pipeline};
use tracing::info;

use super::{load_config, write_report};

pub async fn run_analyze(
    config_paths: &[String],
    strict: bool,
    req: AnalyzeRequest,
    out: Option<String>,
) -> Result<()> {
    let (_, cfg) = load_config(config_paths, Some(ConfigMode::DrainAnalysis), strict)?;
    let (dates, params) = req.resolve(&cfg)?;

    let http = HttpSource::new(&cfg.sources).context("level source")?;
    info!(
        dates = dates.len(),
        std_multiplier = params.std_multiplier,
        min_duration = params.min_duration,
        "drain analysis starting"
    );

    let report = Pipeline::new(&cfg, &http, &http)
        .analyze_drains(&dates, params)
        .await;
    write_report(&report, out.as_deref())
}

pub async fn run_compare(
    config_paths: &[String],
    strict: bool,
    req: CompareRequest,
    out: Option<String>,
) -> Result<()> {
    let (_, cfg) = load_config(config_paths, Some(ConfigMode::Compare), strict)?;
    let plan = req.plan(&cfg, Utc::now().date_naive())?;

    let http = HttpSource::new(&cfg.sources).context("level/ticket source")?;
    info!(
        start = %plan.start_date,
        end = %plan.end_date,
        days = plan.dates.len(),
        "comparison starting"
    );

    let report = Pipeline::new(&cfg, &http, &http)
        .compare(&plan)
        .await
        .context("comparison failed")?;
    write_report(&report, out.as_deref())
}

pub async fn run_check_discrepancies(
    config_paths: &[String],
    strict: bool,
    out: Option<String>,
) -> Result<()> {
    let (_, cfg) = load_config(config_paths, Some(ConfigMode::DiscrepancyCheck), strict)?;

    let http = HttpSource::new(&cfg.sources).context("level/ticket source")?;
    let report = Pipeline::new(&cfg, &http, &http)
        .check_discrepancies()
        .await
        .context("discrepancy check failed")?;
    write_report(&report, out.as_deref())
}
