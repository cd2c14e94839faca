//! Analysis pipelines over injected level and ticket sources.
//!
//! Failure semantics differ per pipeline:
//! - drain analysis never fails; a run that loads nothing reports
//!   `"No data fetched"`
//! - compare fails on ticket fetch errors and on an empty ticket set; level
//!   fetches degrade per date and every ticket key is reconciled
//! - discrepancy check fails on any fetch error

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use cw_config::{AnalysisConfig, DateWindow, DrainMethod, PolicyKind};
use cw_detect::{
    aggregate_raw_drops, split_days_by_vessel, volumes, DetectorParams, DrainAggregator,
    DrainVolumeMap,
};
use cw_md::{
    decode_tickets, group_by_vessel_day, LevelSource, SourceError, TicketSource, TimeSeriesLoader,
};
use cw_reconcile::{
    aggregate_tickets, reconcile, ticket_amounts, FourStatePolicy, ReconciliationPolicy,
    RelativeBlendPolicy, TicketAmountMap, Tolerances,
};
use cw_schemas::{LevelReading, TicketRecord, VesselDayKey};
use tracing::{info, warn};

use crate::report::{
    ComparisonReport, DataGaps, DiscrepancyReport, DrainAnalysisReport, ReportConfiguration,
};
use crate::request::AnalysisPlan;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The ticket source failed.
    Tickets(SourceError),
    /// A strict level window fetch failed.
    Levels {
        start_ts: i64,
        end_ts: i64,
        source: SourceError,
    },
    /// The ticket source answered with no usable tickets.
    NoTicketData,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Tickets(e) => write!(f, "ticket fetch failed: {e}"),
            PipelineError::Levels {
                start_ts,
                end_ts,
                source,
            } => write!(f, "level fetch failed for window [{start_ts}, {end_ts}]: {source}"),
            PipelineError::NoTicketData => write!(f, "no ticket data available"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Tickets(e) => Some(e),
            PipelineError::Levels { source, .. } => Some(source),
            PipelineError::NoTicketData => None,
        }
    }
}

pub fn policy_for(kind: PolicyKind) -> Box<dyn ReconciliationPolicy> {
    match kind {
        PolicyKind::FourState => Box::new(FourStatePolicy),
        PolicyKind::RelativeBlend => Box::new(RelativeBlendPolicy),
    }
}

fn drain_volumes(
    groups: &BTreeMap<VesselDayKey, Vec<LevelReading>>,
    method: DrainMethod,
    params: DetectorParams,
    workers: usize,
    drop_threshold: f64,
) -> DrainVolumeMap {
    match method {
        DrainMethod::Statistical => volumes(
            &DrainAggregator::new(params)
                .with_workers(workers)
                .aggregate(groups),
        ),
        DrainMethod::RawDrop => aggregate_raw_drops(groups, drop_threshold),
    }
}

/// Ticket amounts for dates accepted by `keep`.
fn ticket_amounts_where(
    records: &[TicketRecord],
    keep: impl Fn(NaiveDate) -> bool,
) -> TicketAmountMap {
    let in_scope: Vec<TicketRecord> = records.iter().filter(|r| keep(r.date)).cloned().collect();
    ticket_amounts(&aggregate_tickets(&in_scope))
}

pub struct Pipeline<'a, L: LevelSource + ?Sized, T: TicketSource + ?Sized> {
    config: &'a AnalysisConfig,
    levels: &'a L,
    tickets: &'a T,
}

impl<'a, L: LevelSource + ?Sized, T: TicketSource + ?Sized> Pipeline<'a, L, T> {
    pub fn new(config: &'a AnalysisConfig, levels: &'a L, tickets: &'a T) -> Self {
        Self {
            config,
            levels,
            tickets,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.config
    }

    fn loader(&self) -> TimeSeriesLoader<'a, L> {
        let config: &'a AnalysisConfig = self.config;
        TimeSeriesLoader::new(self.levels, &config.windows)
    }

    async fn fetch_ticket_records(&self) -> Result<Vec<TicketRecord>, PipelineError> {
        let raw = self
            .tickets
            .fetch_tickets()
            .await
            .map_err(PipelineError::Tickets)?;
        let decoded = decode_tickets(&raw);
        if decoded.skipped > 0 {
            warn!(
                skipped = decoded.skipped,
                source = self.tickets.source_name(),
                "malformed tickets skipped"
            );
        }
        info!(tickets = decoded.records.len(), "tickets loaded");
        Ok(decoded.records)
    }

    /// Detect drains on each listed date and report per (vessel, date).
    pub async fn analyze_drains(
        &self,
        dates: &[NaiveDate],
        params: DetectorParams,
    ) -> DrainAnalysisReport {
        let loaded = self.loader().load_dates(dates).await;
        let gaps = DataGaps::from_loaded(&loaded);
        if loaded.is_empty() {
            warn!(requested = dates.len(), "no level data fetched for any date");
            return DrainAnalysisReport::no_data(dates.len(), gaps);
        }

        let aggregates = DrainAggregator::new(params)
            .with_workers(self.config.detector.workers)
            .aggregate(&split_days_by_vessel(&loaded.days));
        let report = DrainAnalysisReport::from_aggregates(&aggregates, dates.len(), gaps);
        info!(
            readings = loaded.total_readings(),
            vessel_days = report.cauldron_data.len(),
            events = report.summary.total_drain_events,
            volume = report.summary.total_volume_drained,
            "drain analysis done"
        );
        report
    }

    /// Tickets vs drain volumes. Levels are loaded for the plan's dates; the
    /// ticket side is the whole ticket set.
    pub async fn compare(&self, plan: &AnalysisPlan) -> Result<ComparisonReport, PipelineError> {
        let records = self.fetch_ticket_records().await?;
        if records.is_empty() {
            return Err(PipelineError::NoTicketData);
        }

        let loaded = self.loader().load_dates(&plan.dates).await;
        let groups = split_days_by_vessel(&loaded.days);
        let drains = drain_volumes(
            &groups,
            plan.drain_method,
            plan.detector,
            plan.workers,
            plan.drop_threshold,
        );

        // Every ticket key is reconciled, in range or not; tickets for dates
        // that were not analysed surface as having no detected drain.
        let tickets = ticket_amounts(&aggregate_tickets(&records));
        let policy = policy_for(plan.policy);
        let report = reconcile(&tickets, &drains, policy.as_ref(), &plan.tolerances);

        info!(
            start = %plan.start_date,
            end = %plan.end_date,
            policy = plan.policy.as_str(),
            drain_method = plan.drain_method.as_str(),
            comparisons = report.summary.total_comparisons,
            match_pct = report.summary.match_percentage,
            "comparison done"
        );

        Ok(ComparisonReport {
            summary: report.summary,
            results: report.results,
            configuration: ReportConfiguration {
                start_date: plan.start_date,
                end_date: plan.end_date,
                total_days: plan.dates.len(),
                std_multiplier: plan.detector.std_multiplier,
                min_duration: plan.detector.min_duration,
                tolerance: plan.tolerances.tolerance,
                policy: plan.policy.as_str().to_string(),
                drain_method: plan.drain_method.as_str().to_string(),
            },
            data_gaps: DataGaps::from_loaded(&loaded),
        })
    }

    /// One window, fetched strictly, grouped by each reading's UTC date.
    pub async fn check_discrepancies(&self) -> Result<DiscrepancyReport, PipelineError> {
        let dc = &self.config.discrepancy_check;
        let window = DateWindow::new(dc.start_ts, dc.end_ts);

        let records = self.fetch_ticket_records().await?;
        let readings = self
            .loader()
            .load_window(window.start, window.end)
            .await
            .map_err(|source| PipelineError::Levels {
                start_ts: window.start,
                end_ts: window.end,
                source,
            })?;

        let groups = group_by_vessel_day(&readings);
        let drains = drain_volumes(
            &groups,
            dc.drain_method,
            DetectorParams {
                std_multiplier: self.config.detector.std_multiplier,
                min_duration: self.config.detector.min_duration,
            },
            self.config.detector.workers,
            self.config.raw_drop.drop_threshold,
        );

        let first = DateTime::<Utc>::from_timestamp(window.start, 0).map(|t| t.date_naive());
        let last = DateTime::<Utc>::from_timestamp(window.end, 0).map(|t| t.date_naive());
        let tickets = ticket_amounts_where(&records, |d| {
            first.map_or(true, |f| d >= f) && last.map_or(true, |l| d <= l)
        });

        let tol = Tolerances {
            tolerance: self.config.reconcile.tolerance,
            relative_tolerance: self.config.reconcile.relative_tolerance,
            absolute_tolerance: self.config.reconcile.absolute_tolerance,
        };
        let policy = policy_for(dc.policy);
        let report = reconcile(&tickets, &drains, policy.as_ref(), &tol);

        info!(
            start_ts = window.start,
            end_ts = window.end,
            vessel_days = groups.len(),
            flagged = report.summary.total_comparisons - report.summary.matches,
            "discrepancy check done"
        );

        Ok(DiscrepancyReport {
            window,
            policy: dc.policy.as_str().to_string(),
            drain_method: dc.drain_method.as_str().to_string(),
            summary: report.summary,
            results: report.results,
        })
    }
}
