//! cw-runtime
//!
//! Request validation and the three analysis pipelines:
//! - drain analysis: per-date detection report (`cauldron_data`)
//! - compare: tickets vs drains over a date range, lenient per-date loading
//! - discrepancy check: one strict window fetch, fatal on any failure
//!
//! Sources are injected as trait objects; nothing here knows about HTTP.

mod pipeline;
mod report;
mod request;

pub use pipeline::{policy_for, Pipeline, PipelineError};
pub use report::*;
pub use request::{
    generate_date_range, parse_date, parse_dates, AnalysisPlan, AnalyzeRequest, CompareRequest,
    RequestError,
};
