//! Request parsing and validation.
//!
//! Everything here runs before any fetch: a request that fails validation
//! never touches a source.

use std::fmt;

use chrono::NaiveDate;
use cw_config::{AnalysisConfig, DrainMethod, PolicyKind};
use cw_detect::DetectorParams;
use cw_reconcile::Tolerances;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Body is not a JSON object of the expected shape.
    MalformedBody(String),
    /// No target date was given.
    EmptyDates,
    InvalidDate(String),
    InvalidParam { name: &'static str, reason: String },
    /// The resolved range holds no dates (start after end).
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::MalformedBody(msg) => write!(f, "invalid or missing JSON body: {msg}"),
            RequestError::EmptyDates => write!(f, "please provide at least one date"),
            RequestError::InvalidDate(s) => write!(f, "invalid date '{s}', expected YYYY-MM-DD"),
            RequestError::InvalidParam { name, reason } => write!(f, "invalid {name}: {reason}"),
            RequestError::EmptyRange { start, end } => {
                write!(f, "empty date range: {start} is after {end}")
            }
        }
    }
}

impl std::error::Error for RequestError {}

pub fn parse_date(s: &str) -> Result<NaiveDate, RequestError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| RequestError::InvalidDate(s.to_string()))
}

/// Parse every date; an empty list is an error.
pub fn parse_dates(raw: &[String]) -> Result<Vec<NaiveDate>, RequestError> {
    if raw.is_empty() {
        return Err(RequestError::EmptyDates);
    }
    raw.iter().map(|s| parse_date(s)).collect()
}

/// Every calendar date from `start` through `end`, inclusive. Empty when
/// `start > end`.
pub fn generate_date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

fn non_negative(name: &'static str, v: f64) -> Result<f64, RequestError> {
    if !v.is_finite() || v < 0.0 {
        return Err(RequestError::InvalidParam {
            name,
            reason: format!("must be a finite number >= 0, got {v}"),
        });
    }
    Ok(v)
}

fn detector_params(
    std_multiplier: Option<f64>,
    min_duration: Option<i64>,
    cfg: &AnalysisConfig,
) -> Result<DetectorParams, RequestError> {
    let std_multiplier = non_negative(
        "std_multiplier",
        std_multiplier.unwrap_or(cfg.detector.std_multiplier),
    )?;
    let min_duration = match min_duration {
        None => cfg.detector.min_duration,
        Some(n) if n >= 1 => n as usize,
        Some(n) => {
            return Err(RequestError::InvalidParam {
                name: "min_duration",
                reason: format!("must be >= 1, got {n}"),
            })
        }
    };
    Ok(DetectorParams {
        std_multiplier,
        min_duration,
    })
}

fn from_json_object<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, RequestError> {
    let v: Value =
        serde_json::from_str(body).map_err(|e| RequestError::MalformedBody(e.to_string()))?;
    if !v.is_object() {
        return Err(RequestError::MalformedBody(
            "expected a JSON object".to_string(),
        ));
    }
    serde_json::from_value(v).map_err(|e| RequestError::MalformedBody(e.to_string()))
}

/// Body of a tickets-vs-drains comparison.
///
/// ```json
/// {"dates_to_analyze": ["2025-10-30", "2025-10-31"], "std_multiplier": 3.0,
///  "min_duration": 5, "tolerance": 5.0}
/// ```
///
/// One date means "from that date through today". Two or more mean the
/// range between the earliest and the latest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub dates_to_analyze: Vec<String>,
    #[serde(default)]
    pub std_multiplier: Option<f64>,
    #[serde(default)]
    pub min_duration: Option<i64>,
    #[serde(default)]
    pub tolerance: Option<f64>,
    /// `four_state` | `relative_blend`
    #[serde(default)]
    pub policy: Option<String>,
    /// `statistical` | `raw_drop`
    #[serde(default)]
    pub drain_method: Option<String>,
}

/// A validated comparison: concrete dates and parameters, config defaults
/// filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPlan {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dates: Vec<NaiveDate>,
    pub detector: DetectorParams,
    pub workers: usize,
    pub drop_threshold: f64,
    pub tolerances: Tolerances,
    pub policy: PolicyKind,
    pub drain_method: DrainMethod,
}

impl CompareRequest {
    pub fn from_json(body: &str) -> Result<Self, RequestError> {
        from_json_object(body)
    }

    /// Validate against `cfg`. `today` closes a single-date range.
    pub fn plan(&self, cfg: &AnalysisConfig, today: NaiveDate) -> Result<AnalysisPlan, RequestError> {
        let mut dates = parse_dates(&self.dates_to_analyze)?;
        dates.sort();

        let (start_date, end_date) = match dates.as_slice() {
            [only] => (*only, today),
            [first, .., last] => (*first, *last),
            [] => return Err(RequestError::EmptyDates),
        };
        let range = generate_date_range(start_date, end_date);
        if range.is_empty() {
            return Err(RequestError::EmptyRange {
                start: start_date,
                end: end_date,
            });
        }

        let detector = detector_params(self.std_multiplier, self.min_duration, cfg)?;
        let tolerance = non_negative(
            "tolerance",
            self.tolerance.unwrap_or(cfg.reconcile.tolerance),
        )?;

        let policy = match &self.policy {
            Some(s) => PolicyKind::parse(s).map_err(|e| RequestError::InvalidParam {
                name: "policy",
                reason: e.to_string(),
            })?,
            None => cfg.reconcile.policy,
        };
        let drain_method = match &self.drain_method {
            Some(s) => DrainMethod::parse(s).map_err(|e| RequestError::InvalidParam {
                name: "drain_method",
                reason: e.to_string(),
            })?,
            None => cfg.reconcile.drain_method,
        };

        Ok(AnalysisPlan {
            start_date,
            end_date,
            dates: range,
            detector,
            workers: cfg.detector.workers,
            drop_threshold: cfg.raw_drop.drop_threshold,
            tolerances: Tolerances {
                tolerance,
                relative_tolerance: cfg.reconcile.relative_tolerance,
                absolute_tolerance: cfg.reconcile.absolute_tolerance,
            },
            policy,
            drain_method,
        })
    }
}

/// Body of a drain analysis. Dates are analysed as listed, not expanded to
/// a range. `all_dates` asks for every supported date instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub all_dates: bool,
    #[serde(default)]
    pub std_multiplier: Option<f64>,
    #[serde(default)]
    pub min_duration: Option<i64>,
}

impl AnalyzeRequest {
    pub fn from_json(body: &str) -> Result<Self, RequestError> {
        from_json_object(body)
    }

    pub fn resolve(
        &self,
        cfg: &AnalysisConfig,
    ) -> Result<(Vec<NaiveDate>, DetectorParams), RequestError> {
        let dates = if self.all_dates {
            if !self.dates.is_empty() {
                return Err(RequestError::InvalidParam {
                    name: "dates",
                    reason: "explicit dates cannot be combined with all_dates".to_string(),
                });
            }
            cfg.windows.dates().collect()
        } else {
            parse_dates(&self.dates)?
        };
        let params = detector_params(self.std_multiplier, self.min_duration, cfg)?;
        Ok((dates, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn range_is_inclusive() {
        let r = generate_date_range(d("2025-10-30"), d("2025-11-02"));
        assert_eq!(r.len(), 4);
        assert_eq!(r[0], d("2025-10-30"));
        assert_eq!(r[3], d("2025-11-02"));
        assert_eq!(generate_date_range(d("2025-10-30"), d("2025-10-30")).len(), 1);
        assert!(generate_date_range(d("2025-10-31"), d("2025-10-30")).is_empty());
    }

    #[test]
    fn dates_are_strict_iso() {
        assert!(parse_date(" 2025-10-30 ").is_ok());
        assert_eq!(
            parse_date("10/30/2025"),
            Err(RequestError::InvalidDate("10/30/2025".to_string()))
        );
        assert_eq!(parse_dates(&[]), Err(RequestError::EmptyDates));
    }

    #[test]
    fn malformed_bodies_rejected() {
        assert!(matches!(
            CompareRequest::from_json("not json"),
            Err(RequestError::MalformedBody(_))
        ));
        assert!(matches!(
            CompareRequest::from_json("[1, 2]"),
            Err(RequestError::MalformedBody(_))
        ));
        assert!(matches!(
            CompareRequest::from_json(r#"{"dates_to_analyze": "2025-10-30"}"#),
            Err(RequestError::MalformedBody(_))
        ));
    }

    #[test]
    fn analyze_without_dates_is_rejected() {
        let cfg = AnalysisConfig::default();
        assert_eq!(
            AnalyzeRequest::default().resolve(&cfg),
            Err(RequestError::EmptyDates)
        );
    }

    #[test]
    fn analyze_all_dates_uses_window_table() {
        let cfg = AnalysisConfig::default();
        let req = AnalyzeRequest {
            all_dates: true,
            ..AnalyzeRequest::default()
        };
        let (dates, params) = req.resolve(&cfg).unwrap();
        assert_eq!(dates.len(), cfg.windows.len());
        assert_eq!(params, DetectorParams::default());

        let mixed = AnalyzeRequest {
            dates: vec!["2025-10-30".to_string()],
            all_dates: true,
            ..AnalyzeRequest::default()
        };
        assert!(matches!(
            mixed.resolve(&cfg),
            Err(RequestError::InvalidParam { name: "dates", .. })
        ));
    }
}
