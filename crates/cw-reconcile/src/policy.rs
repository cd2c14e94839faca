//! Reconciliation policies.
//!
//! A policy only classifies. Rounding, key iteration and summary counts
//! belong to the engine, so both policies produce reports of the same shape.

use crate::types::{ReconcileStatus, Tolerances};

/// Floor for the relative-difference denominator.
pub const REL_EPSILON: f64 = 1e-6;

pub trait ReconciliationPolicy: Send + Sync {
    /// Stable name reported in summaries.
    fn name(&self) -> &'static str;

    /// Classify one (vessel, date) pair. Absent sides arrive as 0.0.
    fn classify(&self, ticket_amount: f64, drain_volume: f64, tol: &Tolerances)
        -> ReconcileStatus;

    /// Tolerance value echoed in the summary.
    fn tolerance_used(&self, tol: &Tolerances) -> f64;
}

/// Zero vs non-zero on either side is a hard gate; only when both sides are
/// positive does the absolute tolerance decide.
///
/// | ticket | drain | status |
/// |---|---|---|
/// | >0 | >0, diff <= tol | MATCH |
/// | >0 | >0, diff > tol | MISMATCH |
/// | >0 | 0 | DRAIN_NOT_DETECTED |
/// | 0 | >0 | TICKET_MISSING |
/// | 0 | 0 | NO_DATA |
#[derive(Debug, Clone, Copy, Default)]
pub struct FourStatePolicy;

impl ReconciliationPolicy for FourStatePolicy {
    fn name(&self) -> &'static str {
        "four_state"
    }

    fn classify(
        &self,
        ticket_amount: f64,
        drain_volume: f64,
        tol: &Tolerances,
    ) -> ReconcileStatus {
        let diff = (ticket_amount - drain_volume).abs();
        match (ticket_amount > 0.0, drain_volume > 0.0) {
            (true, true) if diff <= tol.tolerance => ReconcileStatus::Match,
            (true, true) => ReconcileStatus::Mismatch,
            (true, false) => ReconcileStatus::DrainNotDetected,
            (false, true) => ReconcileStatus::TicketMissing,
            (false, false) => ReconcileStatus::NoData,
        }
    }

    fn tolerance_used(&self, tol: &Tolerances) -> f64 {
        tol.tolerance
    }
}

/// OK when the pair agrees within the relative tolerance OR the absolute
/// one; otherwise the direction of the gap decides.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeBlendPolicy;

impl ReconciliationPolicy for RelativeBlendPolicy {
    fn name(&self) -> &'static str {
        "relative_blend"
    }

    fn classify(
        &self,
        ticket_amount: f64,
        drain_volume: f64,
        tol: &Tolerances,
    ) -> ReconcileStatus {
        let diff = (ticket_amount - drain_volume).abs();
        let rel = diff / drain_volume.max(REL_EPSILON);

        if rel <= tol.relative_tolerance || diff <= tol.absolute_tolerance {
            ReconcileStatus::Ok
        } else if ticket_amount > drain_volume {
            ReconcileStatus::OverReported
        } else if ticket_amount > 0.0 {
            ReconcileStatus::UnderReported
        } else {
            ReconcileStatus::MissingTicket
        }
    }

    fn tolerance_used(&self, tol: &Tolerances) -> f64 {
        tol.absolute_tolerance
    }
}
