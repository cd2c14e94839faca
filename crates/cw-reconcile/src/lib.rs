//! cw-reconcile
//!
//! Ticket aggregation and ticket-vs-drain reconciliation.
//!
//! - Tickets are summed per (vessel, date); zero sums are kept.
//! - Results cover the union of ticket keys and drain keys, sorted by key.
//! - Classification is delegated to a [`ReconciliationPolicy`]. Two exist
//!   and the caller picks one per report: [`FourStatePolicy`] treats
//!   zero vs non-zero as a hard gate, [`RelativeBlendPolicy`] accepts either
//!   a relative or an absolute tolerance.
//!
//! Deterministic, pure logic. No IO.

mod engine;
mod policy;
mod tickets;
mod types;

pub use engine::{reconcile, round_to};
pub use policy::{FourStatePolicy, ReconciliationPolicy, RelativeBlendPolicy, REL_EPSILON};
pub use tickets::{aggregate_tickets, ticket_amounts};
pub use types::*;
