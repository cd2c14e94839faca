//! Ticket Aggregator.

use std::collections::BTreeMap;

use cw_schemas::{TicketRecord, VesselDayKey};

use crate::types::{TicketAmountMap, TicketDayAggregate};

/// Sum ticket amounts per (vessel, date). Every key with at least one
/// ticket is kept, including zero sums.
pub fn aggregate_tickets(records: &[TicketRecord]) -> BTreeMap<VesselDayKey, TicketDayAggregate> {
    let mut out: BTreeMap<VesselDayKey, TicketDayAggregate> = BTreeMap::new();
    for r in records {
        let agg = out.entry(r.key()).or_insert_with(|| TicketDayAggregate {
            vessel_id: r.vessel_id.clone(),
            date: r.date,
            ticket_amount: 0.0,
            ticket_count: 0,
        });
        agg.ticket_amount += r.amount_collected;
        agg.ticket_count += 1;
    }
    out
}

pub fn ticket_amounts(aggregates: &BTreeMap<VesselDayKey, TicketDayAggregate>) -> TicketAmountMap {
    aggregates
        .iter()
        .map(|(k, a)| (k.clone(), a.ticket_amount))
        .collect()
}
