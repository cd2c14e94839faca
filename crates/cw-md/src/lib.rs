//! cw-md
//!
//! Level-data and ticket ingress.
//!
//! - `source`: the [`LevelSource`] / [`TicketSource`] boundary and its error type.
//! - `http`: reqwest-backed implementation of both sources.
//! - `normalizer`: raw wire shapes -> [`cw_schemas::LevelReading`] /
//!   [`cw_schemas::TicketRecord`], skipping malformed records.
//! - `loader`: per-date and single-window fetches bounded by the
//!   supported-date table, plus per-vessel reshaping.
//!
//! Nothing here retries. Retry policy belongs to whoever calls the loader.

pub mod http;
pub mod loader;
pub mod normalizer;
pub mod source;

pub use http::HttpSource;
pub use loader::{group_by_vessel, group_by_vessel_day, LoadedDays, TimeSeriesLoader};
pub use normalizer::{
    decode_level_entries, decode_tickets, parse_ticket_date, parse_timestamp, DecodedLevels,
    DecodedTickets,
};
pub use source::{LevelSource, SourceError, TicketSource};
