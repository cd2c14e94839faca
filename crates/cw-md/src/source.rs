//! Source boundary for level and ticket ingestion.
//!
//! Defines only the traits and the error type. Concrete transports live in
//! `http.rs`; turning raw shapes into readings is `normalizer.rs`.

use std::fmt;

use cw_schemas::{RawLevelEntry, RawTicket};

/// Errors a source implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Network failure or timeout.
    Transport(String),
    /// The upstream answered with a non-2xx status.
    Status { code: u16, url: String },
    /// The response body could not be decoded.
    Decode(String),
    /// The source could not be constructed from its settings.
    Config(String),
}

impl SourceError {
    /// `true` for failures of the transport itself (network, timeout, non-2xx).
    pub fn is_transport(&self) -> bool {
        matches!(self, SourceError::Transport(_) | SourceError::Status { .. })
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Transport(msg) => write!(f, "transport error: {msg}"),
            SourceError::Status { code, url } => write!(f, "http status {code} from {url}"),
            SourceError::Decode(msg) => write!(f, "decode error: {msg}"),
            SourceError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Upstream level-data contract.
///
/// One [`RawLevelEntry`] is one sampling tick across every vessel.
#[async_trait::async_trait]
pub trait LevelSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Fetch every tick in the inclusive `[start_ts, end_ts]` epoch-second window.
    async fn fetch_levels(
        &self,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<RawLevelEntry>, SourceError>;
}

/// Upstream transport-ticket contract.
#[async_trait::async_trait]
pub trait TicketSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_tickets(&self) -> Result<Vec<RawTicket>, SourceError>;
}
