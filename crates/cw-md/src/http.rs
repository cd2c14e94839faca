//! reqwest-backed level and ticket source.
//!
//! One GET per call, bounded by `sources.timeout_secs`. No retries.

use std::time::Duration;

use cw_config::SourceSettings;
use cw_schemas::{RawLevelEntry, RawTicket};
use serde_json::Value;
use tracing::debug;

use crate::normalizer::{split_level_payload, split_ticket_payload};
use crate::source::{LevelSource, SourceError, TicketSource};

#[derive(Debug, Clone)]
pub struct HttpSource {
    http: reqwest::Client,
    base_url: String,
    data_path: String,
    tickets_path: String,
}

impl HttpSource {
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| SourceError::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            data_path: settings.data_path.clone(),
            tickets_path: settings.tickets_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn data_url(&self) -> String {
        self.url(&self.data_path)
    }

    pub fn tickets_url(&self) -> String {
        self.url(&self.tickets_path)
    }

    async fn get_json(&self, url: String, query: &[(&str, String)]) -> Result<Value, SourceError> {
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Transport(format!("GET {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                code: status.as_u16(),
                url,
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| SourceError::Decode(format!("GET {url} body is not json: {e}")))
    }
}

#[async_trait::async_trait]
impl LevelSource for HttpSource {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn fetch_levels(
        &self,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<RawLevelEntry>, SourceError> {
        let body = self
            .get_json(
                self.data_url(),
                &[
                    ("start_date", start_ts.to_string()),
                    ("end_date", end_ts.to_string()),
                ],
            )
            .await?;
        let entries = split_level_payload(body).map_err(SourceError::Decode)?;
        debug!(start_ts, end_ts, ticks = entries.len(), "level window fetched");
        Ok(entries)
    }
}

#[async_trait::async_trait]
impl TicketSource for HttpSource {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn fetch_tickets(&self) -> Result<Vec<RawTicket>, SourceError> {
        let body = self.get_json(self.tickets_url(), &[]).await?;
        let tickets = split_ticket_payload(body);
        debug!(tickets = tickets.len(), "tickets fetched");
        Ok(tickets)
    }
}
