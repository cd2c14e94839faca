//! HTTP source against a local mock server (no real network).
//!
//! GREEN when:
//! - level windows are requested with start_date/end_date epoch params
//! - ticket payloads in the `transport_tickets` envelope are unwrapped
//! - non-2xx maps to SourceError::Status, slow upstream to Transport
//! - a non-array level body is a Decode error

use std::time::Duration;

use cw_config::SourceSettings;
use cw_md::{decode_level_entries, decode_tickets, HttpSource, LevelSource, SourceError, TicketSource};
use httpmock::prelude::*;
use serde_json::json;

fn settings(base_url: String, timeout_secs: u64) -> SourceSettings {
    SourceSettings {
        base_url,
        data_path: "/api/Data".to_string(),
        tickets_path: "/api/Tickets".to_string(),
        timeout_secs,
    }
}

#[tokio::test]
async fn level_window_is_fetched_with_epoch_params() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/Data")
                .query_param("start_date", "1761782400")
                .query_param("end_date", "1761868740");
            then.status(200).json_body(json!([
                {"timestamp": "2025-10-30T00:00:00+00:00", "cauldron_levels": {"cauldron_001": 120.5, "cauldron_002": 80.0}},
                {"timestamp": "2025-10-30T00:01:00+00:00", "cauldron_levels": {"cauldron_001": 121.0, "cauldron_002": 80.4}}
            ]));
        })
        .await;

    let src = HttpSource::new(&settings(server.base_url(), 5)).unwrap();
    let entries = src.fetch_levels(1761782400, 1761868740).await.unwrap();
    mock.assert_async().await;

    assert_eq!(entries.len(), 2);
    let decoded = decode_level_entries(&entries);
    assert_eq!(decoded.readings.len(), 4);
    assert_eq!(decoded.readings[0].vessel_id, "cauldron_001");
    assert_eq!(decoded.readings[0].timestamp.timestamp(), 1761782400);
}

#[tokio::test]
async fn tickets_envelope_is_unwrapped() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/Tickets");
            then.status(200).json_body(json!({
                "metadata": {"total_tickets": 2},
                "transport_tickets": [
                    {"ticket_id": "TT_1", "cauldron_id": "cauldron_001", "amount_collected": 55.2, "courier_id": "courier_1", "date": "2025-10-30"},
                    {"ticket_id": "TT_2", "cauldron_id": "cauldron_002", "amount_collected": 40, "courier_id": "courier_2", "date": "2025-10-31T00:00:00"}
                ]
            }));
        })
        .await;

    let src = HttpSource::new(&settings(server.base_url(), 5)).unwrap();
    let raw = src.fetch_tickets().await.unwrap();
    let decoded = decode_tickets(&raw);

    assert_eq!(decoded.skipped, 0);
    assert_eq!(decoded.records.len(), 2);
    assert_eq!(decoded.records[1].vessel_id, "cauldron_002");
    assert_eq!(decoded.records[1].date.to_string(), "2025-10-31");
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/Tickets");
            then.status(503);
        })
        .await;

    let src = HttpSource::new(&settings(server.base_url(), 5)).unwrap();
    let err = src.fetch_tickets().await.unwrap_err();
    match err {
        SourceError::Status { code, ref url } => {
            assert_eq!(code, 503);
            assert!(url.ends_with("/api/Tickets"));
        }
        other => panic!("expected Status, got {other:?}"),
    }
    assert!(err.is_transport());
}

#[tokio::test]
async fn slow_upstream_hits_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/Data");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!([]));
        })
        .await;

    let src = HttpSource::new(&settings(server.base_url(), 1)).unwrap();
    let err = src.fetch_levels(0, 60).await.unwrap_err();
    assert!(matches!(err, SourceError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn object_level_body_is_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/Data");
            then.status(200).json_body(json!({"error": "bad window"}));
        })
        .await;

    let src = HttpSource::new(&settings(server.base_url(), 5)).unwrap();
    let err = src.fetch_levels(0, 60).await.unwrap_err();
    assert!(matches!(err, SourceError::Decode(_)), "got {err:?}");
}
