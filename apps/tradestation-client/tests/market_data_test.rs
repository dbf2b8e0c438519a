//! Market Data Fetcher Integration Tests
//!
//! Bar queries, capacity checks and multi-symbol fan-out against a mock
//! TradeStation API.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use rust_decimal_macros::dec;
use serde_json::json;
use test_case::test_case;
use tokio_util::sync::CancellationToken;
use tradestation_client::{
    BarQuery, BarUnit, BrokerOperation, ClientError, FixedClock, SymbolOutcome, TradeStationClient,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{SESSION_OPEN_NOW, bars_body, client, config, mount_token, requests_to};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test_case(Some(10), Some("2024-03-01".to_string()) ; "both windows")]
#[test_case(None, None ; "no window")]
fn bar_query_needs_exactly_one_window(bars_back: Option<u32>, first_date: Option<String>) {
    let err = BarQuery::new("AAPL", 5, BarUnit::Minute, bars_back, first_date, None).unwrap_err();
    assert!(err.is_usage_error());
}

#[tokio::test]
async fn operation_with_both_windows_makes_no_request() {
    let server = MockServer::start().await;
    let _client = client(&server).await;

    let err = BrokerOperation::parse(
        "tradestation_get_bars",
        json!({
            "symbol": "AAPL", "interval": 5, "unit": "Minute",
            "bars_back": 10, "firstdate": "2024-03-01"
        }),
    )
    .unwrap_err();

    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn get_bars_with_bars_back() {
    let server = MockServer::start().await;
    let client = client(&server).await;

    Mock::given(method("GET"))
        .and(path("/marketdata/barcharts/AAPL"))
        .and(header("authorization", "Bearer access-abc"))
        .and(header("accept", "application/json"))
        .and(query_param("interval", "5"))
        .and(query_param("unit", "Minute"))
        .and(query_param("barsback", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bars_body(&["100.25", "100.75"])))
        .expect(1)
        .mount(&server)
        .await;

    let query = BarQuery::new("AAPL", 5, BarUnit::Minute, Some(2), None, None).unwrap();
    let bars = client.get_bars(&query).await.unwrap();

    assert_eq!(bars.len(), 2);
    assert_eq!(bars[1].close, dec!(100.75));
    assert!(bars.iter().all(|b| b.symbol.as_deref() == Some("AAPL")));
}

#[tokio::test]
async fn get_bars_propagates_http_errors() {
    let server = MockServer::start().await;
    let client = client(&server).await;

    Mock::given(method("GET"))
        .and(path("/marketdata/barcharts/NOPE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "Error": "NotFound", "Message": "Symbol not found"
        })))
        .mount(&server)
        .await;

    let query = BarQuery::new("NOPE", 1, BarUnit::Daily, Some(5), None, None).unwrap();
    let err = client.get_bars(&query).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Http {
            status: 404,
            message: "Symbol not found".to_string()
        }
    );
}

#[tokio::test]
async fn malformed_bars_are_data_format_errors() {
    let server = MockServer::start().await;
    let client = client(&server).await;

    Mock::given(method("GET"))
        .and(path("/marketdata/barcharts/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Bars": [{"TimeStamp": "x"}]})))
        .mount(&server)
        .await;

    let query = BarQuery::new("AAPL", 1, BarUnit::Daily, Some(5), None, None).unwrap();
    assert!(matches!(
        client.get_bars(&query).await,
        Err(ClientError::DataFormat(_))
    ));
}

#[tokio::test]
async fn range_too_large_makes_no_request() {
    let server = MockServer::start().await;
    let client = client(&server).await;

    let err = client
        .get_historical_intraday_data(&["AAPL", "MSFT"], date(2024, 1, 1), Some(date(2024, 12, 31)), 1)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ClientError::RangeTooLarge {
            required: 262 * 390,
            limit: 57_600
        }
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn failing_symbol_is_isolated_then_skipped() {
    let server = MockServer::start().await;
    let client = client(&server).await;

    for symbol in ["AAPL", "MSFT"] {
        Mock::given(method("GET"))
            .and(path(format!("/marketdata/barcharts/{symbol}")))
            .and(query_param("interval", "5"))
            .and(query_param("unit", "Minute"))
            .and(query_param("firstdate", "2024-03-04"))
            .and(query_param("lastdate", "2024-03-08"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bars_body(&["100.10", "100.20"])))
            .expect(2)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/marketdata/barcharts/BAD"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;

    let symbols = ["AAPL", "BAD", "MSFT"];
    let first = client
        .get_historical_intraday_data(&symbols, date(2024, 3, 4), Some(date(2024, 3, 8)), 5)
        .await
        .unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first.bars_for("AAPL").len(), 2);
    assert_eq!(first.bars_for("MSFT").len(), 2);
    let failures: Vec<_> = first.failures().map(|(s, _)| s).collect();
    assert_eq!(failures, vec!["BAD"]);
    assert_eq!(client.ignored_symbols(), vec!["BAD"]);

    let second = client
        .get_historical_intraday_data(&symbols, date(2024, 3, 4), Some(date(2024, 3, 8)), 5)
        .await
        .unwrap();

    assert_eq!(second.results()[1].outcome, SymbolOutcome::Skipped);
    assert_eq!(second.skipped().collect::<Vec<_>>(), vec!["BAD"]);
    assert_eq!(second.all_bars().len(), 4);
    assert_eq!(requests_to(&server, "/marketdata/barcharts/BAD").await.len(), 1);
}

#[tokio::test]
async fn usage_errors_and_cancellation_do_not_ignore_symbols() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    let cancel = CancellationToken::new();
    let now = DateTime::parse_from_rfc3339(SESSION_OPEN_NOW).unwrap();
    let client =
        TradeStationClient::with_clock(config(&server), cancel.clone(), Arc::new(FixedClock(now)))
            .unwrap();

    let blank = client
        .get_historical_intraday_data(&["  "], date(2024, 3, 4), Some(date(2024, 3, 8)), 5)
        .await
        .unwrap();
    assert!(matches!(
        blank.failures().next(),
        Some((_, ClientError::InvalidArgument(_)))
    ));

    cancel.cancel();
    let cancelled = client
        .get_historical_intraday_data(&["AAPL"], date(2024, 3, 4), Some(date(2024, 3, 8)), 5)
        .await
        .unwrap();
    assert!(matches!(
        cancelled.failures().next(),
        Some(("AAPL", ClientError::Cancelled))
    ));

    assert!(client.ignored_symbols().is_empty());
    assert!(requests_to(&server, "/marketdata/barcharts/AAPL").await.is_empty());
}

#[tokio::test]
async fn historical_intraday_defaults_end_to_today() {
    let server = MockServer::start().await;
    let client = client(&server).await;

    Mock::given(method("GET"))
        .and(path("/marketdata/barcharts/SPY"))
        .and(query_param("firstdate", "2024-03-01"))
        .and(query_param("lastdate", "2024-03-04"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Bars": []})))
        .expect(1)
        .mount(&server)
        .await;

    let batch = client
        .get_historical_intraday_data(&["SPY"], date(2024, 3, 1), None, 1)
        .await
        .unwrap();
    assert!(batch.is_complete());
    assert!(batch.all_bars().is_empty());
}
