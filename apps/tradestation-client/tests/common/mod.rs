//! Shared fixtures for integration tests against a mock TradeStation server.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tradestation_client::{Credentials, FixedClock, TradeStationClient, TradeStationConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCOUNT_ID: &str = "SIM1234567";

/// Monday 2024-03-04, 10:30 US Eastern (session open).
pub const SESSION_OPEN_NOW: &str = "2024-03-04T10:30:00-05:00";

/// Config pointing both hosts at the mock server.
pub fn config(server: &MockServer) -> TradeStationConfig {
    TradeStationConfig::new(Credentials::new("key", "secret", "refresh"), ACCOUNT_ID)
        .with_base_url(server.uri())
        .with_api_url(server.uri())
        .with_token_freshness(Duration::from_secs(600))
}

/// Client with a frozen clock.
pub fn client_at(config: TradeStationConfig, now: &str) -> TradeStationClient {
    let now = DateTime::parse_from_rfc3339(now).unwrap();
    TradeStationClient::with_clock(config, CancellationToken::new(), Arc::new(FixedClock(now)))
        .unwrap()
}

/// Client during regular hours with a mounted token endpoint.
pub async fn client(server: &MockServer) -> TradeStationClient {
    mount_token(server).await;
    client_at(config(server), SESSION_OPEN_NOW)
}

/// Token endpoint that always succeeds.
pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response())
        .mount(server)
        .await;
}

pub fn token_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": "access-abc",
        "expires_in": 1200,
        "token_type": "Bearer"
    }))
}

/// One bar chart element.
pub fn bar(timestamp: &str, close: &str) -> Value {
    json!({
        "TimeStamp": timestamp,
        "Open": "100.00",
        "High": "101.50",
        "Low": "99.75",
        "Close": close,
        "TotalVolume": "12500"
    })
}

/// `{"Bars": [...]}` with one bar per close price.
pub fn bars_body(closes: &[&str]) -> Value {
    let bars: Vec<Value> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| bar(&format!("2024-03-04T14:{:02}:00Z", 30 + 5 * i), close))
        .collect();
    json!({ "Bars": bars })
}

/// Requests the server saw for `path`.
pub async fn requests_to(server: &MockServer, path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == path)
        .collect()
}
