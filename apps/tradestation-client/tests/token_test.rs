//! Token Manager Integration Tests
//!
//! Refresh-token exchange against a mock OAuth endpoint: reuse within the
//! freshness window, refresh when stale or forced, single-flight refresh.

#![allow(clippy::unwrap_used)]

mod common;

use std::time::Duration;

use futures::future::join_all;
use serde_json::json;
use tradestation_client::ClientError;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{SESSION_OPEN_NOW, client_at, config, token_response};

#[tokio::test]
async fn token_is_reused_within_window() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("client_id=key"))
        .and(body_string_contains("refresh_token=refresh"))
        .respond_with(token_response())
        .expect(1)
        .mount(&server)
        .await;

    let client = client_at(config(&server), SESSION_OPEN_NOW);
    let first = client.ensure_token(false).await.unwrap();
    let second = client.ensure_token(false).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.secret(), "access-abc");
    assert_eq!(first.generation(), 1);
}

#[tokio::test]
async fn stale_token_is_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response())
        .expect(2)
        .mount(&server)
        .await;

    let client = client_at(
        config(&server).with_token_freshness(Duration::ZERO),
        SESSION_OPEN_NOW,
    );
    let first = client.ensure_token(false).await.unwrap();
    let second = client.ensure_token(false).await.unwrap();

    assert_eq!(first.generation(), 1);
    assert_eq!(second.generation(), 2);
    assert!(second.refreshed_at() >= first.refreshed_at());
}

#[tokio::test]
async fn force_refreshes_fresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response())
        .expect(2)
        .mount(&server)
        .await;

    let client = client_at(config(&server), SESSION_OPEN_NOW);
    client.ensure_token(false).await.unwrap();
    client.ensure_token(false).await.unwrap();
    let forced = client.ensure_token(true).await.unwrap();

    assert_eq!(forced.generation(), 2);
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response().set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_at(config(&server), SESSION_OPEN_NOW);
    let tokens = join_all((0..16).map(|_| {
        let client = client.clone();
        async move { client.ensure_token(false).await }
    }))
    .await;

    let tokens: Vec<_> = tokens.into_iter().map(Result::unwrap).collect();
    assert!(tokens.iter().all(|t| *t == tokens[0]));
    assert_eq!(tokens[0].generation(), 1);
}

#[tokio::test]
async fn rejected_refresh_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Unknown or invalid refresh token."
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_at(config(&server), SESSION_OPEN_NOW);
    let err = client.ensure_token(false).await.unwrap_err();
    let ClientError::Authentication(message) = err else {
        panic!("expected authentication error, got {err:?}");
    };
    assert!(message.starts_with("HTTP 401"));
    assert!(message.contains("invalid_grant"));

    // No cached token: the next call tries again.
    assert!(client.ensure_token(false).await.is_err());
}

#[tokio::test]
async fn response_without_access_token_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "Bearer"})))
        .mount(&server)
        .await;

    let client = client_at(config(&server), SESSION_OPEN_NOW);
    assert!(matches!(
        client.ensure_token(false).await,
        Err(ClientError::Authentication(_))
    ));
}

#[tokio::test]
async fn cancelled_client_does_not_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response())
        .expect(0)
        .mount(&server)
        .await;

    let client = client_at(config(&server), SESSION_OPEN_NOW);
    client.cancel_token().cancel();
    assert_eq!(client.ensure_token(false).await, Err(ClientError::Cancelled));
}
