//! HTTP client wrapper: bearer authorization, status mapping, cancellation.

use std::future::Future;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::api_types::TradeStationErrorResponse;
use super::auth::AccessToken;
use super::config::TradeStationConfig;
use crate::error::ClientError;

/// HTTP client for the TradeStation API.
///
/// REST calls share a client with the configured timeout; streaming
/// connections use a second client without one.
#[derive(Debug, Clone)]
pub struct TradeStationHttpClient {
    client: Client,
    stream_client: Client,
    cancel: CancellationToken,
}

impl TradeStationHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &TradeStationConfig, cancel: CancellationToken) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let stream_client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            client,
            stream_client,
            cancel,
        })
    }

    /// Cancellation token every request is raced against.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Authorized GET returning a decoded JSON body.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: &AccessToken,
    ) -> Result<T, ClientError> {
        let request = authorized(self.client.get(url), token).query(query);
        self.execute(request).await
    }

    /// Authorized POST with a JSON body.
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
        token: &AccessToken,
    ) -> Result<T, ClientError> {
        let request = authorized(self.client.post(url), token).json(body);
        self.execute(request).await
    }

    /// Unauthenticated form POST; returns the status and raw body.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<(StatusCode, String), ClientError> {
        let request = self.client.post(url).header(ACCEPT, "application/json").form(form);
        self.cancellable(async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok((status, body))
        })
        .await
    }

    /// Open a long-lived authorized GET; fails on a non-success status.
    pub async fn open_stream(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: &AccessToken,
    ) -> Result<Response, ClientError> {
        let request = authorized(self.stream_client.get(url), token).query(query);
        self.cancellable(async {
            let response = request.send().await?;
            if response.status().is_success() {
                Ok(response)
            } else {
                Err(error_from_response(response).await)
            }
        })
        .await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        self.cancellable(async {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(error_from_response(response).await);
            }

            let text = response.text().await?;
            let body = if text.trim().is_empty() { "null" } else { text.as_str() };
            serde_json::from_str(body).map_err(|e| ClientError::data_format(e.to_string()))
        })
        .await
    }

    /// Run `fut` unless the client is cancelled first.
    pub async fn cancellable<T, F>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ClientError::Cancelled),
            result = fut => result,
        }
    }
}

fn authorized(request: RequestBuilder, token: &AccessToken) -> RequestBuilder {
    request
        .header(AUTHORIZATION, format!("Bearer {}", token.secret()))
        .header(ACCEPT, "application/json")
}

/// Map a non-success response to `ClientError::Http`.
async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::Http {
        status: status.as_u16(),
        message: error_message(status, &body),
    }
}

/// `Message` or `Error` from a JSON error body, else the raw body, else the reason phrase.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<TradeStationErrorResponse>(body)
        .ok()
        .and_then(TradeStationErrorResponse::into_message)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_from_json_body() {
        let msg = error_message(
            StatusCode::BAD_REQUEST,
            r#"{"Error":"BadRequest","Message":"Invalid interval"}"#,
        );
        assert_eq!(msg, "Invalid interval");
    }

    #[test]
    fn error_message_from_plain_body() {
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, " upstream down \n"), "upstream down");
    }

    #[test]
    fn error_message_falls_back_to_reason() {
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
        assert_eq!(error_message(StatusCode::UNAUTHORIZED, "{}"), "{}");
    }

    #[tokio::test]
    async fn cancelled_client_short_circuits() {
        let cancel = CancellationToken::new();
        let config = TradeStationConfig::new(
            super::super::config::Credentials::new("k", "s", "r"),
            "SIM1",
        );
        let http = TradeStationHttpClient::new(&config, cancel.clone()).unwrap();
        cancel.cancel();
        let result: Result<(), ClientError> = http
            .cancellable(std::future::pending::<Result<(), ClientError>>())
            .await;
        assert_eq!(result, Err(ClientError::Cancelled));
    }
}
