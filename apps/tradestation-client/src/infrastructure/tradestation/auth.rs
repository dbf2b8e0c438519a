//! OAuth access-token lifecycle.
//!
//! One refresh is in flight at a time. Callers that queued behind it re-check
//! the cached token after acquiring the gate and reuse the fresh one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::Mutex;

use super::api_types::TokenResponse;
use super::config::Credentials;
use super::http_client::{TradeStationHttpClient, error_message};
use crate::error::ClientError;
use crate::infrastructure::metrics;

/// Bearer token plus the instant it was issued.
///
/// A refresh produces a new value; existing clones are never mutated.
#[derive(Clone)]
pub struct AccessToken {
    secret: Arc<str>,
    refreshed_at: Instant,
    generation: u64,
}

impl AccessToken {
    /// Raw bearer value.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// When the token was obtained.
    #[must_use]
    pub const fn refreshed_at(&self) -> Instant {
        self.refreshed_at
    }

    /// Refresh sequence number; 1 for the first token of a manager.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true if the token is younger than `window`.
    #[must_use]
    pub fn is_fresh(&self, window: Duration) -> bool {
        self.refreshed_at.elapsed() < window
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.generation == other.generation && self.secret == other.secret
    }
}

impl Eq for AccessToken {}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("refreshed_at", &self.refreshed_at)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Owns the current access token and serializes refreshes.
#[derive(Debug)]
pub struct TokenManager {
    http: TradeStationHttpClient,
    token_url: String,
    credentials: Credentials,
    freshness: Duration,
    current: RwLock<Option<AccessToken>>,
    gate: Mutex<()>,
    generation: AtomicU64,
}

impl TokenManager {
    /// Create a manager with no token yet.
    #[must_use]
    pub fn new(
        http: TradeStationHttpClient,
        token_url: String,
        credentials: Credentials,
        freshness: Duration,
    ) -> Self {
        Self {
            http,
            token_url,
            credentials,
            freshness,
            current: RwLock::new(None),
            gate: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Return a fresh token, refreshing if needed or if `force` is set.
    ///
    /// Concurrent callers share a single refresh.
    pub async fn ensure_token(&self, force: bool) -> Result<AccessToken, ClientError> {
        let observed = {
            let current = self.current.read();
            if !force
                && let Some(token) = current.as_ref()
                && token.is_fresh(self.freshness)
            {
                return Ok(token.clone());
            }
            current.as_ref().map_or(0, AccessToken::generation)
        };

        let _guard = self.http.cancellable(async { Ok(self.gate.lock().await) }).await?;

        if let Some(token) = self.current.read().as_ref() {
            let replaced_while_waiting = token.generation != observed;
            if replaced_while_waiting || (!force && token.is_fresh(self.freshness)) {
                return Ok(token.clone());
            }
        }

        let token = self.refresh().await?;
        *self.current.write() = Some(token.clone());
        Ok(token)
    }

    /// Cached token without refreshing, if any.
    #[must_use]
    pub fn current(&self) -> Option<AccessToken> {
        self.current.read().clone()
    }

    async fn refresh(&self) -> Result<AccessToken, ClientError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.credentials.api_key()),
            ("client_secret", self.credentials.api_secret()),
            ("refresh_token", self.credentials.refresh_token()),
        ];

        let (status, body) = self.http.post_form(&self.token_url, &form).await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Token refresh rejected");
            return Err(ClientError::Authentication(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_message(status, &body)
            )));
        }

        let response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ClientError::Authentication(format!("malformed token response: {e}"))
        })?;
        let secret = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Authentication("token response missing access_token".into()))?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_token_refresh();
        tracing::info!(
            generation,
            expires_in = response.expires_in,
            "Refreshed access token"
        );

        Ok(AccessToken {
            secret: Arc::from(secret),
            refreshed_at: Instant::now(),
            generation,
        })
    }
}
