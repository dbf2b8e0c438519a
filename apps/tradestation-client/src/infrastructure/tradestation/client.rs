//! TradeStation client handle.
//!
//! Cheap to clone; clones share the token cache, the ignore-set and the
//! cancellation token. Separate `new` calls share nothing.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::auth::{AccessToken, TokenManager};
use super::config::TradeStationConfig;
use super::http_client::TradeStationHttpClient;
use crate::application::ports::{
    BarQuery, BrokerageApi, Clock, ClosePositionRequest, OpenPositionRequest, SystemClock,
};
use crate::domain::{Balances, Bar, OrderAck, Position};
use crate::error::ClientError;

/// TradeStation v3 REST and streaming client.
#[derive(Clone)]
pub struct TradeStationClient {
    pub(super) inner: Arc<Inner>,
}

pub(super) struct Inner {
    pub(super) config: TradeStationConfig,
    pub(super) http: TradeStationHttpClient,
    pub(super) tokens: TokenManager,
    pub(super) ignored: Mutex<HashSet<String>>,
    pub(super) clock: Arc<dyn Clock>,
}

impl TradeStationClient {
    /// Create a client using the system clock.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the configuration does not validate, or
    /// `Network` if the HTTP client cannot be built.
    pub fn new(config: TradeStationConfig, cancel: CancellationToken) -> Result<Self, ClientError> {
        Self::with_clock(config, cancel, Arc::new(SystemClock))
    }

    /// Create a client with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`TradeStationClient::new`].
    pub fn with_clock(
        config: TradeStationConfig,
        cancel: CancellationToken,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ClientError> {
        config
            .validate()
            .map_err(|e| ClientError::invalid_argument(e.to_string()))?;

        let http = TradeStationHttpClient::new(&config, cancel)?;
        let tokens = TokenManager::new(
            http.clone(),
            config.token_url(),
            config.credentials.clone(),
            config.token_freshness,
        );

        tracing::debug!(
            account_id = %config.account_id,
            api_url = %config.api_url,
            "TradeStation client created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                tokens,
                ignored: Mutex::new(HashSet::new()),
                clock,
            }),
        })
    }

    /// Return a usable access token, refreshing when stale or when `force` is set.
    ///
    /// # Errors
    ///
    /// Returns `Authentication` if the refresh is rejected, or `Cancelled`.
    pub async fn ensure_token(&self, force: bool) -> Result<AccessToken, ClientError> {
        self.inner.tokens.ensure_token(force).await
    }

    /// Symbols skipped by historical intraday fetches after a failure, sorted.
    #[must_use]
    pub fn ignored_symbols(&self) -> Vec<String> {
        self.inner
            .ignored
            .lock()
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Cancellation token shared by every request of this client.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        self.inner.http.cancel_token()
    }

    /// Configuration the client was built with.
    #[must_use]
    pub fn config(&self) -> &TradeStationConfig {
        &self.inner.config
    }

    pub(super) fn is_ignored(&self, symbol: &str) -> bool {
        self.inner.ignored.lock().contains(symbol)
    }

    pub(super) fn ignore(&self, symbol: &str) {
        self.inner.ignored.lock().insert(symbol.to_string());
    }

    pub(super) fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    /// Authorized GET against an API path.
    pub(super) async fn api_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let token = self.ensure_token(false).await?;
        self.inner
            .http
            .get(&self.inner.config.api(path), query, &token)
            .await
    }
}

impl std::fmt::Debug for TradeStationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeStationClient")
            .field("account_id", &self.inner.config.account_id)
            .field("api_url", &self.inner.config.api_url)
            .field("ignored", &self.inner.ignored.lock().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BrokerageApi for TradeStationClient {
    async fn get_bars(&self, query: &BarQuery) -> Result<Vec<Bar>, ClientError> {
        Self::get_bars(self, query).await
    }

    async fn open_position(
        &self,
        request: &OpenPositionRequest,
    ) -> Result<Vec<OrderAck>, ClientError> {
        Self::open_position(self, request).await
    }

    async fn close_position(&self, request: &ClosePositionRequest) -> Result<(), ClientError> {
        Self::close_position(self, request).await
    }

    async fn get_positions(&self) -> Result<Vec<Position>, ClientError> {
        Self::get_positions(self).await
    }

    async fn get_balances(&self) -> Result<Balances, ClientError> {
        Self::get_balances(self).await
    }
}
