//! TradeStation v3 Adapter
//!
//! Implementation of `BrokerageApi` for TradeStation with:
//! - OAuth refresh-token exchange with single-flight refresh
//! - Bar chart fetches, including multi-symbol fan-out with per-symbol outcomes
//! - NDJSON bar and quote streams with exponential-backoff reconnect
//! - Bracket order placement, positions and balances

mod accounts;
mod api_types;
mod auth;
mod bars;
mod client;
mod config;
mod http_client;
mod market_data;
mod orders;
mod reconnect;
mod streaming;

pub use auth::AccessToken;
pub use bars::{parse_bar, parse_bars, parse_timestamp};
pub use client::TradeStationClient;
pub use config::{
    ConfigError, Credentials, DEFAULT_API_URL, DEFAULT_BASE_URL, StreamSettings,
    TradeStationConfig,
};
pub use reconnect::{BackoffConfig, ReconnectBackoff};
