//! Prometheus Metrics Module
//!
//! # Metrics Categories
//!
//! - **Auth**: token refreshes
//! - **Requests**: REST calls and per-symbol fetch failures by operation
//! - **Streams**: records delivered and reconnects by stream kind
//!
//! Counters are no-ops until [`init_metrics`] installs a recorder.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Configuration
// =============================================================================

/// Metrics exporter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Address of the `/metrics` HTTP listener; `None` keeps metrics in-process.
    pub listen_addr: Option<SocketAddr>,
}

impl MetricsConfig {
    /// Read `TS_METRICS_PORT`; unset or unparseable disables the listener.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("TS_METRICS_PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .map(|port| SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
        Self { listen_addr }
    }
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure the exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install the recorder.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder and describe all metrics.
///
/// With a listen address, an HTTP exporter serving `/metrics` is spawned on
/// the current Tokio runtime. Subsequent calls return the handle installed by
/// the first.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or a global recorder is
/// already installed.
pub fn init_metrics(config: &MetricsConfig) -> Result<PrometheusHandle, MetricsError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = match config.listen_addr {
        Some(addr) => {
            let (recorder, exporter) = PrometheusBuilder::new()
                .with_http_listener(addr)
                .build()
                .map_err(|e| MetricsError::Configuration(e.to_string()))?;
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|e| MetricsError::Installation(e.to_string()))?;
            tokio::spawn(async move {
                if let Err(e) = exporter.await {
                    tracing::error!(error = ?e, "Prometheus exporter stopped");
                }
            });
            tracing::info!(%addr, "Prometheus metrics exporter started");
            handle
        }
        None => PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| MetricsError::Installation(e.to_string()))?,
    };

    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "tradestation_token_refreshes_total",
        "Successful OAuth refresh-token exchanges"
    );
    describe_counter!(
        "tradestation_requests_total",
        "REST requests issued, by operation"
    );
    describe_counter!(
        "tradestation_fetch_failures_total",
        "Failed fetches degraded to empty results, by operation"
    );
    describe_counter!(
        "tradestation_stream_reconnects_total",
        "Streaming reconnection attempts, by stream"
    );
    describe_counter!(
        "tradestation_stream_records_total",
        "Records delivered to stream consumers, by stream"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Operation label values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Single bar chart request.
    GetBars,
    /// Fixed 5-minute window per symbol/date pair.
    IntradayData,
    /// Date-range intraday fan-out.
    HistoricalIntraday,
    /// Today's 5-minute bars.
    CurrentDay,
    /// Daily bars.
    HistoricalDaily,
    /// Bracket entry.
    OpenPosition,
    /// Exit.
    ClosePosition,
    /// Positions query.
    Positions,
    /// Balances query.
    Balances,
}

impl Operation {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetBars => "get_bars",
            Self::IntradayData => "intraday_data",
            Self::HistoricalIntraday => "historical_intraday",
            Self::CurrentDay => "current_day",
            Self::HistoricalDaily => "historical_daily",
            Self::OpenPosition => "open_position",
            Self::ClosePosition => "close_position",
            Self::Positions => "positions",
            Self::Balances => "balances",
        }
    }
}

/// Stream label values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Bar chart stream.
    Bars,
    /// Quote stream.
    Quotes,
}

impl StreamKind {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bars => "bars",
            Self::Quotes => "quotes",
        }
    }
}

/// Record a successful token refresh.
pub fn record_token_refresh() {
    counter!("tradestation_token_refreshes_total").increment(1);
}

/// Record a REST request.
pub fn record_request(operation: Operation) {
    counter!("tradestation_requests_total", "operation" => operation.as_str()).increment(1);
}

/// Record a fetch that degraded to an empty result.
pub fn record_fetch_failure(operation: Operation) {
    counter!("tradestation_fetch_failures_total", "operation" => operation.as_str()).increment(1);
}

/// Record a streaming reconnection attempt.
pub fn record_reconnect(stream: StreamKind) {
    counter!("tradestation_stream_reconnects_total", "stream" => stream.as_str()).increment(1);
}

/// Record a record delivered to a stream consumer.
pub fn record_stream_record(stream: StreamKind) {
    counter!("tradestation_stream_records_total", "stream" => stream.as_str()).increment(1);
}

// =============================================================================
// Tests
// =============================================================================
