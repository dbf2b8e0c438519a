//! TradeStation Client Binary
//!
//! Streams live quotes (or five-minute bars) for the symbols given on the
//! command line and logs every record until interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tradestation-client -- AAPL MSFT
//! cargo run --bin tradestation-client -- --bars SPY
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `TS_API_KEY`, `TS_API_SECRET`: OAuth client credentials
//! - `TS_REFRESH_TOKEN`: Long-lived refresh token
//! - `TS_ACCOUNT_ID`: Brokerage account
//!
//! ## Optional
//! - `TS_BASE_URL`: OAuth host (default: <https://signin.tradestation.com>)
//! - `TS_API_URL`: API root (default: <https://api.tradestation.com/v3>)
//! - `TS_HTTP_TIMEOUT_SECS`, `TS_TOKEN_FRESHNESS_SECS`
//! - `TS_STREAM_RECONNECT_DELAY_INITIAL_MS`, `TS_STREAM_RECONNECT_DELAY_MAX_SECS`,
//!   `TS_STREAM_RECONNECT_DELAY_MULTIPLIER`
//! - `TS_METRICS_PORT`: Serve Prometheus metrics on `0.0.0.0:<port>/metrics`
//! - `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`, `RUST_LOG`

use anyhow::{Context, bail};
use futures::StreamExt;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tradestation_client::infrastructure::telemetry;
use tradestation_client::{MetricsConfig, TradeStationClient, TradeStationConfig, init_metrics};

/// Which stream to open per symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feed {
    Quotes,
    Bars,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let telemetry_guard = telemetry::init();

    let (feed, symbols) = parse_args(std::env::args().skip(1))?;
    tracing::info!(
        ?feed,
        symbols = ?symbols,
        otlp = telemetry_guard.is_exporting(),
        "Starting TradeStation client"
    );

    let _metrics_handle =
        init_metrics(&MetricsConfig::from_env()).context("failed to install metrics recorder")?;

    let config = TradeStationConfig::from_env().context("invalid TradeStation configuration")?;
    tracing::info!(
        account_id = %config.account_id,
        api_url = %config.api_url,
        timeout_secs = config.timeout.as_secs(),
        "Configuration loaded"
    );

    let shutdown_token = CancellationToken::new();
    let client = TradeStationClient::new(config, shutdown_token.clone())?;

    let mut tasks = JoinSet::new();
    for symbol in symbols {
        let client = client.clone();
        let cancel = shutdown_token.child_token();
        tasks.spawn(async move {
            match feed {
                Feed::Quotes => {
                    let mut quotes = client.stream_quotes(&symbol, cancel);
                    while let Some(quote) = quotes.next().await {
                        tracing::info!(
                            symbol = %quote.symbol,
                            last = ?quote.last,
                            bid = ?quote.bid,
                            ask = ?quote.ask,
                            mid = ?quote.mid(),
                            spread = ?quote.spread(),
                            "Quote"
                        );
                    }
                }
                Feed::Bars => {
                    let mut bars = client.stream_bars(&symbol, cancel);
                    while let Some(bar) = bars.next().await {
                        tracing::info!(
                            symbol = %symbol,
                            timestamp = %bar.timestamp,
                            open = %bar.open,
                            high = %bar.high,
                            low = %bar.low,
                            close = %bar.close,
                            volume = bar.volume,
                            "Bar"
                        );
                    }
                }
            }
        });
    }

    await_shutdown(shutdown_token).await;

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            tracing::warn!(error = %e, "Stream task failed");
        }
    }

    tracing::info!("TradeStation client stopped");
    Ok(())
}

fn parse_args(args: impl Iterator<Item = String>) -> anyhow::Result<(Feed, Vec<String>)> {
    let mut feed = Feed::Quotes;
    let mut symbols = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--bars" => feed = Feed::Bars,
            "--quotes" => feed = Feed::Quotes,
            flag if flag.starts_with('-') => bail!("unknown option {flag}"),
            symbol => symbols.push(symbol.to_uppercase()),
        }
    }
    if symbols.is_empty() {
        bail!("usage: tradestation-client [--bars] SYMBOL...");
    }
    Ok((feed, symbols))
}

/// Load `.env` from the working directory or its nearest ancestor.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for SIGINT or SIGTERM, then cancel every stream.
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }

    shutdown_token.cancel();
}
