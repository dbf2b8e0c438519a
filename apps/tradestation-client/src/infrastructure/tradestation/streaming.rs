//! Newline-delimited JSON streams for bars and quotes.
//!
//! Each stream is backed by a spawned connection task feeding a bounded
//! channel. The task reconnects with backoff after end of stream, transport
//! failures or error records, and stops only when cancelled or when the
//! consumer drops the stream.

use futures::{Stream, StreamExt, TryStreamExt};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use super::bars::parse_bar;
use super::client::TradeStationClient;
use super::reconnect::{BackoffConfig, ReconnectBackoff};
use crate::domain::{Bar, Quote};
use crate::error::ClientError;
use crate::infrastructure::metrics::{self, StreamKind};

/// Longest line accepted from a stream.
const MAX_LINE_BYTES: usize = 1 << 20;

// =============================================================================
// Line Classification
// =============================================================================

/// What a single stream line turned out to be.
#[derive(Debug, PartialEq)]
enum Line<T> {
    /// Data record for the consumer.
    Record(T),
    /// Blank line, heartbeat or status message.
    Ignored,
    /// Line that could not be parsed; skipped.
    Invalid(String),
    /// Server-reported error; the connection is dropped.
    Error(String),
}

/// Static description of one stream type.
struct Feed<T> {
    kind: StreamKind,
    path: String,
    query: Vec<(&'static str, String)>,
    symbol: String,
    /// Field whose absence marks a control record. An `Error` field marks a
    /// failure whether or not this one is present.
    data_key: &'static str,
    parse: fn(Map<String, Value>, &str) -> Result<T, ClientError>,
}

impl<T> Feed<T> {
    fn classify(&self, line: &str) -> Line<T> {
        let line = line.trim();
        if line.is_empty() {
            return Line::Ignored;
        }

        let fields = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => return Line::Invalid("line is not a JSON object".to_string()),
            Err(e) => return Line::Invalid(e.to_string()),
        };

        if let Some(error) = fields.get("Error") {
            return Line::Error(control_error(error, fields.get("Message")));
        }
        if !fields.contains_key(self.data_key) {
            return Line::Ignored;
        }

        match (self.parse)(fields, &self.symbol) {
            Ok(record) => Line::Record(record),
            Err(e) => Line::Invalid(e.to_string()),
        }
    }
}

fn control_error(error: &Value, message: Option<&Value>) -> String {
    let text = |v: &Value| v.as_str().map_or_else(|| v.to_string(), str::to_string);
    match message {
        Some(message) => format!("{}: {}", text(error), text(message)),
        None => text(error),
    }
}

fn bar_record(fields: Map<String, Value>, symbol: &str) -> Result<Bar, ClientError> {
    parse_bar(&fields, symbol)
}

fn quote_record(fields: Map<String, Value>, _symbol: &str) -> Result<Quote, ClientError> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| ClientError::data_format(e.to_string()))
}

// =============================================================================
// Connection Loop
// =============================================================================

/// Why a connection ended.
#[derive(Debug)]
enum Disconnect {
    Cancelled,
    ConsumerGone,
    EndOfStream,
    Failed(ClientError),
}

impl TradeStationClient {
    /// Live five-minute bars for `symbol`.
    ///
    /// The stream ends only when `cancel` (or the client's own token) fires
    /// or the returned stream is dropped.
    pub fn stream_bars(
        &self,
        symbol: &str,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Bar> + Send + Unpin + 'static {
        self.spawn_feed(
            Feed {
                kind: StreamKind::Bars,
                path: format!("/marketdata/stream/barcharts/{symbol}"),
                query: vec![("interval", "5".to_string()), ("unit", "Minute".to_string())],
                symbol: symbol.to_string(),
                data_key: "High",
                parse: bar_record,
            },
            cancel,
        )
    }

    /// Live quotes for `symbol`. Same lifetime rules as [`Self::stream_bars`].
    pub fn stream_quotes(
        &self,
        symbol: &str,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Quote> + Send + Unpin + 'static {
        self.spawn_feed(
            Feed {
                kind: StreamKind::Quotes,
                path: format!("/marketdata/stream/quotes/{symbol}"),
                query: Vec::new(),
                symbol: symbol.to_string(),
                data_key: "Symbol",
                parse: quote_record,
            },
            cancel,
        )
    }

    fn spawn_feed<T: Send + 'static>(
        &self,
        feed: Feed<T>,
        cancel: CancellationToken,
    ) -> ReceiverStream<T> {
        let (tx, rx) = mpsc::channel(self.config().stream.channel_capacity.max(1));
        let client = self.clone();
        tokio::spawn(async move { client.run_feed(feed, tx, cancel).await });
        ReceiverStream::new(rx)
    }

    async fn run_feed<T: Send>(&self, feed: Feed<T>, tx: mpsc::Sender<T>, cancel: CancellationToken) {
        let mut backoff = ReconnectBackoff::new(BackoffConfig::from(&self.config().stream));
        let mut force_refresh = false;

        loop {
            let disconnect = self
                .connect_and_forward(&feed, &tx, &cancel, &mut backoff, force_refresh)
                .await;
            force_refresh = matches!(
                disconnect,
                Disconnect::Failed(ClientError::Http { status: 401, .. })
            );

            match disconnect {
                Disconnect::Cancelled => {
                    tracing::info!(symbol = %feed.symbol, stream = feed.kind.as_str(), "Stream cancelled");
                    return;
                }
                Disconnect::ConsumerGone => {
                    tracing::debug!(symbol = %feed.symbol, stream = feed.kind.as_str(), "Stream consumer dropped");
                    return;
                }
                Disconnect::EndOfStream => {
                    tracing::info!(symbol = %feed.symbol, stream = feed.kind.as_str(), "Stream ended by server");
                }
                Disconnect::Failed(e) => {
                    tracing::warn!(
                        symbol = %feed.symbol,
                        stream = feed.kind.as_str(),
                        error = %e,
                        "Stream connection failed"
                    );
                }
            }

            let delay = backoff.next_delay();
            tracing::info!(
                symbol = %feed.symbol,
                stream = feed.kind.as_str(),
                attempt = backoff.attempts(),
                delay_ms = delay.as_millis(),
                "Reconnecting stream"
            );
            metrics::record_reconnect(feed.kind);

            tokio::select! {
                () = cancel.cancelled() => return,
                () = self.cancel_token().cancelled() => return,
                () = tx.closed() => return,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn connect_and_forward<T: Send>(
        &self,
        feed: &Feed<T>,
        tx: &mpsc::Sender<T>,
        cancel: &CancellationToken,
        backoff: &mut ReconnectBackoff,
        force_refresh: bool,
    ) -> Disconnect {
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return Disconnect::Cancelled,
            () = tx.closed() => return Disconnect::ConsumerGone,
            opened = async {
                let token = self.ensure_token(force_refresh).await?;
                self.inner
                    .http
                    .open_stream(&self.config().api(&feed.path), &feed.query, &token)
                    .await
            } => opened,
        };
        let response = match opened {
            Ok(response) => response,
            Err(ClientError::Cancelled) => return Disconnect::Cancelled,
            Err(e) => return Disconnect::Failed(e),
        };
        tracing::info!(symbol = %feed.symbol, stream = feed.kind.as_str(), "Stream connected");

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let mut lines = FramedRead::new(
            StreamReader::new(body),
            LinesCodec::new_with_max_length(MAX_LINE_BYTES),
        );
        let mut delivered = false;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Disconnect::Cancelled,
                () = self.cancel_token().cancelled() => return Disconnect::Cancelled,
                () = tx.closed() => return Disconnect::ConsumerGone,
                next = lines.next() => next,
            };

            let line = match next {
                None => return Disconnect::EndOfStream,
                Some(Err(e)) => return Disconnect::Failed(ClientError::Network(e.to_string())),
                Some(Ok(line)) => line,
            };

            match feed.classify(&line) {
                Line::Ignored => {}
                Line::Invalid(reason) => {
                    tracing::warn!(
                        symbol = %feed.symbol,
                        stream = feed.kind.as_str(),
                        error = %reason,
                        "Skipping unparseable stream line"
                    );
                }
                Line::Error(message) => {
                    tracing::error!(
                        symbol = %feed.symbol,
                        stream = feed.kind.as_str(),
                        error = %message,
                        "Error record in stream"
                    );
                    return Disconnect::Failed(ClientError::DataFormat(message));
                }
                Line::Record(record) => {
                    if !delivered {
                        delivered = true;
                        backoff.reset();
                    }
                    metrics::record_stream_record(feed.kind);
                    let sent = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Disconnect::Cancelled,
                        sent = tx.send(record) => sent,
                    };
                    if sent.is_err() {
                        return Disconnect::ConsumerGone;
                    }
                }
            }
        }
    }
}
