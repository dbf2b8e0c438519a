//! Bar chart fetches: single queries and multi-symbol fan-outs.

use chrono::{Duration, NaiveDate};
use futures::future::join_all;
use serde_json::Value;

use super::bars::parse_bars;
use super::client::TradeStationClient;
use crate::application::ports::{BarQuery, BarUnit, BarWindow};
use crate::domain::market_calendar::{check_intraday_capacity, session_open_utc};
use crate::domain::{Bar, BatchResult, SymbolOutcome, SymbolResult};
use crate::error::ClientError;
use crate::infrastructure::metrics::{self, Operation};

const DATE_FORMAT: &str = "%Y-%m-%d";
const INTRADAY_INTERVAL: u32 = 5;
const INTRADAY_BARS_BACK: u32 = 78;
const STALE_AFTER_DAYS: i64 = 5;

impl TradeStationClient {
    /// Fetch bars for one validated query.
    ///
    /// # Errors
    ///
    /// Propagates authentication, HTTP, network and parse failures.
    pub async fn get_bars(&self, query: &BarQuery) -> Result<Vec<Bar>, ClientError> {
        self.fetch_bars(query, Operation::GetBars).await
    }

    /// Minute bars for every symbol between `start` and `end` (default today).
    ///
    /// The range is checked against the provider's bar ceiling before any
    /// request. Symbols that failed on an earlier call are skipped; a symbol
    /// that fails now is reported and skipped from then on. Cancellation and
    /// invalid symbols are reported without marking the symbol.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero interval, `RangeTooLarge` if the range
    /// needs more than [`MAX_INTRADAY_BARS`] bars. Per-symbol failures never
    /// fail the call.
    ///
    /// [`MAX_INTRADAY_BARS`]: crate::domain::market_calendar::MAX_INTRADAY_BARS
    pub async fn get_historical_intraday_data<S: AsRef<str>>(
        &self,
        symbols: &[S],
        start: NaiveDate,
        end: Option<NaiveDate>,
        interval: u32,
    ) -> Result<BatchResult, ClientError> {
        let end = end.unwrap_or_else(|| self.clock().today());
        let required = check_intraday_capacity(start, end, interval)?;
        tracing::debug!(
            symbols = symbols.len(),
            %start,
            %end,
            interval,
            required,
            "Fetching historical intraday bars"
        );

        let fetches = symbols.iter().map(|symbol| async move {
            let symbol = symbol.as_ref();
            if self.is_ignored(symbol) {
                tracing::debug!(symbol, "Skipping ignored symbol");
                return SymbolResult {
                    symbol: symbol.to_string(),
                    outcome: SymbolOutcome::Skipped,
                };
            }

            let result: Result<Vec<Bar>, ClientError> = async {
                let query = BarQuery::with_window(
                    symbol,
                    interval,
                    BarUnit::Minute,
                    BarWindow::FirstDate(start.format(DATE_FORMAT).to_string()),
                    Some(end.format(DATE_FORMAT).to_string()),
                )?;
                self.fetch_bars(&query, Operation::HistoricalIntraday).await
            }
            .await;

            let outcome = match result {
                Ok(bars) => SymbolOutcome::Fetched(bars),
                Err(e @ (ClientError::Cancelled | ClientError::InvalidArgument(_))) => {
                    tracing::warn!(
                        symbol,
                        operation = Operation::HistoricalIntraday.as_str(),
                        error = %e,
                        "Historical intraday fetch not attempted"
                    );
                    SymbolOutcome::Failed(e)
                }
                Err(e) => {
                    tracing::error!(
                        symbol,
                        operation = Operation::HistoricalIntraday.as_str(),
                        error = %e,
                        "Historical intraday fetch failed; ignoring symbol"
                    );
                    metrics::record_fetch_failure(Operation::HistoricalIntraday);
                    self.ignore(symbol);
                    SymbolOutcome::Failed(e)
                }
            };
            SymbolResult {
                symbol: symbol.to_string(),
                outcome,
            }
        });

        Ok(BatchResult::new(join_all(fetches).await))
    }

    /// The last 78 five-minute bars up to each date, pairing `symbols[i]`
    /// with `dates[i]`.
    ///
    /// Extra entries in the longer input are dropped. Dates after today are
    /// clamped to today. Failures are reported per pair and do not touch the
    /// ignore-set.
    pub async fn get_intraday_data<S: AsRef<str>>(
        &self,
        symbols: &[S],
        dates: &[NaiveDate],
    ) -> BatchResult {
        let today = self.clock().today();

        let fetches = symbols.iter().zip(dates).map(|(symbol, date)| async move {
            let symbol = symbol.as_ref();
            let last_date = (*date).min(today);
            let result: Result<Vec<Bar>, ClientError> = async {
                let query = BarQuery::with_window(
                    symbol,
                    INTRADAY_INTERVAL,
                    BarUnit::Minute,
                    BarWindow::BarsBack(INTRADAY_BARS_BACK),
                    Some(last_date.format(DATE_FORMAT).to_string()),
                )?;
                self.fetch_bars(&query, Operation::IntradayData).await
            }
            .await;

            let outcome = match result {
                Ok(bars) => SymbolOutcome::Fetched(bars),
                Err(e) => {
                    tracing::error!(
                        symbol,
                        operation = Operation::IntradayData.as_str(),
                        %last_date,
                        error = %e,
                        "Intraday fetch failed"
                    );
                    metrics::record_fetch_failure(Operation::IntradayData);
                    SymbolOutcome::Failed(e)
                }
            };
            SymbolResult {
                symbol: symbol.to_string(),
                outcome,
            }
        });

        BatchResult::new(join_all(fetches).await)
    }

    /// Today's five-minute bars since the session open. Empty on failure.
    pub async fn get_current_day_intraday_bars(&self, symbol: &str) -> Vec<Bar> {
        let now = self.clock().now();
        let first = session_open_utc(now.date_naive(), *now.offset());

        let result: Result<Vec<Bar>, ClientError> = async {
            let query = BarQuery::with_window(
                symbol,
                INTRADAY_INTERVAL,
                BarUnit::Minute,
                BarWindow::FirstDate(first.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
                None,
            )?;
            self.fetch_bars(&query, Operation::CurrentDay).await
        }
        .await;

        result.unwrap_or_else(|e| {
            tracing::error!(symbol, error = %e, "Current day intraday fetch failed");
            metrics::record_fetch_failure(Operation::CurrentDay);
            Vec::new()
        })
    }

    /// `days_back` daily bars ending at `last_date` (default today).
    ///
    /// Returns nothing if the newest bar is more than five days older than
    /// `last_date`, or on failure.
    pub async fn get_historical_daily_bars(
        &self,
        symbol: &str,
        days_back: u32,
        last_date: Option<NaiveDate>,
    ) -> Vec<Bar> {
        let last_date = last_date.unwrap_or_else(|| self.clock().today());

        let result: Result<Vec<Bar>, ClientError> = async {
            let query = BarQuery::with_window(
                symbol,
                1,
                BarUnit::Daily,
                BarWindow::BarsBack(days_back),
                Some(last_date.format(DATE_FORMAT).to_string()),
            )?;
            self.fetch_bars(&query, Operation::HistoricalDaily).await
        }
        .await;

        match result {
            Ok(bars) => {
                let cutoff = last_date - Duration::days(STALE_AFTER_DAYS);
                match bars.last() {
                    Some(newest) if newest.date < cutoff => {
                        tracing::warn!(
                            symbol,
                            newest = %newest.date,
                            %cutoff,
                            "Daily bars are stale; discarding"
                        );
                        Vec::new()
                    }
                    _ => bars,
                }
            }
            Err(e) => {
                tracing::error!(symbol, error = %e, "Historical daily fetch failed");
                metrics::record_fetch_failure(Operation::HistoricalDaily);
                Vec::new()
            }
        }
    }

    async fn fetch_bars(&self, query: &BarQuery, operation: Operation) -> Result<Vec<Bar>, ClientError> {
        metrics::record_request(operation);
        let path = format!("/marketdata/barcharts/{}", query.symbol());
        let raw: Value = self.api_get(&path, &query.query_pairs()).await?;
        let bars = parse_bars(&raw, query.symbol())?;
        tracing::debug!(
            symbol = query.symbol(),
            operation = operation.as_str(),
            count = bars.len(),
            "Fetched bars"
        );
        Ok(bars)
    }
}
