//! Level-1 quote snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::lenient::{option_i64_lenient, option_timestamp_lenient};

/// Quote snapshot for a symbol.
///
/// Stream updates may omit fields, so everything except the symbol is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Quote {
    /// Symbol.
    pub symbol: String,
    /// Session open.
    #[serde(default)]
    pub open: Option<Decimal>,
    /// Session high.
    #[serde(default)]
    pub high: Option<Decimal>,
    /// Session low.
    #[serde(default)]
    pub low: Option<Decimal>,
    /// Previous session close.
    #[serde(default)]
    pub previous_close: Option<Decimal>,
    /// Last trade price.
    #[serde(default)]
    pub last: Option<Decimal>,
    /// Best ask.
    #[serde(default)]
    pub ask: Option<Decimal>,
    /// Ask size.
    #[serde(default, deserialize_with = "option_i64_lenient")]
    pub ask_size: Option<i64>,
    /// Best bid.
    #[serde(default)]
    pub bid: Option<Decimal>,
    /// Bid size.
    #[serde(default, deserialize_with = "option_i64_lenient")]
    pub bid_size: Option<i64>,
    /// Net change from previous close.
    #[serde(default)]
    pub net_change: Option<Decimal>,
    /// Net change in percent.
    #[serde(default)]
    pub net_change_pct: Option<Decimal>,
    /// 52-week high.
    #[serde(default, rename = "High52Week")]
    pub high_52_week: Option<Decimal>,
    /// Time of the 52-week high.
    #[serde(default, rename = "High52WeekTimestamp", deserialize_with = "option_timestamp_lenient")]
    pub high_52_week_timestamp: Option<DateTime<Utc>>,
    /// 52-week low.
    #[serde(default, rename = "Low52Week")]
    pub low_52_week: Option<Decimal>,
    /// Time of the 52-week low.
    #[serde(default, rename = "Low52WeekTimestamp", deserialize_with = "option_timestamp_lenient")]
    pub low_52_week_timestamp: Option<DateTime<Utc>>,
    /// Session volume.
    #[serde(default, deserialize_with = "option_i64_lenient")]
    pub volume: Option<i64>,
    /// Previous session volume.
    #[serde(default, deserialize_with = "option_i64_lenient")]
    pub previous_volume: Option<i64>,
    /// Session close (or last during the session).
    #[serde(default)]
    pub close: Option<Decimal>,
    /// Daily open interest (derivatives).
    #[serde(default, deserialize_with = "option_i64_lenient")]
    pub daily_open_interest: Option<i64>,
    /// Time of the last trade.
    #[serde(default, deserialize_with = "option_timestamp_lenient")]
    pub trade_time: Option<DateTime<Utc>>,
    /// Tick size tier.
    #[serde(default, deserialize_with = "option_i64_lenient")]
    pub tick_size_tier: Option<i64>,
}

impl Quote {
    /// Midpoint of bid and ask, if both are present.
    #[must_use]
    pub fn mid(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => None,
        }
    }

    /// Bid/ask spread, if both are present.
    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}
