//! Brokerage Port (Driven Port)
//!
//! Interface the operation boundary uses to reach the brokerage.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Balances, Bar, OrderAck, OrderType, Position};
use crate::error::ClientError;

/// Bar aggregation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum BarUnit {
    /// Intraday bars of `interval` minutes.
    Minute,
    /// Daily bars.
    Daily,
    /// Weekly bars.
    Weekly,
    /// Monthly bars.
    Monthly,
}

impl BarUnit {
    /// Query-string value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "Minute",
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }
}

impl fmt::Display for BarUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarUnit {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" | "minutes" => Ok(Self::Minute),
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            other => Err(ClientError::invalid_argument(format!("unsupported bar unit: {other}"))),
        }
    }
}

impl TryFrom<String> for BarUnit {
    type Error = ClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How far back a bar request reaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarWindow {
    /// Fixed number of bars ending at the last date.
    BarsBack(u32),
    /// Everything from this date (or timestamp) to the last date.
    FirstDate(String),
}

/// Validated bar chart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarQuery {
    symbol: String,
    interval: u32,
    unit: BarUnit,
    window: BarWindow,
    last_date: Option<String>,
}

impl BarQuery {
    /// Build a query; exactly one of `bars_back` and `first_date` must be given.
    pub fn new(
        symbol: &str,
        interval: u32,
        unit: BarUnit,
        bars_back: Option<u32>,
        first_date: Option<String>,
        last_date: Option<String>,
    ) -> Result<Self, ClientError> {
        let first_date = first_date.filter(|d| !d.trim().is_empty());
        let window = match (bars_back, first_date) {
            (Some(_), Some(_)) => {
                return Err(ClientError::invalid_argument(
                    "cannot specify both bars_back and first_date",
                ));
            }
            (None, None) => {
                return Err(ClientError::invalid_argument(
                    "must specify either bars_back or first_date",
                ));
            }
            (Some(n), None) => BarWindow::BarsBack(n),
            (None, Some(date)) => BarWindow::FirstDate(date),
        };
        Self::with_window(symbol, interval, unit, window, last_date)
    }

    /// Build a query from an explicit window.
    pub fn with_window(
        symbol: &str,
        interval: u32,
        unit: BarUnit,
        window: BarWindow,
        last_date: Option<String>,
    ) -> Result<Self, ClientError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(ClientError::invalid_argument("symbol must not be empty"));
        }
        if interval == 0 {
            return Err(ClientError::invalid_argument("interval must be positive"));
        }
        Ok(Self {
            symbol: symbol.to_string(),
            interval,
            unit,
            window,
            last_date,
        })
    }

    /// Symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Window.
    #[must_use]
    pub const fn window(&self) -> &BarWindow {
        &self.window
    }

    /// Query-string pairs in request order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("interval", self.interval.to_string()),
            ("unit", self.unit.to_string()),
        ];
        match &self.window {
            BarWindow::BarsBack(n) => pairs.push(("barsback", n.to_string())),
            BarWindow::FirstDate(d) => pairs.push(("firstdate", d.clone())),
        }
        if let Some(last) = &self.last_date {
            pairs.push(("lastdate", last.clone()));
        }
        pairs
    }
}

/// Request to open a position with optional brackets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPositionRequest {
    /// Symbol.
    pub symbol: String,
    /// Share quantity.
    pub size: u32,
    /// Entry order type.
    #[serde(default)]
    pub order_type: OrderType,
    /// Entry limit or stop price.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Take-profit limit price.
    #[serde(default)]
    pub take_profit: Option<Decimal>,
    /// Stop-loss stop price.
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
}

impl OpenPositionRequest {
    /// Market entry without brackets.
    #[must_use]
    pub fn market(symbol: impl Into<String>, size: u32) -> Self {
        Self {
            symbol: symbol.into(),
            size,
            order_type: OrderType::Market,
            price: None,
            take_profit: None,
            stop_loss: None,
        }
    }

    /// Set the take-profit price.
    #[must_use]
    pub const fn with_take_profit(mut self, price: Decimal) -> Self {
        self.take_profit = Some(price);
        self
    }

    /// Set the stop-loss price.
    #[must_use]
    pub const fn with_stop_loss(mut self, price: Decimal) -> Self {
        self.stop_loss = Some(price);
        self
    }

    /// Set the entry type and price.
    #[must_use]
    pub const fn with_entry(mut self, order_type: OrderType, price: Option<Decimal>) -> Self {
        self.order_type = order_type;
        self.price = price;
        self
    }
}

/// Request to close (sell) a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosePositionRequest {
    /// Symbol.
    pub symbol: String,
    /// Share quantity.
    pub size: u32,
    /// Order type.
    #[serde(default)]
    pub order_type: OrderType,
    /// Limit price for Limit, stop price for StopMarket.
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Port for brokerage interactions.
#[async_trait]
pub trait BrokerageApi: Send + Sync {
    /// Fetch bars for a validated query.
    async fn get_bars(&self, query: &BarQuery) -> Result<Vec<Bar>, ClientError>;

    /// Submit a BUY with optional take-profit/stop-loss children.
    async fn open_position(
        &self,
        request: &OpenPositionRequest,
    ) -> Result<Vec<OrderAck>, ClientError>;

    /// Submit a single SELL.
    async fn close_position(&self, request: &ClosePositionRequest) -> Result<(), ClientError>;

    /// Current positions.
    async fn get_positions(&self) -> Result<Vec<Position>, ClientError>;

    /// Account balances.
    async fn get_balances(&self) -> Result<Balances, ClientError>;
}
