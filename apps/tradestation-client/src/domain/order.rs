//! Order intents, bracket composition and acknowledgments.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

// ============================================================================
// Value objects
// ============================================================================

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum OrderType {
    /// Execute at the best available price.
    #[default]
    Market,
    /// Execute at the limit price or better.
    Limit,
    /// Becomes a market order once the stop price trades.
    StopMarket,
}

impl OrderType {
    /// Returns true if the type requires a limit price.
    #[must_use]
    pub const fn requires_limit_price(&self) -> bool {
        matches!(self, Self::Limit)
    }

    /// Returns true if the type requires a stop price.
    #[must_use]
    pub const fn requires_stop_price(&self) -> bool {
        matches!(self, Self::StopMarket)
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "Market",
            Self::Limit => "Limit",
            Self::StopMarket => "StopMarket",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market" => Ok(Self::Market),
            "limit" => Ok(Self::Limit),
            "stopmarket" | "stop_market" | "stop" => Ok(Self::StopMarket),
            other => Err(ClientError::invalid_argument(format!(
                "unsupported order type: {other}"
            ))),
        }
    }
}

impl TryFrom<String> for OrderType {
    type Error = ClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Trade action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

impl TradeAction {
    /// Returns the opposite action.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Expires at the end of the regular session.
    #[default]
    #[serde(rename = "DAY")]
    Day,
    /// Day plus extended hours; queued for the next session when placed after hours.
    #[serde(rename = "DYP")]
    DayPlus,
}

impl TimeInForce {
    /// `DAY` during regular market hours, `DYP` otherwise.
    #[must_use]
    pub const fn for_session(market_open: bool) -> Self {
        if market_open { Self::Day } else { Self::DayPlus }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "DAY"),
            Self::DayPlus => write!(f, "DYP"),
        }
    }
}

/// Round a price to cents, midpoint away from zero.
#[must_use]
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ============================================================================
// Order request
// ============================================================================

/// A single order, optionally carrying bracket children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Account the order is placed in.
    pub account_id: String,
    /// Upper-cased symbol.
    pub symbol: String,
    /// Share quantity.
    pub quantity: u32,
    /// Order type.
    pub order_type: OrderType,
    /// Buy or sell.
    pub trade_action: TradeAction,
    /// Duration.
    pub time_in_force: TimeInForce,
    /// Limit price (Limit orders only).
    pub limit_price: Option<Decimal>,
    /// Stop price (StopMarket orders only).
    pub stop_price: Option<Decimal>,
    /// Bracket children sent once this order fills.
    pub osos: Vec<OrderRequest>,
}

impl OrderRequest {
    /// Check price/type consistency and bracket linkage.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.quantity == 0 {
            return Err(ClientError::invalid_argument("quantity must be positive"));
        }
        if self.symbol.trim().is_empty() {
            return Err(ClientError::invalid_argument("symbol must not be empty"));
        }

        let prices_ok = match self.order_type {
            OrderType::Market => self.limit_price.is_none() && self.stop_price.is_none(),
            OrderType::Limit => self.limit_price.is_some() && self.stop_price.is_none(),
            OrderType::StopMarket => self.stop_price.is_some() && self.limit_price.is_none(),
        };
        if !prices_ok {
            return Err(ClientError::invalid_argument(format!(
                "{} order has inconsistent limit/stop prices",
                self.order_type
            )));
        }

        for child in &self.osos {
            if child.symbol != self.symbol || child.quantity != self.quantity {
                return Err(ClientError::invalid_argument(
                    "bracket child must share symbol and quantity with its parent",
                ));
            }
            if child.trade_action != self.trade_action.opposite() {
                return Err(ClientError::invalid_argument(
                    "bracket child must carry the opposite trade action",
                ));
            }
            child.validate()?;
        }
        Ok(())
    }

    /// Take-profit child, if any.
    #[must_use]
    pub fn take_profit(&self) -> Option<&Self> {
        self.osos.iter().find(|o| o.order_type == OrderType::Limit)
    }

    /// Stop-loss child, if any.
    #[must_use]
    pub fn stop_loss(&self) -> Option<&Self> {
        self.osos.iter().find(|o| o.order_type == OrderType::StopMarket)
    }
}

/// Builder for a primary order with optional take-profit and stop-loss legs.
#[derive(Debug, Clone)]
pub struct BracketOrderBuilder {
    account_id: String,
    symbol: String,
    quantity: u32,
    order_type: OrderType,
    trade_action: TradeAction,
    time_in_force: TimeInForce,
    price: Option<Decimal>,
    take_profit: Option<Decimal>,
    stop_loss: Option<Decimal>,
}

impl BracketOrderBuilder {
    /// Start a market BUY for `quantity` shares of `symbol`.
    #[must_use]
    pub fn new(account_id: impl Into<String>, symbol: &str, quantity: u32) -> Self {
        Self {
            account_id: account_id.into(),
            symbol: symbol.trim().to_uppercase(),
            quantity,
            order_type: OrderType::Market,
            trade_action: TradeAction::Buy,
            time_in_force: TimeInForce::Day,
            price: None,
            take_profit: None,
            stop_loss: None,
        }
    }

    /// Set the order type and its trigger price.
    ///
    /// The price is the limit price for Limit orders and the stop price for
    /// StopMarket orders; it is ignored for Market orders.
    #[must_use]
    pub const fn order_type(mut self, order_type: OrderType, price: Option<Decimal>) -> Self {
        self.order_type = order_type;
        self.price = price;
        self
    }

    /// Set the trade action.
    #[must_use]
    pub const fn action(mut self, action: TradeAction) -> Self {
        self.trade_action = action;
        self
    }

    /// Set the duration.
    #[must_use]
    pub const fn time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    /// Take-profit limit price; ignored unless positive.
    #[must_use]
    pub const fn take_profit(mut self, price: Option<Decimal>) -> Self {
        self.take_profit = price;
        self
    }

    /// Stop-loss stop price; ignored unless positive.
    #[must_use]
    pub const fn stop_loss(mut self, price: Option<Decimal>) -> Self {
        self.stop_loss = price;
        self
    }

    /// Build and validate the order.
    pub fn build(self) -> Result<OrderRequest, ClientError> {
        let price = self.price.map(round_price);
        let (limit_price, stop_price) = match self.order_type {
            OrderType::Market => (None, None),
            OrderType::Limit => (Some(price.ok_or_else(|| missing_price(self.order_type))?), None),
            OrderType::StopMarket => {
                (None, Some(price.ok_or_else(|| missing_price(self.order_type))?))
            }
        };

        let exit = self.trade_action.opposite();
        let mut osos = Vec::new();
        if let Some(tp) = self.take_profit.filter(|p| *p > Decimal::ZERO) {
            osos.push(self.child(OrderType::Limit, exit, Some(round_price(tp)), None));
        }
        if let Some(sl) = self.stop_loss.filter(|p| *p > Decimal::ZERO) {
            osos.push(self.child(OrderType::StopMarket, exit, None, Some(round_price(sl))));
        }

        let order = OrderRequest {
            account_id: self.account_id,
            symbol: self.symbol,
            quantity: self.quantity,
            order_type: self.order_type,
            trade_action: self.trade_action,
            time_in_force: self.time_in_force,
            limit_price,
            stop_price,
            osos,
        };
        order.validate()?;
        Ok(order)
    }

    fn child(
        &self,
        order_type: OrderType,
        trade_action: TradeAction,
        limit_price: Option<Decimal>,
        stop_price: Option<Decimal>,
    ) -> OrderRequest {
        OrderRequest {
            account_id: self.account_id.clone(),
            symbol: self.symbol.clone(),
            quantity: self.quantity,
            order_type,
            trade_action,
            time_in_force: self.time_in_force,
            limit_price,
            stop_price,
            osos: Vec::new(),
        }
    }
}

fn missing_price(order_type: OrderType) -> ClientError {
    ClientError::invalid_argument(format!("{order_type} order requires a price"))
}

// ============================================================================
// Acknowledgment
// ============================================================================

/// Per-order acknowledgment returned on submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Broker order id.
    #[serde(rename = "OrderID", default)]
    pub order_id: Option<String>,
    /// Status message.
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
    /// Error code, set when the order was rejected.
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Any other fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl OrderAck {
    /// Returns true if the broker rejected the order.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        self.error.is_some()
    }
}
