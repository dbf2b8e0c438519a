//! TradeStation API request and response types.
//!
//! These types map directly to TradeStation's v3 wire format.

use serde::{Deserialize, Serialize};

use crate::domain::{Balances, OrderAck, OrderRequest, OrderType, Position, TimeInForce, TradeAction};

// ============================================================================
// OAuth
// ============================================================================

/// Refresh-token exchange response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token. Absent on malformed responses.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Lifetime in seconds as reported by the server.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Token type (normally "Bearer").
    #[serde(default)]
    pub token_type: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error body returned on non-success responses.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeStationErrorResponse {
    /// Error code.
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
    /// Human-readable message.
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
}

impl TradeStationErrorResponse {
    /// Best message available: `Message`, then `Error`.
    #[must_use]
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.is_empty())
    }
}

// ============================================================================
// Order Request Types
// ============================================================================

/// Order duration wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct TimeInForcePayload {
    /// `DAY` or `DYP`.
    #[serde(rename = "Duration")]
    pub duration: TimeInForce,
}

/// Bracket group attached to a parent order.
#[derive(Debug, Clone, Serialize)]
pub struct OsoGroup {
    /// Child orders.
    #[serde(rename = "Orders")]
    pub orders: Vec<OrderPayload>,
    /// Group type; children cancel each other once one fills.
    #[serde(rename = "Type")]
    pub group_type: &'static str,
}

/// Order request for the TradeStation API.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPayload {
    /// Account id.
    #[serde(rename = "AccountID")]
    pub account_id: String,
    /// Symbol.
    #[serde(rename = "Symbol")]
    pub symbol: String,
    /// Quantity (shares), as a string.
    #[serde(rename = "Quantity")]
    pub quantity: String,
    /// Order type.
    #[serde(rename = "OrderType")]
    pub order_type: OrderType,
    /// Duration.
    #[serde(rename = "TimeInForce")]
    pub time_in_force: TimeInForcePayload,
    /// BUY or SELL.
    #[serde(rename = "TradeAction")]
    pub trade_action: TradeAction,
    /// Limit price (for limit orders).
    #[serde(rename = "LimitPrice", skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<String>,
    /// Stop price (for stop orders).
    #[serde(rename = "StopPrice", skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<String>,
    /// Bracket children.
    #[serde(rename = "OSOs", skip_serializing_if = "Vec::is_empty")]
    pub osos: Vec<OsoGroup>,
}

impl From<&OrderRequest> for OrderPayload {
    fn from(order: &OrderRequest) -> Self {
        let osos = if order.osos.is_empty() {
            Vec::new()
        } else {
            vec![OsoGroup {
                orders: order.osos.iter().map(Self::from).collect(),
                group_type: "OCO",
            }]
        };

        Self {
            account_id: order.account_id.clone(),
            symbol: order.symbol.clone(),
            quantity: order.quantity.to_string(),
            order_type: order.order_type,
            time_in_force: TimeInForcePayload {
                duration: order.time_in_force,
            },
            trade_action: order.trade_action,
            limit_price: order.limit_price.map(|p| p.to_string()),
            stop_price: order.stop_price.map(|p| p.to_string()),
            osos,
        }
    }
}

// ============================================================================
// Response Envelopes
// ============================================================================

/// `{"Orders": [...]}`
#[derive(Debug, Clone, Deserialize)]
pub struct OrdersEnvelope {
    /// Per-order acknowledgments.
    #[serde(rename = "Orders")]
    pub orders: Vec<OrderAck>,
}

/// `{"Positions": [...]}`
#[derive(Debug, Clone, Deserialize)]
pub struct PositionsEnvelope {
    /// Positions.
    #[serde(rename = "Positions")]
    pub positions: Vec<Position>,
}

/// `{"Balances": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct BalancesEnvelope {
    /// Balances.
    #[serde(rename = "Balances")]
    pub balances: Balances,
}
