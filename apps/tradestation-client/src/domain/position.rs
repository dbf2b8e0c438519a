//! Account positions and balances.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient::{i64_lenient, option_timestamp_lenient};

/// Open position as reported by the brokerage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Position {
    /// Symbol.
    pub symbol: String,
    /// Signed quantity; negative for short positions.
    #[serde(deserialize_with = "i64_lenient")]
    pub quantity: i64,
    /// Average entry price.
    pub average_price: Decimal,
    /// Time of the last update.
    #[serde(default, deserialize_with = "option_timestamp_lenient")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Current market value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_value: Option<Decimal>,
    /// Unrealized profit or loss.
    #[serde(default, rename = "UnrealizedProfitLoss", skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl: Option<Decimal>,
}

impl Position {
    /// Returns true for a long position.
    #[must_use]
    pub const fn is_long(&self) -> bool {
        self.quantity > 0
    }

    /// Returns true for a short position.
    #[must_use]
    pub const fn is_short(&self) -> bool {
        self.quantity < 0
    }
}

/// Account balances, kept as the raw field map.
///
/// The set of fields depends on the account type, so only a few are typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(pub BTreeMap<String, Value>);

impl Balances {
    /// Raw field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Field parsed as a decimal, whether sent as a string or a number.
    #[must_use]
    pub fn decimal(&self, key: &str) -> Option<Decimal> {
        match self.0.get(key)? {
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            _ => None,
        }
    }

    /// Cash balance.
    #[must_use]
    pub fn cash_balance(&self) -> Option<Decimal> {
        self.decimal("CashBalance")
    }

    /// Buying power.
    #[must_use]
    pub fn buying_power(&self) -> Option<Decimal> {
        self.decimal("BuyingPower")
    }

    /// Total equity.
    #[must_use]
    pub fn equity(&self) -> Option<Decimal> {
        self.decimal("Equity")
    }

    /// Account id, if present.
    #[must_use]
    pub fn account_id(&self) -> Option<&str> {
        self.0.get("AccountID").and_then(Value::as_str)
    }
}
