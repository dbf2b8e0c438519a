//! Named brokerage operations.
//!
//! Callers address operations by name (`tradestation_get_bars`, ...) with a
//! JSON argument object. Arguments are validated into typed requests once,
//! in [`BrokerOperation::parse`], and then dispatched onto a [`BrokerageApi`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::ports::{BarQuery, BarUnit, BrokerageApi, ClosePositionRequest, OpenPositionRequest};
use crate::error::ClientError;

/// Required prefix of every operation name (case-insensitive).
pub const OPERATION_PREFIX: &str = "tradestation";

#[derive(Debug, Deserialize)]
struct GetBarsArgs {
    symbol: String,
    interval: u32,
    unit: BarUnit,
    #[serde(default)]
    bars_back: Option<u32>,
    #[serde(default, rename = "firstdate")]
    first_date: Option<String>,
    #[serde(default, rename = "lastdate")]
    last_date: Option<String>,
}

/// A validated operation ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerOperation {
    /// Fetch bars.
    GetBars(BarQuery),
    /// Open a position with optional brackets.
    PlaceBuyOrder(OpenPositionRequest),
    /// Close a position.
    PlaceSellOrder(ClosePositionRequest),
    /// List positions.
    GetPositions,
    /// Fetch balances.
    GetBalances,
}

impl BrokerOperation {
    /// Resolve `name` and validate `arguments` for it.
    pub fn parse(name: &str, arguments: Value) -> Result<Self, ClientError> {
        let starts_with_prefix = name
            .get(..OPERATION_PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(OPERATION_PREFIX));
        if !starts_with_prefix {
            return Err(ClientError::invalid_argument(format!(
                "invalid operation name prefix, expected: {OPERATION_PREFIX}"
            )));
        }

        if name.ends_with("get_bars") {
            let args: GetBarsArgs = typed_args(name, arguments)?;
            BarQuery::new(
                &args.symbol,
                args.interval,
                args.unit,
                args.bars_back,
                args.first_date,
                args.last_date,
            )
            .map(Self::GetBars)
        } else if name.ends_with("place_buy_order") {
            typed_args(name, arguments).map(Self::PlaceBuyOrder)
        } else if name.ends_with("place_sell_order") {
            typed_args(name, arguments).map(Self::PlaceSellOrder)
        } else if name.ends_with("get_positions") {
            Ok(Self::GetPositions)
        } else if name.ends_with("get_balances") {
            Ok(Self::GetBalances)
        } else {
            Err(ClientError::invalid_argument(format!("unknown operation: {name}")))
        }
    }

    /// Short name, without prefix.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetBars(_) => "get_bars",
            Self::PlaceBuyOrder(_) => "place_buy_order",
            Self::PlaceSellOrder(_) => "place_sell_order",
            Self::GetPositions => "get_positions",
            Self::GetBalances => "get_balances",
        }
    }

    /// Run the operation and serialize its result.
    pub async fn execute(&self, api: &dyn BrokerageApi) -> Result<Value, ClientError> {
        let result = match self {
            Self::GetBars(query) => api.get_bars(query).await.and_then(to_json),
            Self::PlaceBuyOrder(request) => api.open_position(request).await.and_then(to_json),
            Self::PlaceSellOrder(request) => api
                .close_position(request)
                .await
                .map(|()| json!({ "Status": "Success" })),
            Self::GetPositions => api.get_positions().await.and_then(to_json),
            Self::GetBalances => api.get_balances().await.and_then(to_json),
        };

        if let Err(e) = &result {
            tracing::error!(operation = self.name(), error = %e, "Brokerage operation failed");
        }
        result
    }
}

fn typed_args<T: DeserializeOwned>(name: &str, arguments: Value) -> Result<T, ClientError> {
    serde_json::from_value(arguments)
        .map_err(|e| ClientError::invalid_argument(format!("{name}: {e}")))
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value, ClientError> {
    serde_json::to_value(value).map_err(|e| ClientError::data_format(e.to_string()))
}
