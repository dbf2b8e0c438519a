//! Order submission.

use super::api_types::{OrderPayload, OrdersEnvelope};
use super::client::TradeStationClient;
use crate::application::ports::{ClosePositionRequest, OpenPositionRequest};
use crate::domain::{BracketOrderBuilder, OrderAck, OrderRequest, TimeInForce, TradeAction};
use crate::error::ClientError;
use crate::infrastructure::metrics::{self, Operation};

const ORDERS_PATH: &str = "/orderexecution/orders";

impl TradeStationClient {
    /// Submit a BUY with optional take-profit and stop-loss legs.
    ///
    /// Duration is `DAY` while the regular session is open and `DYP`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero size or a Limit/StopMarket entry without
    /// a price (no request is made), otherwise any transport or HTTP error.
    pub async fn open_position(
        &self,
        request: &OpenPositionRequest,
    ) -> Result<Vec<OrderAck>, ClientError> {
        let time_in_force = TimeInForce::for_session(self.clock().is_market_open());
        let order = BracketOrderBuilder::new(
            self.config().account_id.clone(),
            &request.symbol,
            request.size,
        )
        .order_type(request.order_type, request.price)
        .time_in_force(time_in_force)
        .take_profit(request.take_profit)
        .stop_loss(request.stop_loss)
        .build()?;

        let acks = self.submit(&order, Operation::OpenPosition).await?;
        for ack in acks.iter().filter(|a| a.is_rejected()) {
            tracing::warn!(
                symbol = %order.symbol,
                order_id = ?ack.order_id,
                error = ?ack.error,
                message = ?ack.message,
                "Order leg rejected"
            );
        }
        Ok(acks)
    }

    /// Submit a single SELL with duration `DAY`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::open_position`].
    pub async fn close_position(&self, request: &ClosePositionRequest) -> Result<(), ClientError> {
        let order = BracketOrderBuilder::new(
            self.config().account_id.clone(),
            &request.symbol,
            request.size,
        )
        .order_type(request.order_type, request.price)
        .action(TradeAction::Sell)
        .time_in_force(TimeInForce::Day)
        .build()?;

        self.submit(&order, Operation::ClosePosition).await?;
        Ok(())
    }

    async fn submit(&self, order: &OrderRequest, operation: Operation) -> Result<Vec<OrderAck>, ClientError> {
        let payload = OrderPayload::from(order);
        tracing::info!(
            symbol = %order.symbol,
            action = %order.trade_action,
            order_type = %order.order_type,
            quantity = order.quantity,
            duration = %order.time_in_force,
            limit_price = ?order.limit_price,
            stop_price = ?order.stop_price,
            brackets = order.osos.len(),
            "Submitting order"
        );

        metrics::record_request(operation);
        let token = self.ensure_token(false).await?;
        let envelope: OrdersEnvelope = self
            .inner
            .http
            .post(&self.config().api(ORDERS_PATH), &payload, &token)
            .await
            .inspect_err(|e| {
                tracing::error!(symbol = %order.symbol, error = %e, "Order submission failed");
            })?;

        tracing::info!(
            symbol = %order.symbol,
            acks = envelope.orders.len(),
            "Order submitted"
        );
        Ok(envelope.orders)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::DateTime;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::application::ports::FixedClock;
    use crate::domain::OrderType;
    use crate::infrastructure::tradestation::config::{Credentials, TradeStationConfig};

    async fn client(server: &MockServer, now: &str) -> TradeStationClient {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path(ORDERS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Orders": [{"OrderID": "1", "Message": "Sent order"}]})),
            )
            .mount(server)
            .await;

        let config = TradeStationConfig::new(Credentials::new("k", "s", "r"), "SIM1")
            .with_base_url(server.uri())
            .with_api_url(server.uri());
        let now = DateTime::parse_from_rfc3339(now).unwrap();
        TradeStationClient::with_clock(config, CancellationToken::new(), Arc::new(FixedClock(now)))
            .unwrap()
    }

    async fn posted_order(server: &MockServer) -> Value {
        let requests = server.received_requests().await.unwrap();
        let order = requests
            .iter()
            .rev()
            .find(|r| r.url.path() == ORDERS_PATH)
            .unwrap();
        serde_json::from_slice(&order.body).unwrap()
    }

    #[tokio::test]
    async fn after_hours_entry_uses_day_plus() {
        let server = MockServer::start().await;
        let client = client(&server, "2024-03-04T17:30:00-05:00").await;

        let request = OpenPositionRequest::market("aapl", 10).with_stop_loss(dec!(180.004));
        let acks = client.open_position(&request).await.unwrap();
        assert_eq!(acks[0].order_id.as_deref(), Some("1"));

        let body = posted_order(&server).await;
        assert_eq!(body["Symbol"], "AAPL");
        assert_eq!(body["TimeInForce"]["Duration"], "DYP");
        assert_eq!(body["OSOs"][0]["Orders"][0]["OrderType"], "StopMarket");
        assert_eq!(body["OSOs"][0]["Orders"][0]["StopPrice"], "180.00");
        assert_eq!(body["OSOs"][0]["Orders"][0]["TradeAction"], "SELL");
    }

    #[tokio::test]
    async fn close_is_single_day_sell() {
        let server = MockServer::start().await;
        let client = client(&server, "2024-03-04T17:30:00-05:00").await;

        let request = ClosePositionRequest {
            symbol: "MSFT".to_string(),
            size: 5,
            order_type: OrderType::Limit,
            price: Some(dec!(412.345)),
        };
        client.close_position(&request).await.unwrap();

        let body = posted_order(&server).await;
        assert_eq!(body["TradeAction"], "SELL");
        assert_eq!(body["TimeInForce"]["Duration"], "DAY");
        assert_eq!(body["LimitPrice"], "412.35");
        assert!(body.get("OSOs").is_none());
    }

    #[tokio::test]
    async fn invalid_entry_makes_no_request() {
        let server = MockServer::start().await;
        let client = client(&server, "2024-03-04T10:30:00-05:00").await;

        let request = OpenPositionRequest::market("AAPL", 10).with_entry(OrderType::Limit, None);
        let err = client.open_position(&request).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
