//! Account positions and balances.

use super::api_types::{BalancesEnvelope, PositionsEnvelope};
use super::client::TradeStationClient;
use crate::domain::{Balances, Position};
use crate::error::ClientError;
use crate::infrastructure::metrics::{self, Operation};

impl TradeStationClient {
    /// Open positions in the configured account.
    ///
    /// # Errors
    ///
    /// `DataFormat` if the response has no `Positions` array.
    pub async fn get_positions(&self) -> Result<Vec<Position>, ClientError> {
        metrics::record_request(Operation::Positions);
        let envelope: PositionsEnvelope = self.api_get(&self.account_path("positions"), &[]).await?;
        tracing::debug!(count = envelope.positions.len(), "Fetched positions");
        Ok(envelope.positions)
    }

    /// Balances of the configured account.
    ///
    /// # Errors
    ///
    /// `DataFormat` if the response has no `Balances` object.
    pub async fn get_balances(&self) -> Result<Balances, ClientError> {
        metrics::record_request(Operation::Balances);
        let envelope: BalancesEnvelope = self.api_get(&self.account_path("balances"), &[]).await?;
        Ok(envelope.balances)
    }

    fn account_path(&self, resource: &str) -> String {
        format!("/brokerage/accounts/{}/{resource}", self.config().account_id)
    }
}
