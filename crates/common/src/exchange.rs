use async_trait::async_trait;

use crate::{OrderConfirmation, OrderRequest, Result};

/// Abstraction over the exchange connection.
///
/// `CoinbaseClient` implements this for live trading.
/// `PaperClient` implements this for simulation.
///
/// Implementations never retry. Every error is treated as transient by the
/// trade loop, which owns the backoff policy.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Get the latest ticker price for a product.
    async fn current_price(&self, symbol: &str) -> Result<f64>;

    /// Submit a market order and return the exchange's confirmation.
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation>;
}
