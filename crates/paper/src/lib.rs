use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{Error, ExchangeClient, OrderConfirmation, OrderRequest, OrderSide, Result};

/// Simulated exchange client for paper trading.
///
/// Prices come from a real feed (typically the public ticker); fills are
/// simulated at the latest price seen for the product, with slippage.
/// No order ever leaves the process.
pub struct PaperClient {
    feed: Arc<dyn ExchangeClient>,
    /// Latest price per product, refreshed on every `current_price` call.
    prices: RwLock<HashMap<String, f64>>,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
}

impl PaperClient {
    pub fn new(feed: Arc<dyn ExchangeClient>, slippage_bps: f64) -> Self {
        info!(slippage_bps, "PaperClient initialized");
        Self {
            feed,
            prices: RwLock::new(HashMap::new()),
            slippage_bps,
        }
    }
}

#[async_trait]
impl ExchangeClient for PaperClient {
    async fn current_price(&self, symbol: &str) -> Result<f64> {
        let price = self.feed.current_price(symbol).await?;
        self.prices.write().await.insert(symbol.to_string(), price);
        Ok(price)
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation> {
        let mid_price = self
            .prices
            .read()
            .await
            .get(&order.symbol)
            .copied()
            .ok_or_else(|| {
                Error::Exchange(format!(
                    "PaperClient has no price for '{}'. Fetch a ticker first.",
                    order.symbol
                ))
            })?;

        // Apply slippage: buys pay more, sells receive less
        let fill_price = match order.side {
            OrderSide::Buy => mid_price * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => mid_price * (1.0 - self.slippage_bps / 10_000.0),
        };

        debug!(
            symbol = %order.symbol,
            side = %order.side,
            mid = mid_price,
            fill = fill_price,
            size = order.size,
            "Paper fill simulated"
        );

        Ok(OrderConfirmation {
            order_id: order.client_oid.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            size: order.size,
            status: "done".to_string(),
            fill_price: Some(fill_price),
            created_at: Utc::now(),
        })
    }
}
