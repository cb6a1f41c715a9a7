//! Engine-backed application state for the API tests.

use std::sync::Arc;

use async_trait::async_trait;

use common::{BotState, Error, ExchangeClient, OrderConfirmation, OrderRequest, Result, TradingMode};
use engine::{Engine, EngineConfig};

use crate::AppState;

/// Quotes a constant price and refuses orders.
struct FlatFeed;

#[async_trait]
impl ExchangeClient for FlatFeed {
    async fn current_price(&self, _symbol: &str) -> Result<f64> {
        Ok(100.0)
    }

    async fn submit_order(&self, _order: &OrderRequest) -> Result<OrderConfirmation> {
        Err(Error::Exchange("flat feed never trades".into()))
    }
}

/// Spawns an engine over a flat feed. Needs a running tokio runtime.
pub(crate) fn app_state(control_token: Option<&str>) -> AppState {
    let state = Arc::new(BotState::new());
    let (engine, handle) = Engine::new(
        EngineConfig::new("BTC-USD", 0.001),
        Arc::new(FlatFeed),
        state,
    );
    tokio::spawn(engine.run());

    AppState {
        engine: handle,
        trading_mode: TradingMode::Paper,
        control_token: control_token.map(str::to_string),
    }
}
