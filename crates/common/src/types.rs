use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// A market order to be submitted to the exchange. Built per order, never retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client-side id, sent as `client_oid`.
    pub client_oid: String,
    pub symbol: String,
    pub side: OrderSide,
    pub size: f64,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: OrderSide, size: f64) -> Self {
        Self {
            client_oid: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            size,
        }
    }
}

/// Confirmation of an accepted order returned by the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub size: f64,
    pub status: String,
    /// Known up front for simulated fills; live market orders fill asynchronously.
    pub fill_price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// One completed iteration of the trade loop, HOLD included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub price: f64,
    /// Percent change against the reference price, rounded to 2 decimals.
    #[serde(rename = "change")]
    pub change_pct: f64,
    pub action: String,
}

impl TradeRecord {
    pub fn new(price: f64, change: f64, action: impl Into<String>) -> Self {
        Self {
            price,
            change_pct: round_2dp(change * 100.0),
            action: action.into(),
        }
    }
}

/// Halves go to the even neighbour: 0.125 becomes 0.12, 0.375 becomes 0.38.
fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Whether the bot is running against the real exchange or simulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}

/// Current state of the trading engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
}

impl From<bool> for EngineState {
    fn from(running: bool) -> Self {
        if running {
            EngineState::Running
        } else {
            EngineState::Stopped
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Running => write!(f, "running"),
        }
    }
}
