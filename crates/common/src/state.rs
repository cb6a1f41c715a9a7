use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;

use crate::TradeRecord;

/// Process-wide bot record shared by the trade loop (sole writer) and the
/// control surface (reader).
///
/// `running` is an atomic flag so the control side can flip it without
/// touching the ledger lock. Everything else lives behind one `RwLock`, so a
/// status read always sees whole iterations.
#[derive(Debug)]
pub struct BotState {
    running: AtomicBool,
    ledger: RwLock<Ledger>,
}

#[derive(Debug)]
struct Ledger {
    last_action: String,
    profit: f64,
    trades: Vec<TradeRecord>,
    logs: Vec<String>,
}

/// Point-in-time copy of [`BotState`], serialized by `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct BotStatus {
    pub running: bool,
    pub last_action: String,
    pub profit: f64,
    pub trades: Vec<TradeRecord>,
    pub logs: Vec<String>,
}

impl Default for BotState {
    fn default() -> Self {
        Self::new()
    }
}

impl BotState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            ledger: RwLock::new(Ledger {
                last_action: "None".to_string(),
                profit: 0.0,
                trades: Vec::new(),
                logs: Vec::new(),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Apply one completed iteration: last action, profit delta and the
    /// appended record land under a single write guard.
    pub async fn record_trade(&self, record: TradeRecord, profit_delta: f64) {
        let mut ledger = self.ledger.write().await;
        ledger.last_action = record.action.clone();
        ledger.profit += profit_delta;
        ledger.trades.push(record);
    }

    pub async fn push_log(&self, line: impl Into<String>) {
        self.ledger.write().await.logs.push(line.into());
    }

    pub async fn snapshot(&self) -> BotStatus {
        let ledger = self.ledger.read().await;
        BotStatus {
            running: self.is_running(),
            last_action: ledger.last_action.clone(),
            profit: ledger.profit,
            trades: ledger.trades.clone(),
            logs: ledger.logs.clone(),
        }
    }
}
