use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use common::{BotState, ExchangeClient, OrderRequest, Result, TradeRecord};

use crate::decision::{price_change, Decision, CHANGE_THRESHOLD};

/// Wait after a completed iteration.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Wait after a failed iteration.
pub const BACKOFF_INTERVAL: Duration = Duration::from_secs(60);

/// Fixed trading parameters. Set once at construction, never changed at runtime.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub symbol: String,
    pub order_size: f64,
    pub threshold: f64,
    pub poll_interval: Duration,
    pub backoff_interval: Duration,
}

impl EngineConfig {
    pub fn new(symbol: impl Into<String>, order_size: f64) -> Self {
        Self {
            symbol: symbol.into(),
            order_size,
            threshold: CHANGE_THRESHOLD,
            poll_interval: POLL_INTERVAL,
            backoff_interval: BACKOFF_INTERVAL,
        }
    }
}

/// One run of the trade loop, from `start` to `stop`.
///
/// The trader is the only writer of `BotState`'s ledger. It never returns an
/// error: every failure becomes a log line followed by the backoff wait.
pub(crate) struct Trader {
    config: EngineConfig,
    client: Arc<dyn ExchangeClient>,
    state: Arc<BotState>,
}

impl Trader {
    pub(crate) fn new(
        config: EngineConfig,
        client: Arc<dyn ExchangeClient>,
        state: Arc<BotState>,
    ) -> Self {
        Self {
            config,
            client,
            state,
        }
    }

    /// Run until the stop signal flips to `true`. Call from `tokio::spawn`.
    pub(crate) async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let Some(mut last_price) = self.reference_price(&mut stop_rx).await else {
            info!("Trade loop stopped before a reference price was captured");
            return;
        };
        info!(symbol = %self.config.symbol, reference = last_price, "Trade loop running");

        while !stop_requested(&stop_rx) {
            let Some(fetched) = self.fetch_price(&mut stop_rx).await else {
                break;
            };
            let outcome = match fetched {
                Ok(price) => self.act(last_price, price).await,
                Err(e) => Err(e),
            };
            let wait = match outcome {
                Ok(price) => {
                    last_price = price;
                    self.config.poll_interval
                }
                Err(e) => {
                    self.record_failure(e).await;
                    self.config.backoff_interval
                }
            };
            if !pause(&mut stop_rx, wait).await {
                break;
            }
        }

        info!(symbol = %self.config.symbol, "Trade loop stopped");
    }

    /// Fetch the starting reference price, retrying after the backoff wait.
    async fn reference_price(&self, stop_rx: &mut watch::Receiver<bool>) -> Option<f64> {
        while !stop_requested(stop_rx) {
            match self.fetch_price(stop_rx).await? {
                Ok(price) => return Some(price),
                Err(e) => {
                    self.record_failure(e).await;
                    if !pause(stop_rx, self.config.backoff_interval).await {
                        return None;
                    }
                }
            }
        }
        None
    }

    /// Ticker read that is abandoned as soon as a stop arrives. `None` on stop.
    async fn fetch_price(&self, stop_rx: &mut watch::Receiver<bool>) -> Option<Result<f64>> {
        tokio::select! {
            result = self.client.current_price(&self.config.symbol) => Some(result),
            _ = stop_rx.changed() => None,
        }
    }

    /// One iteration: fetch, compare, maybe order, record. Returns the new
    /// reference price. On error nothing in the ledger has changed.
    #[cfg(test)]
    pub(crate) async fn step(&self, last_price: f64) -> Result<f64> {
        let price = self.client.current_price(&self.config.symbol).await?;
        self.act(last_price, price).await
    }

    /// Compare `price` with the reference, place the order if any, then record.
    ///
    /// The order call is never cancelled: once sent, its outcome is recorded.
    async fn act(&self, last_price: f64, price: f64) -> Result<f64> {
        let change = price_change(last_price, price);
        let decision = Decision::evaluate(change, self.config.threshold);

        if let Some(side) = decision.side() {
            let order = OrderRequest::market(&self.config.symbol, side, self.config.order_size);
            let confirmation = self.client.submit_order(&order).await?;
            info!(
                symbol = %order.symbol,
                side = %side,
                price,
                size = order.size,
                order_id = %confirmation.order_id,
                "Order placed"
            );
        } else {
            debug!(price, change, "Holding");
        }

        let record = TradeRecord::new(price, change, decision.label(price));
        let profit_delta = decision.profit_delta(self.config.order_size, price);
        self.state.record_trade(record, profit_delta).await;

        Ok(price)
    }

    async fn record_failure(&self, e: common::Error) {
        warn!(symbol = %self.config.symbol, error = %e, "Trade iteration failed");
        self.state.push_log(e.to_string()).await;
    }
}

fn stop_requested(stop_rx: &watch::Receiver<bool>) -> bool {
    *stop_rx.borrow()
}

/// Sleep for `duration` unless stopped first. Returns `false` on stop.
///
/// A dropped sender counts as a stop.
async fn pause(stop_rx: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    if stop_requested(stop_rx) {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = stop_rx.changed() => false,
    }
}
