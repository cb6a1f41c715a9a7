//! Scripted exchange used by the engine's unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use common::{BotState, Error, ExchangeClient, OrderConfirmation, OrderRequest, Result};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Tick {
    Price(f64),
    Fail,
}

/// Replays a fixed sequence of ticker results. The final tick repeats forever.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    ticks: Mutex<VecDeque<Tick>>,
    orders: Mutex<Vec<OrderRequest>>,
    reject_orders: AtomicBool,
    price_calls: AtomicUsize,
    price_delay: Duration,
    order_delay: Duration,
}

impl ScriptedClient {
    pub(crate) fn new(ticks: impl IntoIterator<Item = Tick>) -> Self {
        Self {
            ticks: Mutex::new(ticks.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(crate) fn prices(prices: &[f64]) -> Self {
        Self::new(prices.iter().copied().map(Tick::Price))
    }

    /// Every ticker call takes `delay` before answering.
    pub(crate) fn with_price_delay(mut self, delay: Duration) -> Self {
        self.price_delay = delay;
        self
    }

    /// Every order call takes `delay` before answering.
    pub(crate) fn with_order_delay(mut self, delay: Duration) -> Self {
        self.order_delay = delay;
        self
    }

    pub(crate) fn reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    pub(crate) fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }

    pub(crate) fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExchangeClient for ScriptedClient {
    async fn current_price(&self, _symbol: &str) -> Result<f64> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        if !self.price_delay.is_zero() {
            tokio::time::sleep(self.price_delay).await;
        }
        let tick = {
            let mut ticks = self.ticks.lock().unwrap();
            if ticks.len() > 1 {
                ticks.pop_front()
            } else {
                ticks.front().copied()
            }
        };
        match tick {
            Some(Tick::Price(p)) => Ok(p),
            Some(Tick::Fail) => Err(Error::Network("connection reset by peer".into())),
            None => Err(Error::Exchange("script exhausted".into())),
        }
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation> {
        if !self.order_delay.is_zero() {
            tokio::time::sleep(self.order_delay).await;
        }
        if self.reject_orders.load(Ordering::SeqCst) {
            return Err(Error::OrderRejected {
                status: 400,
                body: "Insufficient funds".into(),
            });
        }
        self.orders.lock().unwrap().push(order.clone());
        Ok(OrderConfirmation {
            order_id: order.client_oid.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            size: order.size,
            status: "pending".into(),
            fill_price: None,
            created_at: Utc::now(),
        })
    }
}

/// Polls until at least `n` trades are recorded. Intended for paused-clock tests.
pub(crate) async fn wait_for_trades(state: &BotState, n: usize) {
    for _ in 0..100_000 {
        if state.snapshot().await.trades.len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {n} trades");
}
