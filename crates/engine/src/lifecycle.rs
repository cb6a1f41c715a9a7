use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use common::{BotState, BotStatus, EngineState, Error, ExchangeClient, Result};

use crate::trader::{EngineConfig, Trader};

type Reply = oneshot::Sender<Result<()>>;

enum Command {
    Start(Reply),
    Stop(Reply),
}

/// Cloneable handle passed to the control surface.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<Command>,
    state: Arc<BotState>,
}

impl EngineHandle {
    /// Start the trade loop. Fails with `AlreadyRunning` if it is running.
    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await
    }

    /// Signal the trade loop to stop. Fails with `NotRunning` if it is stopped.
    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await
    }

    pub fn state(&self) -> EngineState {
        self.state.is_running().into()
    }

    pub async fn status(&self) -> BotStatus {
        self.state.snapshot().await
    }

    async fn request(&self, command: fn(Reply) -> Command) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| Error::EngineUnavailable)?;
        reply_rx.await.map_err(|_| Error::EngineUnavailable)?
    }
}

/// The running trade loop and the signal that ends it.
struct ActiveLoop {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the STOPPED/RUNNING state machine and the trade loop task.
///
/// Commands are processed one at a time, so start and stop never race each
/// other. At most one loop trades at a time: a new loop waits for the stopped
/// one to finish before it fetches its reference price.
pub struct Engine {
    config: EngineConfig,
    client: Arc<dyn ExchangeClient>,
    state: Arc<BotState>,
    command_rx: mpsc::Receiver<Command>,
    active: Option<ActiveLoop>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        client: Arc<dyn ExchangeClient>,
        state: Arc<BotState>,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let handle = EngineHandle {
            command_tx,
            state: state.clone(),
        };

        let engine = Engine {
            config,
            client,
            state,
            command_rx,
            active: None,
        };

        (engine, handle)
    }

    /// Process commands until every handle is dropped. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!(
            symbol = %self.config.symbol,
            "Engine initialized in Stopped state. Waiting for Start command."
        );

        while let Some(command) = self.command_rx.recv().await {
            match command {
                Command::Start(reply) => {
                    let result = self.start().await;
                    let _ = reply.send(result);
                }
                Command::Stop(reply) => {
                    let _ = reply.send(self.stop());
                }
            }
        }

        warn!("Engine command channel closed — shutting down");
        if self.state.is_running() {
            let _ = self.stop();
        }
        self.join_previous().await;
    }

    async fn start(&mut self) -> Result<()> {
        if self.state.is_running() {
            info!("Engine already running");
            return Err(Error::AlreadyRunning);
        }

        // A stopped loop may still be finishing an order call. The new loop
        // waits for it inside its own task so this command returns at once.
        let previous = self.active.take().map(|active| active.task);

        let (stop_tx, stop_rx) = watch::channel(false);
        self.state.set_running(true);
        let trader = Trader::new(self.config.clone(), self.client.clone(), self.state.clone());
        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    error!(error = %e, "Trade loop task ended abnormally");
                }
            }
            trader.run(stop_rx).await;
        });
        self.active = Some(ActiveLoop { stop_tx, task });

        info!(
            symbol = %self.config.symbol,
            size = self.config.order_size,
            "Engine started"
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.state.is_running() {
            info!("Engine not running");
            return Err(Error::NotRunning);
        }

        self.state.set_running(false);
        if let Some(active) = &self.active {
            // The loop may already be gone; nothing to signal then.
            let _ = active.stop_tx.send(true);
        }
        info!("Engine stopping — trade loop signalled");
        Ok(())
    }

    /// Wait for the last loop, and every loop it waits on, to finish.
    async fn join_previous(&mut self) {
        if let Some(active) = self.active.take() {
            if let Err(e) = active.task.await {
                error!(error = %e, "Trade loop task ended abnormally");
            }
        }
    }
}
