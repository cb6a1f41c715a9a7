use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{BotState, Config, ExchangeClient, TradingMode};
use engine::{CoinbaseClient, Engine, EngineConfig};
use paper::PaperClient;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(
        mode = %cfg.trading_mode,
        symbol = %cfg.symbol,
        size = cfg.order_size,
        "Victory Bot starting"
    );

    // ── Exchange client (injected based on TRADING_MODE) ──────────────────────
    let exchange_client: Arc<dyn ExchangeClient> = match cfg.trading_mode {
        TradingMode::Live => {
            info!(base_url = %cfg.base_url, "Live trading mode — using CoinbaseClient");
            let creds = cfg
                .credentials
                .clone()
                .unwrap_or_else(|| panic!("Live mode requires exchange credentials"));
            Arc::new(
                CoinbaseClient::new(&cfg.base_url, creds)
                    .unwrap_or_else(|e| panic!("Failed to build exchange client: {e}")),
            )
        }
        TradingMode::Paper => {
            info!(
                slippage_bps = cfg.paper_slippage_bps,
                "Paper trading mode — using PaperClient"
            );
            let feed = CoinbaseClient::public(&cfg.base_url)
                .unwrap_or_else(|e| panic!("Failed to build exchange client: {e}"));
            Arc::new(PaperClient::new(Arc::new(feed), cfg.paper_slippage_bps))
        }
    };

    // ── Engine ────────────────────────────────────────────────────────────────
    let state = Arc::new(BotState::new());
    let (engine, engine_handle) = Engine::new(
        EngineConfig::new(cfg.symbol.clone(), cfg.order_size),
        exchange_client,
        state,
    );
    let engine_task = tokio::spawn(engine.run());

    // ── Control API ───────────────────────────────────────────────────────────
    let api_state = api::AppState {
        engine: engine_handle,
        trading_mode: cfg.trading_mode,
        control_token: cfg.control_token.clone(),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {e}");
        }
        info!("Shutdown signal received. Exiting.");
    };

    if let Err(e) = api::serve(api_state, cfg.control_port, shutdown).await {
        error!(port = cfg.control_port, "Control API failed: {e}");
    }

    // The server owned the last engine handle; the engine stops its loop and exits.
    if let Err(e) = engine_task.await {
        error!("Engine task ended abnormally: {e}");
    }
}
