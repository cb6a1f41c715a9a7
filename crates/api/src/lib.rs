mod auth;
pub mod routes;
#[cfg(test)]
mod testing;

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use common::{Result, TradingMode};
use engine::EngineHandle;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub trading_mode: TradingMode,
    /// Bearer token guarding the control routes. `None` leaves them open.
    pub control_token: Option<String>,
}

/// Build the control API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::control_router(state.clone()))
        .merge(routes::health_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve the control API until `shutdown` resolves.
///
/// Binding or accept-loop failures surface as `Error::Io`.
pub async fn serve<F>(state: AppState, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, guarded = state.control_token.is_some(), "Control API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
