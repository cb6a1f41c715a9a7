use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::warn;

use common::{BotStatus, Error};

use crate::{auth::require_auth, AppState};

pub fn control_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/status", get(status))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

async fn start(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.engine.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Victory Bot started" })),
        ),
        Err(e) => control_error(e),
    }
}

async fn stop(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.engine.stop().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Victory Bot stopped" })),
        ),
        Err(e) => control_error(e),
    }
}

/// Loop errors only ever show up in `logs`; this endpoint always answers 200.
async fn status(State(state): State<AppState>) -> Json<BotStatus> {
    Json(state.engine.status().await)
}

fn control_error(e: Error) -> (StatusCode, Json<Value>) {
    let status = match e {
        Error::AlreadyRunning | Error::NotRunning => StatusCode::BAD_REQUEST,
        _ => {
            warn!(error = %e, "Control command failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    (status, Json(json!({ "error": e.to_string() })))
}
