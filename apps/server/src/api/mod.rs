//! HTTP surface: route table, shared layers and dispatch helpers.

pub mod auth;
pub mod company;
pub mod download;
pub mod financial;
pub mod trading;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use vngate_market_data::{DataQuery, DataTable, DispatchOutcome};

use crate::auth::require_jwt;
use crate::config::Config;
use crate::error::{dispatch_failure, ApiResult};
use crate::main_lib::AppState;

/// Liveness probe, unauthenticated.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Known symbol list. A static VN30-style seed; full coverage lives with
/// the upstream sources themselves.
async fn symbols() -> Json<serde_json::Value> {
    const SYMBOLS: [&str; 20] = [
        "VCB", "FPT", "HPG", "MWG", "VNM", "VIC", "BID", "CTG", "TCB", "ACB",
        "HDB", "MBB", "STB", "TPB", "VGI", "SAB", "PLX", "GAS", "POW", "REE",
    ];
    Json(json!({ "symbols": SYMBOLS, "total": SYMBOLS.len() }))
}

/// Run one query through the dispatcher under the request deadline and
/// translate a classified failure into the HTTP error taxonomy.
pub(crate) async fn dispatch_table(state: &AppState, query: &DataQuery) -> ApiResult<DataTable> {
    match state
        .dispatcher
        .dispatch_with_deadline(query, state.request_timeout)
        .await
    {
        DispatchOutcome::Success(table) => Ok(table),
        DispatchOutcome::Failure {
            kind,
            message,
            attempts,
        } => Err(dispatch_failure(kind, message, attempts)),
    }
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .map(|o| o.parse().unwrap())
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/api/v1/symbols", get(symbols))
        .nest("/api/v1/download", download::router())
        .nest("/api/v1/company", company::router())
        .nest("/api/v1/financial", financial::router())
        .nest("/api/v1/trading", trading::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_jwt));

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/api/v1/health", get(health))
        .merge(protected)
        .with_state(state)
        .layer(cors)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}
