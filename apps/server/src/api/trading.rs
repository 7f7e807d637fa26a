//! Trading data endpoints.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};

use vngate_format::{combine, to_json, FormatOptions};
use vngate_market_data::{DataQuery, DispatchOutcome, ReportKind};

use crate::api::dispatch_table;
use crate::error::{dispatch_failure, ApiError, ApiJson, ApiResult};
use crate::main_lib::AppState;
use crate::models::{
    normalize_symbol, parse_range, PriceBoardRequest, PriceHistoryRequest, TradingRequest,
    TradingStatsRequest,
};

async fn trading_report(
    state: &AppState,
    request: TradingRequest,
    kind: ReportKind,
) -> ApiResult<Json<Value>> {
    let symbol = normalize_symbol(&request.symbol)?;
    let query = DataQuery::report(symbol.clone(), request.source, kind);
    let table = dispatch_table(state, &query).await?;
    Ok(Json(json!({
        "symbol": symbol,
        "data": to_json(&table, &FormatOptions::default()),
        "source": request.source,
    })))
}

async fn stats(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TradingStatsRequest>,
) -> ApiResult<Json<Value>> {
    let symbol = normalize_symbol(&request.symbol)?;
    let mut query = DataQuery::report(symbol.clone(), request.source, ReportKind::TradingStats)
        .with_limit(request.limit);
    if let (Some(start), Some(end)) = (&request.start, &request.end) {
        query = query.with_range(parse_range(start, end)?);
    }
    let table = dispatch_table(&state, &query).await?;
    Ok(Json(json!({
        "symbol": symbol,
        "start": request.start,
        "end": request.end,
        "limit": request.limit,
        "data": to_json(&table, &FormatOptions::default()),
        "source": request.source,
    })))
}

async fn side_stats(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TradingRequest>,
) -> ApiResult<Json<Value>> {
    trading_report(&state, request, ReportKind::SideStats).await
}

/// Price board for several symbols: fan out per-symbol queries against one
/// source, merge the rows into a single ticker-tagged table.
async fn price_board(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<PriceBoardRequest>,
) -> ApiResult<Json<Value>> {
    if request.symbols_list.is_empty() {
        return Err(ApiError::BadRequest(
            "symbols_list must not be empty".to_string(),
        ));
    }
    let symbols: Vec<String> = request
        .symbols_list
        .iter()
        .map(|s| normalize_symbol(s))
        .collect::<Result<_, _>>()?;

    let template = DataQuery::report(symbols[0].clone(), request.source, ReportKind::PriceBoard);
    let outcomes = state
        .dispatcher
        .dispatch_many(&symbols, &template, state.request_timeout)
        .await;

    let mut tables = Vec::new();
    let mut first_failure = None;
    for (symbol, outcome) in outcomes {
        match outcome {
            DispatchOutcome::Success(table) => tables.push((symbol, table)),
            DispatchOutcome::Failure {
                kind,
                message,
                attempts,
            } => {
                tracing::warn!("Price board failed for '{symbol}': {message}");
                first_failure.get_or_insert(dispatch_failure(kind, message, attempts));
            }
        }
    }
    if tables.is_empty() {
        if let Some(failure) = first_failure {
            return Err(failure);
        }
    }

    let merged = combine(&tables);
    Ok(Json(json!({
        "symbols": symbols,
        "data": to_json(&merged, &FormatOptions::default()),
        "source": request.source,
    })))
}

async fn price_history(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<PriceHistoryRequest>,
) -> ApiResult<Json<Value>> {
    let symbol = normalize_symbol(&request.symbol)?;
    let range = parse_range(&request.start, &request.end)?;
    let query = DataQuery::history(symbol.clone(), request.source, range, request.interval);
    let table = dispatch_table(&state, &query).await?;
    Ok(Json(json!({
        "symbol": symbol,
        "start": request.start,
        "end": request.end,
        "interval": request.interval,
        "data": to_json(&table, &FormatOptions::default()),
        "source": request.source,
    })))
}

async fn foreign_trade(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TradingRequest>,
) -> ApiResult<Json<Value>> {
    trading_report(&state, request, ReportKind::ForeignTrade).await
}

async fn prop_trade(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TradingRequest>,
) -> ApiResult<Json<Value>> {
    trading_report(&state, request, ReportKind::PropTrade).await
}

async fn insider_deal(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TradingRequest>,
) -> ApiResult<Json<Value>> {
    trading_report(&state, request, ReportKind::InsiderDeals).await
}

async fn order_stats(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TradingRequest>,
) -> ApiResult<Json<Value>> {
    trading_report(&state, request, ReportKind::OrderStats).await
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", post(stats))
        .route("/side-stats", post(side_stats))
        .route("/price-board", post(price_board))
        .route("/price-history", post(price_history))
        .route("/foreign-trade", post(foreign_trade))
        .route("/prop-trade", post(prop_trade))
        .route("/insider-deal", post(insider_deal))
        .route("/order-stats", post(order_stats))
}
