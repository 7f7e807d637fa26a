//! Financial statement and ratio endpoints.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};

use vngate_format::{to_json, FormatOptions};
use vngate_market_data::{DataQuery, ReportKind};

use crate::api::dispatch_table;
use crate::error::{ApiJson, ApiResult};
use crate::main_lib::AppState;
use crate::models::{normalize_symbol, FinancialRatioRequest, FinancialReportRequest};

async fn statement(
    state: &AppState,
    request: FinancialReportRequest,
    kind: ReportKind,
) -> ApiResult<Json<Value>> {
    let symbol = normalize_symbol(&request.symbol)?;
    let query = DataQuery::report(symbol.clone(), request.source, kind)
        .with_period(request.period)
        .with_lang(request.lang);
    let table = dispatch_table(state, &query).await?;

    let options = FormatOptions::default().dropna(request.dropna);
    Ok(Json(json!({
        "symbol": symbol,
        "period": request.period,
        "lang": request.lang,
        "data": to_json(&table, &options),
        "source": request.source,
    })))
}

async fn balance_sheet(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<FinancialReportRequest>,
) -> ApiResult<Json<Value>> {
    statement(&state, request, ReportKind::BalanceSheet).await
}

async fn income_statement(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<FinancialReportRequest>,
) -> ApiResult<Json<Value>> {
    statement(&state, request, ReportKind::IncomeStatement).await
}

async fn cash_flow(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<FinancialReportRequest>,
) -> ApiResult<Json<Value>> {
    statement(&state, request, ReportKind::CashFlow).await
}

async fn ratios(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<FinancialRatioRequest>,
) -> ApiResult<Json<Value>> {
    let symbol = normalize_symbol(&request.symbol)?;
    let query = DataQuery::report(symbol.clone(), request.source, ReportKind::FinancialRatios)
        .with_period(request.period);
    let table = dispatch_table(&state, &query).await?;

    let options =
        FormatOptions::default().flatten(request.flatten_columns, request.separator.clone());
    Ok(Json(json!({
        "symbol": symbol,
        "period": request.period,
        "flatten_columns": request.flatten_columns,
        "data": to_json(&table, &options),
        "source": request.source,
    })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/balance-sheet", post(balance_sheet))
        .route("/income-statement", post(income_statement))
        .route("/cash-flow", post(cash_flow))
        .route("/ratios", post(ratios))
}
