//! Company information endpoints.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};

use vngate_format::{to_json, FormatOptions};
use vngate_market_data::{DataQuery, ReportKind};

use crate::api::dispatch_table;
use crate::error::{ApiJson, ApiResult};
use crate::main_lib::AppState;
use crate::models::{normalize_symbol, CompanyFilterRequest, CompanyRequest};

async fn company_report(
    state: &AppState,
    request: CompanyRequest,
    kind: ReportKind,
) -> ApiResult<Json<Value>> {
    let symbol = normalize_symbol(&request.symbol)?;
    let query = DataQuery::report(symbol.clone(), request.source, kind).with_lang(request.lang);
    let table = dispatch_table(state, &query).await?;
    Ok(Json(json!({
        "symbol": symbol,
        "data": to_json(&table, &FormatOptions::default()),
        "source": request.source,
    })))
}

async fn filtered_report(
    state: &AppState,
    request: CompanyFilterRequest,
    kind: ReportKind,
) -> ApiResult<Json<Value>> {
    let symbol = normalize_symbol(&request.symbol)?;
    let query = DataQuery::report(symbol.clone(), request.source, kind)
        .with_lang(request.lang)
        .with_filter(request.filter_by.clone());
    let table = dispatch_table(state, &query).await?;
    Ok(Json(json!({
        "symbol": symbol,
        "filter_by": request.filter_by,
        "data": to_json(&table, &FormatOptions::default()),
        "source": request.source,
    })))
}

async fn overview(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CompanyRequest>,
) -> ApiResult<Json<Value>> {
    company_report(&state, request, ReportKind::CompanyOverview).await
}

async fn shareholders(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CompanyRequest>,
) -> ApiResult<Json<Value>> {
    company_report(&state, request, ReportKind::Shareholders).await
}

async fn officers(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CompanyFilterRequest>,
) -> ApiResult<Json<Value>> {
    filtered_report(&state, request, ReportKind::Officers).await
}

async fn subsidiaries(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CompanyFilterRequest>,
) -> ApiResult<Json<Value>> {
    filtered_report(&state, request, ReportKind::Subsidiaries).await
}

async fn affiliate(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CompanyRequest>,
) -> ApiResult<Json<Value>> {
    company_report(&state, request, ReportKind::Affiliates).await
}

async fn news(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CompanyRequest>,
) -> ApiResult<Json<Value>> {
    company_report(&state, request, ReportKind::CompanyNews).await
}

async fn events(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CompanyRequest>,
) -> ApiResult<Json<Value>> {
    company_report(&state, request, ReportKind::CompanyEvents).await
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/overview", post(overview))
        .route("/shareholders", post(shareholders))
        .route("/officers", post(officers))
        .route("/subsidiaries", post(subsidiaries))
        .route("/affiliate", post(affiliate))
        .route("/news", post(news))
        .route("/events", post(events))
}
