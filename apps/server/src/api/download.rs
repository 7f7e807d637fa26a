//! CSV download endpoints: single file, text payload, multi-symbol.

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Map, Value};

use vngate_format as format;
use vngate_market_data::{DataQuery, DispatchOutcome, Interval, SourceId};

use crate::api::dispatch_table;
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::main_lib::AppState;
use crate::models::{normalize_symbol, parse_range, CsvDownloadRequest, MultipleCsvRequest};

fn history_query(
    symbol: &str,
    source: SourceId,
    start_date: &str,
    end_date: &str,
    interval: Interval,
) -> ApiResult<DataQuery> {
    let symbol = normalize_symbol(symbol)?;
    let range = parse_range(start_date, end_date)?;
    Ok(DataQuery::history(symbol, source, range, interval))
}

fn csv_file_response(filename: String, csv: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        csv,
    )
        .into_response()
}

async fn download_csv(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CsvDownloadRequest>,
) -> ApiResult<Response> {
    let query = history_query(
        &request.symbol,
        request.source,
        &request.start_date,
        &request.end_date,
        request.interval,
    )?;
    let table = dispatch_table(&state, &query).await?;

    // Single downloads carry the ticker column too, same as combined ones.
    let tagged = format::combine(&[(query.symbol.clone(), table)]);
    let csv = format::to_csv(&tagged)?;
    let filename = format!(
        "{}_{}_{}.csv",
        query.symbol, request.start_date, request.end_date
    );
    Ok(csv_file_response(filename, csv))
}

async fn download_csv_text(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CsvDownloadRequest>,
) -> ApiResult<Json<Value>> {
    let query = history_query(
        &request.symbol,
        request.source,
        &request.start_date,
        &request.end_date,
        request.interval,
    )?;
    let table = dispatch_table(&state, &query).await?;

    let tagged = format::combine(&[(query.symbol.clone(), table)]);
    let csv = format::to_csv(&tagged)?;
    Ok(Json(json!({
        "symbol": query.symbol,
        "start_date": request.start_date,
        "end_date": request.end_date,
        "data_size": csv.len(),
        "csv_data": csv,
    })))
}

async fn download_multiple(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<MultipleCsvRequest>,
) -> ApiResult<Response> {
    if request.symbols.is_empty() {
        return Err(ApiError::BadRequest("symbols must not be empty".to_string()));
    }
    let symbols: Vec<String> = request
        .symbols
        .iter()
        .map(|s| normalize_symbol(s))
        .collect::<Result<_, _>>()?;
    let range = parse_range(&request.start_date, &request.end_date)?;

    let template = DataQuery::history(symbols[0].clone(), request.source, range, request.interval);
    let outcomes = state
        .dispatcher
        .dispatch_many(&symbols, &template, state.request_timeout)
        .await;

    if request.combine {
        let mut tables = Vec::new();
        for (symbol, outcome) in outcomes {
            match outcome {
                DispatchOutcome::Success(table) if !table.is_empty() => {
                    tables.push((symbol, table));
                }
                DispatchOutcome::Success(_) => {}
                DispatchOutcome::Failure { message, .. } => {
                    tracing::warn!("Skipping '{symbol}' in combined download: {message}");
                }
            }
        }
        if tables.is_empty() {
            return Err(ApiError::BadRequest(
                "No data could be fetched for any symbols".to_string(),
            ));
        }

        let merged = format::combine(&tables);
        let csv = format::to_csv(&merged)?;
        let filename = format!("combined_{}_{}.csv", request.start_date, request.end_date);
        Ok(csv_file_response(filename, csv))
    } else {
        let mut csv_data = Map::new();
        for (symbol, outcome) in outcomes {
            let value = match outcome {
                DispatchOutcome::Success(table) => {
                    let tagged = format::combine(&[(symbol.clone(), table)]);
                    Value::from(format::to_csv(&tagged)?)
                }
                DispatchOutcome::Failure { message, .. } => {
                    tracing::warn!("Download failed for '{symbol}': {message}");
                    Value::Null
                }
            };
            csv_data.insert(symbol, value);
        }

        Ok(Json(json!({
            "symbols": symbols,
            "start_date": request.start_date,
            "end_date": request.end_date,
            "csv_data": csv_data,
            "total_symbols": symbols.len(),
        }))
        .into_response())
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/csv", post(download_csv))
        .route("/csv-text", post(download_csv_text))
        .route("/multiple", post(download_multiple))
}
