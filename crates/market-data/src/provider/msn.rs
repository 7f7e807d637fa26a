//! MSN Finance adapter. Quote history only; every other report kind is a
//! permanent unsupported failure.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::FetchError;
use crate::models::{Cell, DataQuery, DataTable, DateRange, ReportKind, SourceId};
use crate::provider::headers::msn_headers;
use crate::provider::ProviderAdapter;

const MSN_CHART_URL: &str = "https://assets.msn.com/service/Finance/Charts/TimeRange";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// MSN Finance chart client
pub struct MsnAdapter {
    client: Client,
    api_key: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ChartSeries {
    #[serde(default)]
    time_stamps: Vec<String>,
    #[serde(default)]
    open_prices: Vec<f64>,
    #[serde(default)]
    prices_high: Vec<f64>,
    #[serde(default)]
    prices_low: Vec<f64>,
    #[serde(default)]
    prices: Vec<f64>,
    #[serde(default)]
    volumes: Vec<f64>,
}

#[derive(Deserialize)]
struct ChartResponse {
    #[serde(default)]
    series: Vec<ChartSeries>,
}

impl Default for MsnAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MsnAdapter {
    pub fn new() -> Self {
        let client = Client::builder()
            .default_headers(msn_headers())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        // MSN rotates its public chart key; operators override as needed.
        let api_key = std::env::var("VNGATE_MSN_API_KEY").unwrap_or_default();

        Self { client, api_key }
    }

    async fn history(&self, query: &DataQuery) -> Result<DataTable, FetchError> {
        let range = query.range.ok_or_else(|| {
            FetchError::InvalidQuery("history query is missing a date range".to_string())
        })?;

        let params = [
            ("apikey", self.api_key.clone()),
            ("ids", query.symbol.clone()),
            ("type", "All".to_string()),
            ("wrapodata", "false".to_string()),
        ];

        let response = self
            .client
            .get(MSN_CHART_URL)
            .query(&params)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(SourceId::Msn, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(SourceId::Msn, status));
        }

        let charts: Vec<ChartResponse> = response.json().await.map_err(|err| {
            FetchError::MalformedPayload {
                source: SourceId::Msn,
                message: err.to_string(),
            }
        })?;

        let series = charts
            .into_iter()
            .next()
            .map(|chart| chart.series.into_iter().next().unwrap_or_default())
            .unwrap_or_default();
        Ok(transform_series(&series, range))
    }
}

#[async_trait]
impl ProviderAdapter for MsnAdapter {
    fn id(&self) -> SourceId {
        SourceId::Msn
    }

    fn supports(&self, kind: ReportKind) -> bool {
        kind == ReportKind::History
    }

    async fn fetch(&self, query: &DataQuery) -> Result<DataTable, FetchError> {
        match query.kind {
            ReportKind::History => self.history(query).await,
            other => Err(FetchError::unsupported(SourceId::Msn, other)),
        }
    }
}

/// Filter the chart series to the requested range and normalize into the
/// standard OHLCV table shape.
fn transform_series(series: &ChartSeries, range: DateRange) -> DataTable {
    let mut time = Vec::new();
    let mut open = Vec::new();
    let mut high = Vec::new();
    let mut low = Vec::new();
    let mut close = Vec::new();
    let mut volume = Vec::new();

    for (i, stamp) in series.time_stamps.iter().enumerate() {
        let Ok(parsed) = DateTime::parse_from_rfc3339(stamp) else {
            continue;
        };
        let date = parsed.date_naive();
        if date < range.start || date > range.end {
            continue;
        }

        time.push(Cell::Text(date.format("%Y-%m-%d").to_string()));
        open.push(price_cell(series.open_prices.get(i)));
        high.push(price_cell(series.prices_high.get(i)));
        low.push(price_cell(series.prices_low.get(i)));
        close.push(price_cell(series.prices.get(i)));
        volume.push(
            series
                .volumes
                .get(i)
                .map_or(Cell::Null, |&v| Cell::Integer(v as i64)),
        );
    }

    let mut table = DataTable::new();
    table.push_column("time", time);
    table.push_column("open", open);
    table.push_column("high", high);
    table.push_column("low", low);
    table.push_column("close", close);
    table.push_column("volume", volume);
    table
}

fn price_cell(raw: Option<&f64>) -> Cell {
    raw.and_then(|&value| Decimal::from_f64_retain(value))
        .map_or(Cell::Null, Cell::Decimal)
}
