//! VCI (Vietcap) adapter for price history, price board, company and
//! financial reports.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::errors::FetchError;
use crate::models::{Cell, DataQuery, DataTable, DateRange, Interval, ReportKind, SourceId};
use crate::provider::headers::vci_headers;
use crate::provider::{table_from_objects, ProviderAdapter};

const VCI_BASE_URL: &str = "https://trading.vietcap.com.vn/api";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Price multiplier - VCI returns prices in 1000 VND units
const PRICE_MULTIPLIER: f64 = 1000.0;

/// VCI API client for stock data
pub struct VciAdapter {
    client: Client,
}

/// Request payload for OHLC chart data
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OhlcRequest {
    time_frame: String,
    symbols: Vec<String>,
    to: i64,
    count_back: i64,
}

/// One OHLC series in the chart response, parallel arrays per field.
#[derive(Deserialize, Default)]
struct OhlcSeries {
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    o: Vec<f64>,
    #[serde(default)]
    h: Vec<f64>,
    #[serde(default)]
    l: Vec<f64>,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    v: Vec<f64>,
}

impl Default for VciAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl VciAdapter {
    pub fn new() -> Self {
        let client = Client::builder()
            .default_headers(vci_headers())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Get historical OHLC data for the query's symbol and range
    async fn history(&self, query: &DataQuery) -> Result<DataTable, FetchError> {
        let range = query.range.ok_or_else(|| {
            FetchError::InvalidQuery("history query is missing a date range".to_string())
        })?;
        let url = format!("{VCI_BASE_URL}/chart/OHLCChart/gap-chart");

        // End timestamp (end of day); 23:59:59 is always a valid time
        let end_timestamp = range
            .end
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .and_utc()
            .timestamp();

        let payload = OhlcRequest {
            time_frame: api_time_frame(query.interval).to_string(),
            symbols: vec![query.symbol.clone()],
            to: end_timestamp,
            count_back: count_back(range, query.interval),
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(SourceId::Vci, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(SourceId::Vci, status));
        }

        let data: Vec<OhlcSeries> = response.json().await.map_err(|err| {
            FetchError::MalformedPayload {
                source: SourceId::Vci,
                message: err.to_string(),
            }
        })?;

        let series = data.into_iter().next().unwrap_or_default();
        Ok(self.transform_ohlc_series(&series, range, query.interval))
    }

    /// Transform the parallel-array OHLC response into a table, filtered to
    /// the requested date range.
    fn transform_ohlc_series(
        &self,
        series: &OhlcSeries,
        range: DateRange,
        interval: Interval,
    ) -> DataTable {
        let mut time = Vec::new();
        let mut open = Vec::new();
        let mut high = Vec::new();
        let mut low = Vec::new();
        let mut close = Vec::new();
        let mut volume = Vec::new();

        for (i, &ts) in series.t.iter().enumerate() {
            let Some(timestamp) = DateTime::from_timestamp(ts, 0) else {
                continue;
            };
            let date = timestamp.date_naive();
            if date < range.start || date > range.end {
                continue;
            }

            let rendered = if interval.is_intraday() {
                timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
            } else {
                date.format("%Y-%m-%d").to_string()
            };
            time.push(Cell::Text(rendered));
            open.push(price_cell(series.o.get(i)));
            high.push(price_cell(series.h.get(i)));
            low.push(price_cell(series.l.get(i)));
            close.push(price_cell(series.c.get(i)));
            volume.push(
                series
                    .v
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

    /// Current price board rows for a symbol
    async fn price_board(&self, symbol: &str) -> Result<DataTable, FetchError> {
        let url = format!("{VCI_BASE_URL}/price/symbols/getList");
        let payload = serde_json::json!({ "symbols": [symbol] });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(SourceId::Vci, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(SourceId::Vci, status));
        }

        let rows: Vec<Value> = response.json().await.map_err(|err| {
            FetchError::MalformedPayload {
                source: SourceId::Vci,
                message: err.to_string(),
            }
        })?;
        table_from_objects(SourceId::Vci, &rows)
    }

    /// Company information section (overview, shareholders, officers, ...)
    async fn company_section(
        &self,
        query: &DataQuery,
        section: &str,
    ) -> Result<DataTable, FetchError> {
        let url = format!("{VCI_BASE_URL}/company/{}/{}", query.symbol, section);
        let mut params = vec![("lang", query.lang.as_str().to_string())];
        if let Some(filter) = &query.filter {
            params.push(("filter", filter.clone()));
        }
        let rows = self.get_rows(&url, &params).await?;
        table_from_objects(SourceId::Vci, &rows)
    }

    /// Financial statement or ratio report
    async fn financial_statement(
        &self,
        query: &DataQuery,
        statement: &str,
    ) -> Result<DataTable, FetchError> {
        let url = format!("{VCI_BASE_URL}/financial/{}/{}", query.symbol, statement);
        let params = vec![
            ("period", query.period.as_str().to_string()),
            ("lang", query.lang.as_str().to_string()),
        ];
        let rows = self.get_rows(&url, &params).await?;
        let table = table_from_objects(SourceId::Vci, &rows)?;

        if query.kind == ReportKind::FinancialRatios {
            // Ratio columns arrive as "<section>|<metric>"; split into the
            // two naming levels so the formatter can flatten on demand.
            Ok(split_grouped_names(table))
        } else {
            Ok(table)
        }
    }

    async fn get_rows(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<Value>, FetchError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(SourceId::Vci, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(SourceId::Vci, status));
        }
        response.json().await.map_err(|err| FetchError::MalformedPayload {
            source: SourceId::Vci,
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl ProviderAdapter for VciAdapter {
    fn id(&self) -> SourceId {
        SourceId::Vci
    }

    fn supports(&self, kind: ReportKind) -> bool {
        matches!(
            kind,
            ReportKind::History
                | ReportKind::PriceBoard
                | ReportKind::CompanyOverview
                | ReportKind::Shareholders
                | ReportKind::Officers
                | ReportKind::Subsidiaries
                | ReportKind::Affiliates
                | ReportKind::CompanyNews
                | ReportKind::CompanyEvents
                | ReportKind::BalanceSheet
                | ReportKind::IncomeStatement
                | ReportKind::CashFlow
                | ReportKind::FinancialRatios
        )
    }

    async fn fetch(&self, query: &DataQuery) -> Result<DataTable, FetchError> {
        match query.kind {
            ReportKind::History => self.history(query).await,
            ReportKind::PriceBoard => self.price_board(&query.symbol).await,
            ReportKind::CompanyOverview => self.company_section(query, "overview").await,
            ReportKind::Shareholders => self.company_section(query, "shareholders").await,
            ReportKind::Officers => self.company_section(query, "officers").await,
            ReportKind::Subsidiaries => self.company_section(query, "subsidiaries").await,
            ReportKind::Affiliates => self.company_section(query, "affiliates").await,
            ReportKind::CompanyNews => self.company_section(query, "news").await,
            ReportKind::CompanyEvents => self.company_section(query, "events").await,
            ReportKind::BalanceSheet => self.financial_statement(query, "balance-sheet").await,
            ReportKind::IncomeStatement => {
                self.financial_statement(query, "income-statement").await
            }
            ReportKind::CashFlow => self.financial_statement(query, "cash-flow").await,
            ReportKind::FinancialRatios => self.financial_statement(query, "ratios").await,
            other => Err(FetchError::unsupported(SourceId::Vci, other)),
        }
    }
}

/// VCI chart API time frame for an interval. Weekly/monthly bars are served
/// as daily and resampled upstream of the caller.
fn api_time_frame(interval: Interval) -> &'static str {
    match interval {
        Interval::OneMinute
        | Interval::FiveMinutes
        | Interval::FifteenMinutes
        | Interval::ThirtyMinutes => "ONE_MINUTE",
        Interval::OneHour => "ONE_HOUR",
        Interval::Daily | Interval::Weekly | Interval::Monthly => "ONE_DAY",
    }
}

/// Number of bars to request so the range is fully covered.
fn count_back(range: DateRange, interval: Interval) -> i64 {
    let days = range.days();
    match interval {
        Interval::Daily | Interval::Weekly | Interval::Monthly => days,
        Interval::OneHour => days * 7, // ~7 trading hours per day
        Interval::ThirtyMinutes => days * 14,
        Interval::FifteenMinutes => days * 28,
        Interval::FiveMinutes => days * 84,
        Interval::OneMinute => days * 390, // minutes per trading day
    }
}

fn price_cell(raw: Option<&f64>) -> Cell {
    raw.and_then(|&value| Decimal::from_f64_retain(value * PRICE_MULTIPLIER))
        .map_or(Cell::Null, Cell::Decimal)
}

/// Split "group|name" column names into grouped columns.
fn split_grouped_names(table: DataTable) -> DataTable {
    let mut result = DataTable::new();
    for column in table.columns() {
        match column.name.split_once('|') {
            Some((group, name)) => {
                result.push_grouped_column(group, name, column.values.clone());
            }
            None => result.push_column(column.name.clone(), column.values.clone()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_transform_filters_range_and_scales_prices() {
        let adapter = VciAdapter::new();
        let in_range = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp();
        let out_of_range = NaiveDate::from_ymd_opt(2023, 12, 1)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp();

        let series = OhlcSeries {
            t: vec![out_of_range, in_range],
            o: vec![80.0, 90.0],
            h: vec![81.0, 92.0],
            l: vec![79.5, 89.5],
            c: vec![80.5, 91.5],
            v: vec![1000.0, 2500.0],
        };

        let table =
            adapter.transform_ohlc_series(&series, range((2024, 1, 1), (2024, 1, 31)), Interval::Daily);

        assert_eq!(table.row_count(), 1);
        assert_eq!(
            table.column("time").unwrap().values[0],
            Cell::Text("2024-01-10".to_string())
        );
        assert_eq!(
            table.column("close").unwrap().values[0],
            Cell::Decimal(Decimal::from_f64_retain(91500.0).unwrap())
        );
        assert_eq!(table.column("volume").unwrap().values[0], Cell::Integer(2500));
    }

    #[test]
    fn test_count_back_scales_with_interval() {
        let r = range((2024, 1, 1), (2024, 1, 10));
        assert_eq!(count_back(r, Interval::Daily), 10);
        assert_eq!(count_back(r, Interval::OneHour), 70);
        assert_eq!(count_back(r, Interval::OneMinute), 3900);
    }

    #[test]
    fn test_split_grouped_names() {
        let mut table = DataTable::new();
        table.push_column("liquidity|current_ratio", vec![Cell::from(2)]);
        table.push_column("year", vec![Cell::from(2024)]);

        let split = split_grouped_names(table);
        let grouped = &split.columns()[0];
        assert_eq!(grouped.group.as_deref(), Some("liquidity"));
        assert_eq!(grouped.name, "current_ratio");
        assert!(split.columns()[1].group.is_none());
    }

    #[test]
    fn test_supports_excludes_tcbs_only_kinds() {
        let adapter = VciAdapter::new();
        assert!(adapter.supports(ReportKind::History));
        assert!(adapter.supports(ReportKind::Affiliates));
        assert!(!adapter.supports(ReportKind::TradingStats));
        assert!(!adapter.supports(ReportKind::InsiderDeals));
    }
}
