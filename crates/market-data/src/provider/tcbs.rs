//! TCBS adapter for price history, company, financial and trading
//! statistics reports.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::errors::FetchError;
use crate::models::{DataQuery, DataTable, Interval, ReportKind, ReportPeriod, SourceId};
use crate::provider::headers::tcbs_headers;
use crate::provider::{table_from_objects, ProviderAdapter};

const TCBS_BASE_URL: &str = "https://apipubaws.tcbs.com.vn";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAGE_SIZE: usize = 1000;

/// TCBS API client for stock data
pub struct TcbsAdapter {
    client: Client,
}

/// Paged or keyed list responses share this envelope.
#[derive(Deserialize)]
struct ListEnvelope {
    #[serde(default, alias = "listShareHolder", alias = "listKeyOfficer")]
    #[serde(alias = "listSubCompany", alias = "listActivityNews")]
    #[serde(alias = "listEventNews", alias = "listInsiderDealing")]
    data: Vec<Value>,
}

impl Default for TcbsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TcbsAdapter {
    pub fn new() -> Self {
        let client = Client::builder()
            .default_headers(tcbs_headers())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Historical OHLC bars
    async fn history(&self, query: &DataQuery) -> Result<DataTable, FetchError> {
        let range = query.range.ok_or_else(|| {
            FetchError::InvalidQuery("history query is missing a date range".to_string())
        })?;
        let url = format!("{TCBS_BASE_URL}/stock-insight/v1/stock/bars-long-term");

        // 23:59:59 is always a valid time of day
        let from = range.start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let to = range.end.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp();
        let params = [
            ("ticker", query.symbol.clone()),
            ("type", "stock".to_string()),
            ("resolution", api_resolution(query.interval).to_string()),
            ("from", from.to_string()),
            ("to", to.to_string()),
        ];

        let rows = self.get_list(&url, &params).await?;
        table_from_objects(SourceId::Tcbs, &rows)
    }

    /// Company overview is a single object, returned as a one-row table
    async fn overview(&self, query: &DataQuery) -> Result<DataTable, FetchError> {
        let url = format!(
            "{TCBS_BASE_URL}/tcanalysis/v1/ticker/{}/overview",
            query.symbol
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(SourceId::Tcbs, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(SourceId::Tcbs, status));
        }
        let row: Value = response.json().await.map_err(|err| {
            FetchError::MalformedPayload {
                source: SourceId::Tcbs,
                message: err.to_string(),
            }
        })?;
        table_from_objects(SourceId::Tcbs, std::slice::from_ref(&row))
    }

    /// Keyed company list (shareholders, officers, subsidiaries, news, ...)
    async fn company_list(
        &self,
        query: &DataQuery,
        path: &str,
    ) -> Result<DataTable, FetchError> {
        let url = format!(
            "{TCBS_BASE_URL}/tcanalysis/v1/company/{}/{}",
            query.symbol, path
        );
        let size = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let params = [
            ("page", "0".to_string()),
            ("size", size.to_string()),
        ];
        let rows = self.get_list(&url, &params).await?;
        table_from_objects(SourceId::Tcbs, &rows)
    }

    /// Financial statement or ratio report
    async fn financial_statement(
        &self,
        query: &DataQuery,
        statement: &str,
    ) -> Result<DataTable, FetchError> {
        let url = format!(
            "{TCBS_BASE_URL}/tcanalysis/v1/finance/{}/{}",
            query.symbol, statement
        );
        let yearly = match query.period {
            ReportPeriod::Annual => "1",
            ReportPeriod::Quarter => "0",
        };
        let params = [
            ("yearly", yearly.to_string()),
            ("isAll", "true".to_string()),
        ];

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(SourceId::Tcbs, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(SourceId::Tcbs, status));
        }
        let rows: Vec<Value> = response.json().await.map_err(|err| {
            FetchError::MalformedPayload {
                source: SourceId::Tcbs,
                message: err.to_string(),
            }
        })?;
        table_from_objects(SourceId::Tcbs, &rows)
    }

    /// Intraday trading statistics, paged
    async fn trading_stats(&self, query: &DataQuery) -> Result<DataTable, FetchError> {
        let url = format!(
            "{TCBS_BASE_URL}/stock-insight/v1/intraday/{}/his/paging",
            query.symbol
        );
        let size = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let params = [
            ("page", "0".to_string()),
            ("size", size.to_string()),
        ];
        let rows = self.get_list(&url, &params).await?;
        table_from_objects(SourceId::Tcbs, &rows)
    }

    /// Trading side reports (bid/ask, foreign, proprietary, orders)
    async fn trading_report(
        &self,
        query: &DataQuery,
        path: &str,
    ) -> Result<DataTable, FetchError> {
        let url = format!(
            "{TCBS_BASE_URL}/tcanalysis/v1/company/{}/{}",
            query.symbol, path
        );
        let rows = self.get_list(&url, &[]).await?;
        table_from_objects(SourceId::Tcbs, &rows)
    }

    async fn get_list(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<Value>, FetchError> {
        let mut request = self.client.get(url);
        if !params.is_empty() {
            request = request.query(params);
        }
        let response = request
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(SourceId::Tcbs, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(SourceId::Tcbs, status));
        }
        let envelope: ListEnvelope = response.json().await.map_err(|err| {
            FetchError::MalformedPayload {
                source: SourceId::Tcbs,
                message: err.to_string(),
            }
        })?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl ProviderAdapter for TcbsAdapter {
    fn id(&self) -> SourceId {
        SourceId::Tcbs
    }

    fn supports(&self, kind: ReportKind) -> bool {
        !matches!(
            kind,
            ReportKind::Affiliates | ReportKind::PriceBoard
        )
    }

    async fn fetch(&self, query: &DataQuery) -> Result<DataTable, FetchError> {
        match query.kind {
            ReportKind::History => self.history(query).await,
            ReportKind::CompanyOverview => self.overview(query).await,
            ReportKind::Shareholders => self.company_list(query, "large-share-holders").await,
            ReportKind::Officers => self.company_list(query, "key-officers").await,
            ReportKind::Subsidiaries => self.company_list(query, "sub-companies").await,
            ReportKind::CompanyNews => self.company_list(query, "activity-news").await,
            ReportKind::CompanyEvents => self.company_list(query, "events-news").await,
            ReportKind::BalanceSheet => self.financial_statement(query, "balancesheet").await,
            ReportKind::IncomeStatement => {
                self.financial_statement(query, "incomestatement").await
            }
            ReportKind::CashFlow => self.financial_statement(query, "cashflow").await,
            ReportKind::FinancialRatios => {
                self.financial_statement(query, "financialratio").await
            }
            ReportKind::TradingStats => self.trading_stats(query).await,
            ReportKind::SideStats => self.trading_report(query, "side-stats").await,
            ReportKind::ForeignTrade => self.trading_report(query, "foreign-trading").await,
            ReportKind::PropTrade => self.trading_report(query, "proprietary-trading").await,
            ReportKind::InsiderDeals => self.trading_report(query, "insider-dealing").await,
            ReportKind::OrderStats => self.trading_report(query, "order-statistics").await,
            other => Err(FetchError::unsupported(SourceId::Tcbs, other)),
        }
    }
}

/// TCBS bar resolution for an interval.
fn api_resolution(interval: Interval) -> &'static str {
    match interval {
        Interval::OneMinute => "1",
        Interval::FiveMinutes => "5",
        Interval::FifteenMinutes => "15",
        Interval::ThirtyMinutes => "30",
        Interval::OneHour => "60",
        Interval::Daily => "D",
        Interval::Weekly => "W",
        Interval::Monthly => "M",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_mapping() {
        assert_eq!(api_resolution(Interval::Daily), "D");
        assert_eq!(api_resolution(Interval::OneHour), "60");
        assert_eq!(api_resolution(Interval::Monthly), "M");
    }

    #[test]
    fn test_supports_everything_but_vci_only_kinds() {
        let adapter = TcbsAdapter::new();
        assert!(adapter.supports(ReportKind::History));
        assert!(adapter.supports(ReportKind::TradingStats));
        assert!(adapter.supports(ReportKind::InsiderDeals));
        assert!(!adapter.supports(ReportKind::Affiliates));
        assert!(!adapter.supports(ReportKind::PriceBoard));
    }

    #[test]
    fn test_list_envelope_accepts_keyed_lists() {
        let payload = r#"{"listShareHolder": [{"name": "A"}, {"name": "B"}]}"#;
        let envelope: ListEnvelope = serde_json::from_str(payload).unwrap();
        assert_eq!(envelope.data.len(), 2);

        let paged = r#"{"data": [{"p": 91500}], "page": 0}"#;
        let envelope: ListEnvelope = serde_json::from_str(paged).unwrap();
        assert_eq!(envelope.data.len(), 1);
    }
}
