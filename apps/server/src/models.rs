//! Request/response DTOs and request-level validation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use vngate_market_data::{DateRange, Interval, Lang, ReportPeriod, SourceId};

use crate::error::ApiError;
use crate::users::User;

// ---- Auth ----

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Serialize)]
pub struct UserSummary {
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

// ---- Serde defaults ----

fn default_source() -> SourceId {
    SourceId::Vci
}

// The original gateway serves most trading reports from TCBS; defaulting
// the source there keeps those endpoints working out of the box.
fn default_trading_source() -> SourceId {
    SourceId::Tcbs
}

fn default_interval() -> Interval {
    Interval::Daily
}

fn default_period() -> ReportPeriod {
    ReportPeriod::Quarter
}

fn default_lang() -> Lang {
    Lang::Vi
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    "_".to_string()
}

fn default_limit() -> usize {
    1000
}

fn default_filter() -> String {
    "all".to_string()
}

// ---- Download ----

#[derive(Deserialize)]
pub struct CsvDownloadRequest {
    pub symbol: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_source")]
    pub source: SourceId,
    #[serde(default = "default_interval")]
    pub interval: Interval,
}

#[derive(Deserialize)]
pub struct MultipleCsvRequest {
    pub symbols: Vec<String>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_source")]
    pub source: SourceId,
    #[serde(default = "default_interval")]
    pub interval: Interval,
    #[serde(default)]
    pub combine: bool,
}

// ---- Company ----

#[derive(Deserialize)]
pub struct CompanyRequest {
    pub symbol: String,
    #[serde(default = "default_source")]
    pub source: SourceId,
    #[serde(default = "default_lang")]
    pub lang: Lang,
}

#[derive(Deserialize)]
pub struct CompanyFilterRequest {
    pub symbol: String,
    #[serde(default = "default_source")]
    pub source: SourceId,
    #[serde(default = "default_lang")]
    pub lang: Lang,
    /// e.g. `working`/`resigned` for officers, `all`/`subsidiary` for
    /// subsidiaries.
    #[serde(default = "default_filter")]
    pub filter_by: String,
}

// ---- Financial ----

#[derive(Deserialize)]
pub struct FinancialReportRequest {
    pub symbol: String,
    #[serde(default = "default_source")]
    pub source: SourceId,
    #[serde(default = "default_period")]
    pub period: ReportPeriod,
    #[serde(default = "default_lang")]
    pub lang: Lang,
    #[serde(default = "default_true")]
    pub dropna: bool,
}

#[derive(Deserialize)]
pub struct FinancialRatioRequest {
    pub symbol: String,
    #[serde(default = "default_source")]
    pub source: SourceId,
    #[serde(default = "default_period")]
    pub period: ReportPeriod,
    #[serde(default = "default_true")]
    pub flatten_columns: bool,
    #[serde(default = "default_separator")]
    pub separator: String,
}

// ---- Trading ----

#[derive(Deserialize)]
pub struct TradingRequest {
    pub symbol: String,
    #[serde(default = "default_trading_source")]
    pub source: SourceId,
}

#[derive(Deserialize)]
pub struct TradingStatsRequest {
    pub symbol: String,
    #[serde(default = "default_trading_source")]
    pub source: SourceId,
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Deserialize)]
pub struct PriceBoardRequest {
    pub symbols_list: Vec<String>,
    #[serde(default = "default_source")]
    pub source: SourceId,
}

#[derive(Deserialize)]
pub struct PriceHistoryRequest {
    pub symbol: String,
    #[serde(default = "default_source")]
    pub source: SourceId,
    pub start: String,
    pub end: String,
    #[serde(default = "default_interval")]
    pub interval: Interval,
}

// ---- Validation ----

const MAX_RANGE_DAYS: i64 = 365 * 5;

pub fn normalize_symbol(raw: &str) -> Result<String, ApiError> {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.len() < 3 {
        return Err(ApiError::BadRequest(
            "Symbol must be at least 3 characters".to_string(),
        ));
    }
    Ok(symbol)
}

/// Dates arrive as `YYYY-MM-DD` or `DD-MM-YYYY`.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%m-%Y"))
        .map_err(|_| {
            ApiError::BadRequest(format!(
                "Invalid date '{raw}': use DD-MM-YYYY or YYYY-MM-DD"
            ))
        })
}

pub fn parse_range(start: &str, end: &str) -> Result<DateRange, ApiError> {
    let range = DateRange::new(parse_date(start)?, parse_date(end)?)
        .map_err(ApiError::BadRequest)?;
    if range.days() > MAX_RANGE_DAYS {
        return Err(ApiError::BadRequest(
            "Date range cannot exceed 5 years".to_string(),
        ));
    }
    Ok(range)
}
