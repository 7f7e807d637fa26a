//! Query model consumed by the dispatcher and provider adapters.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Upstream market data source identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Vci,
    Tcbs,
    Msn,
}

impl SourceId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vci => "vci",
            Self::Tcbs => "tcbs",
            Self::Msn => "msn",
        }
    }

    pub const fn all() -> [Self; 3] {
        [Self::Vci, Self::Tcbs, Self::Msn]
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// `FetchError` carries `SourceId` in fields named `source`, which makes the
// `thiserror` derive require `SourceId: std::error::Error`.
impl std::error::Error for SourceId {}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vci" => Ok(Self::Vci),
            "tcbs" => Ok(Self::Tcbs),
            "msn" => Ok(Self::Msn),
            other => Err(format!("unknown source '{other}', expected one of vci, tcbs, msn")),
        }
    }
}

/// Bar interval for historical price data.
///
/// Wire values match the upstream convention: `D`, `1W`, `1M` for daily and
/// coarser, `1m`..`1H` for intraday. Case is significant (`1m` is one
/// minute, `1M` one month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1H")]
    OneHour,
    #[serde(rename = "D")]
    Daily,
    #[serde(rename = "1W")]
    Weekly,
    #[serde(rename = "1M")]
    Monthly,
}

impl Interval {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1H",
            Self::Daily => "D",
            Self::Weekly => "1W",
            Self::Monthly => "1M",
        }
    }

    /// Whether bars at this interval carry an intraday timestamp.
    pub const fn is_intraday(self) -> bool {
        matches!(
            self,
            Self::OneMinute
                | Self::FiveMinutes
                | Self::FifteenMinutes
                | Self::ThirtyMinutes
                | Self::OneHour
        )
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting period for financial statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Quarter,
    Annual,
}

impl ReportPeriod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quarter => "quarter",
            Self::Annual => "annual",
        }
    }
}

/// Label language requested from the upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Vi,
    En,
}

impl Lang {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vi => "vi",
            Self::En => "en",
        }
    }
}

/// The kind of tabular report a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// OHLCV price history over a date range.
    History,
    CompanyOverview,
    Shareholders,
    Officers,
    Subsidiaries,
    Affiliates,
    CompanyNews,
    CompanyEvents,
    BalanceSheet,
    IncomeStatement,
    CashFlow,
    FinancialRatios,
    TradingStats,
    SideStats,
    PriceBoard,
    ForeignTrade,
    PropTrade,
    InsiderDeals,
    OrderStats,
}

impl ReportKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::History => "history",
            Self::CompanyOverview => "company_overview",
            Self::Shareholders => "shareholders",
            Self::Officers => "officers",
            Self::Subsidiaries => "subsidiaries",
            Self::Affiliates => "affiliates",
            Self::CompanyNews => "company_news",
            Self::CompanyEvents => "company_events",
            Self::BalanceSheet => "balance_sheet",
            Self::IncomeStatement => "income_statement",
            Self::CashFlow => "cash_flow",
            Self::FinancialRatios => "financial_ratios",
            Self::TradingStats => "trading_stats",
            Self::SideStats => "side_stats",
            Self::PriceBoard => "price_board",
            Self::ForeignTrade => "foreign_trade",
            Self::PropTrade => "prop_trade",
            Self::InsiderDeals => "insider_deals",
            Self::OrderStats => "order_stats",
        }
    }
}

impl Display for ReportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive date range, already validated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if end < start {
            return Err("End date must be after start date".to_string());
        }
        Ok(Self { start, end })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Immutable per-request query, consumed once by the dispatcher.
///
/// A query always names exactly one source; multi-symbol requests fan out
/// into independent per-symbol queries upstream of this type.
#[derive(Debug, Clone)]
pub struct DataQuery {
    pub symbol: String,
    pub source: SourceId,
    pub kind: ReportKind,
    pub range: Option<DateRange>,
    pub interval: Interval,
    pub period: ReportPeriod,
    pub lang: Lang,
    /// Row cap for open-ended reports (trading stats, news).
    pub limit: Option<usize>,
    /// Kind-specific filter, e.g. `working`/`resigned` for officers.
    pub filter: Option<String>,
}

impl DataQuery {
    /// Query for OHLCV history over a date range.
    pub fn history(
        symbol: impl Into<String>,
        source: SourceId,
        range: DateRange,
        interval: Interval,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            source,
            kind: ReportKind::History,
            range: Some(range),
            interval,
            period: ReportPeriod::Quarter,
            lang: Lang::Vi,
            limit: None,
            filter: None,
        }
    }

    /// Query for a company, financial or trading report.
    pub fn report(symbol: impl Into<String>, source: SourceId, kind: ReportKind) -> Self {
        Self {
            symbol: symbol.into(),
            source,
            kind,
            range: None,
            interval: Interval::Daily,
            period: ReportPeriod::Quarter,
            lang: Lang::Vi,
            limit: None,
            filter: None,
        }
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_period(mut self, period: ReportPeriod) -> Self {
        self.period = period;
        self
    }

    pub fn with_lang(mut self, lang: Lang) -> Self {
        self.lang = lang;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Copy of this query re-targeted at another symbol, same source.
    pub fn for_symbol(&self, symbol: impl Into<String>) -> Self {
        let mut query = self.clone();
        query.symbol = symbol.into();
        query
    }
}
