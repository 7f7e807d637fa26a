//! Data models for queries and tabular results.

mod query;
mod table;

pub use query::{DataQuery, DateRange, Interval, Lang, ReportKind, ReportPeriod, SourceId};
pub use table::{Cell, Column, DataTable};
