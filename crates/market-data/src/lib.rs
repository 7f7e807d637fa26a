//! Vngate Market Data Crate
//!
//! Source-agnostic fetching of Vietnamese market data for the vngate
//! gateway.
//!
//! # Overview
//!
//! This crate supports:
//! - One typed request shape ([`DataQuery`]) served by interchangeable
//!   upstream sources (VCI, TCBS, MSN)
//! - A uniform adapter contract ([`ProviderAdapter`]) so new sources can be
//!   registered without touching dispatch logic
//! - Transient/permanent failure classification and retry with exponential
//!   backoff
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |    DataQuery     | --> |    Dispatcher    |  (adapter lookup + retry)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          | ProviderAdapter  |  (VCI, TCBS, MSN)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |    DataTable     |  (column-ordered result)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`DataQuery`] - immutable per-request query (symbol, source, report kind)
//! - [`DataTable`] - ordered named columns with row-aligned [`Cell`] values
//! - [`DispatchOutcome`] - success or a fully classified failure
//! - [`FetchError`] - adapter error carrying a [`FailureKind`]
//! - [`BackoffPolicy`] - delay schedule used between retry attempts

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use errors::{FailureKind, FetchError};
pub use models::{
    Cell, Column, DataQuery, DataTable, DateRange, Interval, Lang, ReportKind, ReportPeriod,
    SourceId,
};
pub use provider::{MsnAdapter, ProviderAdapter, TcbsAdapter, VciAdapter};
pub use registry::{BackoffPolicy, DispatchOutcome, Dispatcher, OutcomeKind};
