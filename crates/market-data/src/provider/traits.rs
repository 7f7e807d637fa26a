//! Provider adapter trait definition.
//!
//! This module defines the core `ProviderAdapter` trait that every
//! registered market data source must implement.

use async_trait::async_trait;

use crate::errors::FetchError;
use crate::models::{DataQuery, DataTable, ReportKind, SourceId};

/// Contract for upstream market data sources.
///
/// Implement this trait to add support for a new source. The dispatcher
/// resolves an adapter by its [`id`](Self::id) and relies only on this
/// contract plus the [`FetchError`] classification; adapter internals
/// (HTTP shape, scaling, header games) never leak upward.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use vngate_market_data::{DataQuery, DataTable, FetchError, ProviderAdapter, ReportKind, SourceId};
///
/// struct MySource;
///
/// #[async_trait]
/// impl ProviderAdapter for MySource {
///     fn id(&self) -> SourceId {
///         SourceId::Vci
///     }
///
///     fn supports(&self, kind: ReportKind) -> bool {
///         kind == ReportKind::History
///     }
///
///     async fn fetch(&self, query: &DataQuery) -> Result<DataTable, FetchError> {
///         // ... call the upstream and normalize into a DataTable
/// #       unimplemented!()
///     }
/// }
/// ```
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The source this adapter serves. Used as the registry key.
    fn id(&self) -> SourceId;

    /// Whether this source can answer the given report kind.
    ///
    /// `fetch` must fail with a permanent `UnsupportedReport` error for
    /// kinds this returns `false` for.
    fn supports(&self, kind: ReportKind) -> bool;

    /// Fetch typed tabular data for the query.
    ///
    /// Must be safe for concurrent invocation from multiple in-flight
    /// requests; any connection pooling is the adapter's own concern.
    async fn fetch(&self, query: &DataQuery) -> Result<DataTable, FetchError>;
}
