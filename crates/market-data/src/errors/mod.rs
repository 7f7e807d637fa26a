//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`FetchError`]: The error enum returned by provider adapters
//! - [`FailureKind`]: Classification for determining retry behavior

mod retry;

pub use retry::FailureKind;

use thiserror::Error;

use crate::models::SourceId;

/// Errors a provider adapter can fail with.
///
/// Each variant is classified via [`failure_kind`](Self::failure_kind),
/// which the dispatcher uses to decide between retrying with backoff and
/// failing fast.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The requested symbol is unknown to the provider.
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// The provider has no implementation for the requested report kind.
    #[error("Report '{kind}' is not supported by source '{source}'")]
    UnsupportedReport {
        source: SourceId,
        kind: &'static str,
    },

    /// The query is missing a field the report kind requires.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited by {source}")]
    RateLimited { source: SourceId },

    /// The request to the provider timed out.
    #[error("Timeout talking to {source}")]
    Timeout { source: SourceId },

    /// The provider answered with a non-success HTTP status.
    #[error("Upstream {source} returned HTTP {status}")]
    UpstreamStatus { source: SourceId, status: u16 },

    /// The provider answered 2xx but the payload did not parse.
    #[error("Malformed payload from {source}: {message}")]
    MalformedPayload { source: SourceId, message: String },

    /// A network error occurred while talking to a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl FetchError {
    pub fn unsupported(source: SourceId, kind: crate::models::ReportKind) -> Self {
        Self::UnsupportedReport {
            source,
            kind: kind.as_str(),
        }
    }

    /// Map a transport-level reqwest failure, keeping timeouts distinct.
    pub fn from_reqwest(source: SourceId, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { source }
        } else {
            Self::Network(err)
        }
    }

    /// Map a non-success HTTP status into the matching variant.
    pub fn from_status(source: SourceId, status: reqwest::StatusCode) -> Self {
        if status.as_u16() == 429 {
            Self::RateLimited { source }
        } else {
            Self::UpstreamStatus {
                source,
                status: status.as_u16(),
            }
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// Rate limiting, timeouts and upstream 5xx are [`FailureKind::Transient`];
    /// invalid input and every other 4xx are [`FailureKind::Permanent`].
    ///
    /// # Examples
    ///
    /// ```
    /// use vngate_market_data::{FailureKind, FetchError, SourceId};
    ///
    /// let error = FetchError::RateLimited { source: SourceId::Vci };
    /// assert_eq!(error.failure_kind(), FailureKind::Transient);
    ///
    /// let error = FetchError::InvalidSymbol("NOPE".to_string());
    /// assert_eq!(error.failure_kind(), FailureKind::Permanent);
    /// ```
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::InvalidSymbol(_)
            | Self::UnsupportedReport { .. }
            | Self::InvalidQuery(_)
            | Self::MalformedPayload { .. } => FailureKind::Permanent,

            Self::RateLimited { .. } | Self::Timeout { .. } => FailureKind::Transient,

            Self::UpstreamStatus { status, .. } => {
                if *status >= 500 {
                    FailureKind::Transient
                } else {
                    FailureKind::Permanent
                }
            }

            Self::Network(err) => {
                if err.is_timeout() || err.is_connect() {
                    FailureKind::Transient
                } else {
                    FailureKind::Permanent
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportKind;

    #[test]
    fn test_invalid_symbol_never_retries() {
        let error = FetchError::InvalidSymbol("INVALID".to_string());
        assert_eq!(error.failure_kind(), FailureKind::Permanent);
    }

    #[test]
    fn test_unsupported_report_never_retries() {
        let error = FetchError::unsupported(SourceId::Msn, ReportKind::BalanceSheet);
        assert_eq!(error.failure_kind(), FailureKind::Permanent);
    }

    #[test]
    fn test_rate_limited_retries() {
        let error = FetchError::RateLimited {
            source: SourceId::Vci,
        };
        assert_eq!(error.failure_kind(), FailureKind::Transient);
    }

    #[test]
    fn test_timeout_retries() {
        let error = FetchError::Timeout {
            source: SourceId::Tcbs,
        };
        assert_eq!(error.failure_kind(), FailureKind::Transient);
    }

    #[test]
    fn test_status_split_at_500() {
        let server_side = FetchError::from_status(
            SourceId::Vci,
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
        );
        assert_eq!(server_side.failure_kind(), FailureKind::Transient);

        let client_side =
            FetchError::from_status(SourceId::Vci, reqwest::StatusCode::NOT_FOUND);
        assert_eq!(client_side.failure_kind(), FailureKind::Permanent);
    }

    #[test]
    fn test_429_maps_to_rate_limited() {
        let error =
            FetchError::from_status(SourceId::Tcbs, reqwest::StatusCode::TOO_MANY_REQUESTS);
        assert!(matches!(error, FetchError::RateLimited { .. }));
        assert_eq!(error.failure_kind(), FailureKind::Transient);
    }

    #[test]
    fn test_malformed_payload_never_retries() {
        let error = FetchError::MalformedPayload {
            source: SourceId::Msn,
            message: "missing 'series' field".to_string(),
        };
        assert_eq!(error.failure_kind(), FailureKind::Permanent);
    }

    #[test]
    fn test_error_display() {
        let error = FetchError::InvalidSymbol("INVALID".to_string());
        assert_eq!(format!("{}", error), "Invalid symbol: INVALID");

        let error = FetchError::RateLimited {
            source: SourceId::Vci,
        };
        assert_eq!(format!("{}", error), "Rate limited by vci");
    }
}
