//! Dispatcher: resolves the adapter for a query's source and drives the
//! retry-governed fetch.
//!
//! The dispatcher never inspects adapter internals. It relies only on the
//! [`ProviderAdapter`] contract and the transient/permanent classification
//! of [`FetchError`]: transient failures are retried with exponential
//! backoff, permanent failures are returned immediately so the caller sees
//! the error without pointless waiting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::time::{sleep, timeout};

use crate::errors::FailureKind;
use crate::models::{DataQuery, DataTable, SourceId};
use crate::provider::ProviderAdapter;
use crate::registry::BackoffPolicy;

/// Failure category carried by a [`DispatchOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Transient upstream failure, retries exhausted.
    Transient,
    /// Permanent failure, not retried.
    Permanent,
    /// No adapter registered for the requested source.
    UnknownSource,
    /// The request deadline elapsed while dispatching.
    Cancelled,
}

/// Result of dispatching one query.
#[derive(Debug)]
pub enum DispatchOutcome {
    Success(DataTable),
    Failure {
        kind: OutcomeKind,
        message: String,
        attempts: u32,
    },
}

impl DispatchOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Adapter registry plus retry policy.
///
/// Adding a new data source means registering another adapter; dispatch
/// logic does not change.
pub struct Dispatcher {
    adapters: HashMap<SourceId, Arc<dyn ProviderAdapter>>,
    policy: BackoffPolicy,
    attempt_timeout: Duration,
}

impl Dispatcher {
    pub fn new(policy: BackoffPolicy, attempt_timeout: Duration) -> Self {
        Self {
            adapters: HashMap::new(),
            policy,
            attempt_timeout,
        }
    }

    /// Register an adapter under its own source id. A later registration
    /// for the same source replaces the earlier one.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    /// Source ids with a registered adapter.
    pub fn sources(&self) -> Vec<SourceId> {
        self.adapters.keys().copied().collect()
    }

    /// Dispatch one query: resolve the adapter, fetch with per-attempt
    /// timeout, retry transient failures with jittered backoff.
    ///
    /// Each attempt that exceeds `attempt_timeout` counts as a transient
    /// failure and consumes one attempt. Retrying stops when `max_attempts`
    /// is reached or the policy's total-wait ceiling would be crossed.
    pub async fn dispatch(&self, query: &DataQuery) -> DispatchOutcome {
        let Some(adapter) = self.adapters.get(&query.source) else {
            return DispatchOutcome::Failure {
                kind: OutcomeKind::UnknownSource,
                message: format!("No adapter registered for source '{}'", query.source),
                attempts: 0,
            };
        };

        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_message;

        loop {
            attempts += 1;
            debug!(
                "Dispatching {} '{}' to '{}' (attempt {}/{})",
                query.kind, query.symbol, query.source, attempts, self.policy.max_attempts
            );

            match timeout(self.attempt_timeout, adapter.fetch(query)).await {
                Ok(Ok(table)) => {
                    debug!(
                        "'{}' answered {} '{}' with {} rows",
                        query.source,
                        query.kind,
                        query.symbol,
                        table.row_count()
                    );
                    return DispatchOutcome::Success(table);
                }
                Ok(Err(err)) => match err.failure_kind() {
                    FailureKind::Permanent => {
                        debug!(
                            "Permanent failure from '{}' for '{}': {}, not retrying",
                            query.source, query.symbol, err
                        );
                        return DispatchOutcome::Failure {
                            kind: OutcomeKind::Permanent,
                            message: err.to_string(),
                            attempts,
                        };
                    }
                    FailureKind::Transient => {
                        last_message = err.to_string();
                        debug!(
                            "Transient failure from '{}' for '{}': {}",
                            query.source, query.symbol, last_message
                        );
                    }
                },
                Err(_) => {
                    last_message = format!(
                        "Attempt timed out after {:?}",
                        self.attempt_timeout
                    );
                    debug!("'{}' {} for '{}'", query.source, last_message, query.symbol);
                }
            }

            if attempts >= self.policy.max_attempts {
                break;
            }

            let delay = self.policy.jittered_delay_for(attempts);
            if started.elapsed() + delay > self.policy.max_total_wait {
                warn!(
                    "Total wait ceiling reached dispatching '{}' to '{}' after {} attempts",
                    query.symbol, query.source, attempts
                );
                break;
            }
            sleep(delay).await;
        }

        warn!(
            "'{}' exhausted retries for {} '{}': {}",
            query.source, query.kind, query.symbol, last_message
        );
        DispatchOutcome::Failure {
            kind: OutcomeKind::Transient,
            message: last_message,
            attempts,
        }
    }

    /// [`dispatch`](Self::dispatch) bounded by a request-level deadline.
    ///
    /// When the deadline elapses mid-dispatch the in-flight attempt and any
    /// pending backoff sleep are cancelled and the outcome is `Cancelled`
    /// (the attempt count is not recoverable at that point).
    pub async fn dispatch_with_deadline(
        &self,
        query: &DataQuery,
        deadline: Duration,
    ) -> DispatchOutcome {
        match timeout(deadline, self.dispatch(query)).await {
            Ok(outcome) => outcome,
            Err(_) => DispatchOutcome::Failure {
                kind: OutcomeKind::Cancelled,
                message: format!("Request deadline of {deadline:?} elapsed during dispatch"),
                attempts: 0,
            },
        }
    }

    /// Fan a multi-symbol request out into independent per-symbol queries
    /// against the same source, dispatched concurrently.
    ///
    /// Outcomes come back in input order, one per symbol.
    pub async fn dispatch_many(
        &self,
        symbols: &[String],
        template: &DataQuery,
        deadline: Duration,
    ) -> Vec<(String, DispatchOutcome)> {
        let tasks = symbols.iter().map(|symbol| {
            let query = template.for_symbol(symbol.clone());
            async move {
                let outcome = self.dispatch_with_deadline(&query, deadline).await;
                (query.symbol, outcome)
            }
        });
        futures::future::join_all(tasks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use crate::models::{Cell, ReportKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum MockBehavior {
        Succeed,
        SucceedAfter(usize),
        AlwaysTransient,
        AlwaysPermanent,
        Hang,
    }

    struct MockAdapter {
        source: SourceId,
        behavior: MockBehavior,
        call_count: AtomicUsize,
    }

    impl MockAdapter {
        fn new(source: SourceId, behavior: MockBehavior) -> Arc<Self> {
            Arc::new(Self {
                source,
                behavior,
                call_count: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn table() -> DataTable {
            let mut table = DataTable::new();
            table.push_column("close", vec![Cell::from(100), Cell::from(101)]);
            table
        }
    }

    #[async_trait]
    impl ProviderAdapter for MockAdapter {
        fn id(&self) -> SourceId {
            self.source
        }

        fn supports(&self, _kind: ReportKind) -> bool {
            true
        }

        async fn fetch(&self, _query: &DataQuery) -> Result<DataTable, FetchError> {
            let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
            match self.behavior {
                MockBehavior::Succeed => Ok(Self::table()),
                MockBehavior::SucceedAfter(failures) if call > failures => Ok(Self::table()),
                MockBehavior::SucceedAfter(_) | MockBehavior::AlwaysTransient => {
                    Err(FetchError::RateLimited { source: self.source })
                }
                MockBehavior::AlwaysPermanent => {
                    Err(FetchError::InvalidSymbol("NOPE".to_string()))
                }
                MockBehavior::Hang => {
                    futures::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    fn fast_policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            max_total_wait: Duration::from_secs(5),
            jitter: 0.0,
        }
    }

    fn sample_query(source: SourceId) -> DataQuery {
        DataQuery::report("VCB", source, ReportKind::TradingStats)
    }

    #[tokio::test]
    async fn test_success_returns_immediately() {
        let adapter = MockAdapter::new(SourceId::Vci, MockBehavior::Succeed);
        let mut dispatcher = Dispatcher::new(fast_policy(3), Duration::from_secs(1));
        dispatcher.register(adapter.clone());

        let outcome = dispatcher.dispatch(&sample_query(SourceId::Vci)).await;
        assert!(outcome.is_success());
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_always_transient_exhausts_max_attempts() {
        let adapter = MockAdapter::new(SourceId::Vci, MockBehavior::AlwaysTransient);
        let mut dispatcher = Dispatcher::new(fast_policy(3), Duration::from_secs(1));
        dispatcher.register(adapter.clone());

        let outcome = dispatcher.dispatch(&sample_query(SourceId::Vci)).await;
        match outcome {
            DispatchOutcome::Failure {
                kind,
                attempts,
                ..
            } => {
                assert_eq!(kind, OutcomeKind::Transient);
                assert_eq!(attempts, 3);
            }
            DispatchOutcome::Success(_) => panic!("expected failure"),
        }
        assert_eq!(adapter.calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let adapter = MockAdapter::new(SourceId::Vci, MockBehavior::AlwaysPermanent);
        let mut dispatcher = Dispatcher::new(fast_policy(3), Duration::from_secs(1));
        dispatcher.register(adapter.clone());

        let outcome = dispatcher.dispatch(&sample_query(SourceId::Vci)).await;
        match outcome {
            DispatchOutcome::Failure {
                kind,
                attempts,
                message,
            } => {
                assert_eq!(kind, OutcomeKind::Permanent);
                assert_eq!(attempts, 1);
                assert!(message.contains("Invalid symbol"));
            }
            DispatchOutcome::Success(_) => panic!("expected failure"),
        }
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let adapter = MockAdapter::new(SourceId::Tcbs, MockBehavior::SucceedAfter(2));
        let mut dispatcher = Dispatcher::new(fast_policy(3), Duration::from_secs(1));
        dispatcher.register(adapter.clone());

        let outcome = dispatcher.dispatch(&sample_query(SourceId::Tcbs)).await;
        assert!(outcome.is_success());
        assert_eq!(adapter.calls(), 3);
    }

    #[tokio::test]
    async fn test_unknown_source_fails_without_attempts() {
        let dispatcher = Dispatcher::new(fast_policy(3), Duration::from_secs(1));

        let outcome = dispatcher.dispatch(&sample_query(SourceId::Msn)).await;
        match outcome {
            DispatchOutcome::Failure {
                kind,
                attempts,
                ..
            } => {
                assert_eq!(kind, OutcomeKind::UnknownSource);
                assert_eq!(attempts, 0);
            }
            DispatchOutcome::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_counts_as_transient() {
        let adapter = MockAdapter::new(SourceId::Vci, MockBehavior::Hang);
        let mut dispatcher = Dispatcher::new(fast_policy(2), Duration::from_millis(50));
        dispatcher.register(adapter.clone());

        let outcome = dispatcher.dispatch(&sample_query(SourceId::Vci)).await;
        match outcome {
            DispatchOutcome::Failure {
                kind,
                attempts,
                message,
            } => {
                assert_eq!(kind, OutcomeKind::Transient);
                assert_eq!(attempts, 2);
                assert!(message.contains("timed out"));
            }
            DispatchOutcome::Success(_) => panic!("expected failure"),
        }
        assert_eq!(adapter.calls(), 2);
    }

    #[tokio::test]
    async fn test_total_wait_ceiling_stops_retrying() {
        let adapter = MockAdapter::new(SourceId::Vci, MockBehavior::AlwaysTransient);
        let policy = BackoffPolicy {
            max_total_wait: Duration::ZERO,
            ..fast_policy(5)
        };
        let mut dispatcher = Dispatcher::new(policy, Duration::from_secs(1));
        dispatcher.register(adapter.clone());

        let outcome = dispatcher.dispatch(&sample_query(SourceId::Vci)).await;
        match outcome {
            DispatchOutcome::Failure { attempts, .. } => assert_eq!(attempts, 1),
            DispatchOutcome::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_yields_cancelled() {
        let adapter = MockAdapter::new(SourceId::Vci, MockBehavior::Hang);
        let mut dispatcher = Dispatcher::new(fast_policy(3), Duration::from_secs(60));
        dispatcher.register(adapter);

        let outcome = dispatcher
            .dispatch_with_deadline(&sample_query(SourceId::Vci), Duration::from_millis(10))
            .await;
        match outcome {
            DispatchOutcome::Failure { kind, .. } => {
                assert_eq!(kind, OutcomeKind::Cancelled);
            }
            DispatchOutcome::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_many_preserves_order() {
        let adapter = MockAdapter::new(SourceId::Vci, MockBehavior::Succeed);
        let mut dispatcher = Dispatcher::new(fast_policy(3), Duration::from_secs(1));
        dispatcher.register(adapter.clone());

        let symbols = vec!["VCB".to_string(), "FPT".to_string(), "HPG".to_string()];
        let outcomes = dispatcher
            .dispatch_many(
                &symbols,
                &sample_query(SourceId::Vci),
                Duration::from_secs(5),
            )
            .await;

        assert_eq!(outcomes.len(), 3);
        for ((symbol, outcome), expected) in outcomes.iter().zip(&symbols) {
            assert_eq!(symbol, expected);
            assert!(outcome.is_success());
        }
        assert_eq!(adapter.calls(), 3);
    }
}
