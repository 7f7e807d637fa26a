//! Dispatch layer: adapter lookup, retry with backoff, outcome
//! normalization.

mod backoff;
mod dispatcher;

pub use backoff::BackoffPolicy;
pub use dispatcher::{DispatchOutcome, Dispatcher, OutcomeKind};
