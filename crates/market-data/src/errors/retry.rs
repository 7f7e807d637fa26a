/// Classification for retry policy.
///
/// Determines how the dispatcher responds to an adapter failure.
///
/// # Behavior Summary
///
/// | Class | Retried? | Counts toward backoff? |
/// |-------|----------|------------------------|
/// | `Transient` | Yes, with exponential backoff | Yes |
/// | `Permanent` | No | No |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// Retry-eligible: network timeout, connect failure, upstream
    /// rate-limit (429) or 5xx. The upstream may recover if asked again.
    Transient,

    /// Never retry: invalid symbol, unsupported report, malformed query,
    /// or any other 4xx. Retrying wastes attempts and delays the caller's
    /// error visibility.
    Permanent,
}
