//! Exponential backoff schedule applied between retry attempts.

use std::time::Duration;

use rand::Rng;

/// Delay schedule for retrying transient upstream failures.
///
/// The deterministic schedule is `base_delay * 2^(attempt-1)`, capped at
/// `max_delay`. Jitter spreads concurrently retrying requests apart so they
/// do not hammer a recovering upstream in lockstep.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Ceiling on time spent inside one dispatch including sleeps; once
    /// reached, remaining attempts are forfeited.
    pub max_total_wait: Duration,
    /// Jitter fraction applied to each delay (0.25 = up to ±25%).
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            max_total_wait: Duration::from_secs(30),
            jitter: 0.25,
        }
    }
}

impl BackoffPolicy {
    /// Policy with a custom attempt count and the default schedule.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Deterministic delay before the attempt following `failed_attempts`
    /// failures (1-based).
    ///
    /// The sequence is non-decreasing and every value is `<= max_delay`.
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(31);
        let scaled = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(exponent));
        scaled.min(self.max_delay)
    }

    /// [`delay_for`](Self::delay_for) with random jitter applied, still
    /// bounded by `max_delay`.
    pub fn jittered_delay_for(&self, failed_attempts: u32) -> Duration {
        let base = self.delay_for(failed_attempts);
        if self.jitter <= 0.0 || base.is_zero() {
            return base;
        }
        let spread = base.as_secs_f64() * self.jitter;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        let jittered = (base.as_secs_f64() + offset).max(0.0);
        Duration::from_secs_f64(jittered).min(self.max_delay)
    }
}
