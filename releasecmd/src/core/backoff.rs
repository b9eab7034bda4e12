//! Exponential backoff with jitter for retried commands.
//!
//! The delay for attempt `n` (1-indexed) is `factor × 2^(n-1)` plus a jitter
//! drawn uniformly from `[0.5 × jitter, 1.5 × jitter)`. There is no upper cap:
//! callers bound the total wait through `RetryPolicy::max_attempts`.

use std::time::Duration;

use rand::Rng;

/// Default multiplicative factor (seconds) applied to `2^(n-1)`.
pub const DEFAULT_FACTOR: Duration = Duration::from_millis(500);
/// Default jitter midpoint (seconds).
pub const DEFAULT_JITTER: Duration = Duration::from_millis(500);

/// Backoff parameters. Computing a delay never sleeps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay before the first retry, before jitter.
    pub factor: Duration,
    /// Midpoint of the uniform jitter added to every delay.
    pub jitter: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            factor: DEFAULT_FACTOR,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl Backoff {
    pub fn new(factor: Duration, jitter: Duration) -> Self {
        Self { factor, jitter }
    }

    /// Deterministic part of the delay: `factor × 2^(attempt-1)`.
    ///
    /// `attempt` 0 is treated like 1. Saturates at `Duration::MAX`.
    pub fn base(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.factor.as_secs_f64() * 2f64.powi(exp);
        saturating_secs(secs)
    }

    /// Delay for `attempt`, drawing jitter from `rng`.
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base(attempt);
        let jitter_secs = self.jitter.as_secs_f64();
        let jitter = if jitter_secs > 0.0 {
            rng.gen_range(0.5 * jitter_secs..1.5 * jitter_secs)
        } else {
            0.0
        };
        base.saturating_add(saturating_secs(jitter))
    }

    /// Delay for `attempt` using the thread-local generator.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }
}

fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
