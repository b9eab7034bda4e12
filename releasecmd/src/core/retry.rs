//! Per-call retry policy for external commands.

use std::collections::BTreeSet;

/// Default number of retries after the first failure.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// How a failed command outcome should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Expected negative answer: hand the outcome back to the caller.
    Terminal,
    /// Transient failure: wait, then run the command again.
    Retry,
    /// Attempts are used up.
    Exhausted,
}

/// Immutable retry policy, built at the call site for one operation.
///
/// The same exit code means different things for different commands
/// (`git ls-remote --exit-code` returns 2 for "no such ref"), so the set of
/// codes that bypass retry belongs to the call, not to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    no_retry_exit_codes: BTreeSet<i32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Policy retrying every failure up to `max_attempts` times.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            no_retry_exit_codes: BTreeSet::new(),
        }
    }

    /// Returns a copy that treats `codes` as terminal outcomes.
    pub fn with_no_retry<I: IntoIterator<Item = i32>>(mut self, codes: I) -> Self {
        self.no_retry_exit_codes.extend(codes);
        self
    }

    /// Retries allowed after the first failure.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_no_retry(&self, exit_code: i32) -> bool {
        self.no_retry_exit_codes.contains(&exit_code)
    }

    /// Classify a failed outcome observed after `retries_done` retries.
    pub fn disposition(&self, exit_code: i32, retries_done: u32) -> FailureDisposition {
        if self.is_no_retry(exit_code) {
            FailureDisposition::Terminal
        } else if retries_done >= self.max_attempts {
            FailureDisposition::Exhausted
        } else {
            FailureDisposition::Retry
        }
    }
}
