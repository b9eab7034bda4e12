//! Command execution with dry-run and retry handling.
//!
//! [`CommandRunner`] decouples the release pipeline from process spawning and
//! [`Sleeper`] decouples retry waits from the clock. Tests use scripted
//! runners and recording sleepers; nothing in them spawns or sleeps.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::backoff::Backoff;
use crate::core::command::{CommandLine, CommandOutcome};
use crate::core::retry::{FailureDisposition, RetryPolicy};
use crate::error::ReleaseError;
use crate::io::process::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_OUTPUT_LIMIT_BYTES, run_command_line};

/// Abstraction over how a command line is actually run.
pub trait CommandRunner {
    /// Run `command` once and report its outcome. Errors mean the command
    /// could not be run at all, not that it failed.
    fn run(&self, command: &CommandLine) -> Result<CommandOutcome>;
}

/// Runner that spawns real child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutcome> {
        run_command_line(command, self.timeout, self.output_limit_bytes)
    }
}

/// Blocks between retry attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Runs commands for one release, honoring dry-run and per-call retry policies.
pub struct CommandExecutor<R, S> {
    runner: R,
    sleeper: S,
    backoff: Backoff,
    dry_run: bool,
}

impl<R: CommandRunner, S: Sleeper> CommandExecutor<R, S> {
    pub fn new(runner: R, sleeper: S, backoff: Backoff, dry_run: bool) -> Self {
        Self {
            runner,
            sleeper,
            backoff,
            dry_run,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Run `command`, retrying transient failures according to `policy`.
    ///
    /// - Dry run: prints the command and returns a simulated success.
    /// - Success: returns the outcome.
    /// - Failure without a policy: `ReleaseError::CommandFailed`.
    /// - Failure whose exit code the policy marks as no-retry: returns the
    ///   failed outcome for the caller to interpret.
    /// - Failure otherwise: retried up to `policy.max_attempts()` times, then
    ///   `ReleaseError::CommandFailed` with the last exit code.
    #[instrument(skip_all, fields(command = %command))]
    pub fn execute(
        &self,
        command: &CommandLine,
        policy: Option<&RetryPolicy>,
    ) -> Result<CommandOutcome> {
        if self.dry_run {
            println!("dry run: {command}");
            return Ok(CommandOutcome::simulated());
        }

        let mut outcome = self.runner.run(command)?;
        let Some(policy) = policy else {
            if outcome.succeeded() {
                return Ok(outcome);
            }
            return Err(command_failed(command, outcome).into());
        };

        let mut retries_done = 0u32;
        loop {
            if outcome.succeeded() {
                if retries_done > 0 {
                    info!(retries_done, "command succeeded after retry");
                }
                return Ok(outcome);
            }
            match policy.disposition(outcome.exit_code, retries_done) {
                FailureDisposition::Terminal => {
                    debug!(exit_code = outcome.exit_code, "terminal outcome, not retrying");
                    return Ok(outcome);
                }
                FailureDisposition::Exhausted => {
                    warn!(retries_done, exit_code = outcome.exit_code, "retries exhausted");
                    return Err(command_failed(command, outcome).into());
                }
                FailureDisposition::Retry => {
                    report_failure(command, &outcome);
                    retries_done += 1;
                    self.sleep_before_retry(retries_done, policy.max_attempts());
                    outcome = self.runner.run(command)?;
                }
            }
        }
    }

    /// Announce and wait for the backoff delay of retry `attempt` (1-indexed).
    pub fn sleep_before_retry(&self, attempt: u32, max_attempts: u32) -> Duration {
        let delay = self.backoff.delay(attempt);
        eprintln!(
            "Retrying in {:.2} seconds ... (attempt={attempt}/{max_attempts})",
            delay.as_secs_f64()
        );
        self.sleeper.sleep(delay);
        delay
    }
}

fn report_failure(command: &CommandLine, outcome: &CommandOutcome) {
    eprintln!(
        "[ERROR] failed to execute `{command}` (exit code {})",
        outcome.exit_code
    );
    let stderr = outcome.stderr.trim_end();
    if !stderr.is_empty() {
        eprintln!("{stderr}");
    }
}

fn command_failed(command: &CommandLine, outcome: CommandOutcome) -> ReleaseError {
    ReleaseError::CommandFailed {
        command: command.clone(),
        exit_code: outcome.exit_code,
        stderr: outcome.stderr,
    }
}
