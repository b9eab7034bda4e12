//! Git adapter for tagging a release.
//!
//! Every call goes through the [`CommandExecutor`], so dry runs and retries
//! apply uniformly. Network calls carry their own retry policy.

use anyhow::Result;
use tracing::{debug, instrument, warn};

use crate::core::command::CommandLine;
use crate::core::retry::RetryPolicy;
use crate::io::executor::{CommandExecutor, CommandRunner, Sleeper};

/// `git ls-remote --exit-code` status when no ref matched.
pub const LS_REMOTE_NO_MATCH: i32 = 2;
/// `git push` status when the remote rejected a ref (e.g. tag already exists).
pub const PUSH_REJECTED: i32 = 1;

/// Whether a tag is present on the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteTag {
    Present,
    Absent,
}

/// Result of pushing tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    /// The remote refused the push; not retried.
    Rejected { exit_code: i32, stderr: String },
}

/// Git commands used by a release.
pub struct Git<'a, R, S> {
    executor: &'a CommandExecutor<R, S>,
    program: String,
    remote: String,
    max_attempts: u32,
}

impl<'a, R: CommandRunner, S: Sleeper> Git<'a, R, S> {
    pub fn new(
        executor: &'a CommandExecutor<R, S>,
        program: impl Into<String>,
        remote: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            executor,
            program: program.into(),
            remote: remote.into(),
            max_attempts,
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    fn command(&self) -> CommandLine {
        CommandLine::new(&self.program)
    }

    /// `git fetch --tags`, retried on any failure.
    #[instrument(skip_all)]
    pub fn fetch_tags(&self) -> Result<()> {
        let policy = RetryPolicy::new(self.max_attempts);
        self.executor
            .execute(&self.command().args(["fetch", "--tags"]), Some(&policy))?;
        Ok(())
    }

    /// Ask the remote whether `refs/tags/<tag>` exists.
    ///
    /// A dry run cannot know, so it reports the tag as absent.
    #[instrument(skip_all, fields(tag))]
    pub fn remote_tag(&self, tag: &str) -> Result<RemoteTag> {
        let policy = RetryPolicy::new(self.max_attempts).with_no_retry([LS_REMOTE_NO_MATCH]);
        let cmd = self.command().args([
            "ls-remote".to_string(),
            "--exit-code".to_string(),
            self.remote.clone(),
            format!("refs/tags/{tag}"),
        ]);
        let outcome = self.executor.execute(&cmd, Some(&policy))?;
        if outcome.simulated || !outcome.succeeded() {
            debug!(tag, "tag absent on remote");
            return Ok(RemoteTag::Absent);
        }
        debug!(tag, "tag present on remote");
        Ok(RemoteTag::Present)
    }

    /// `git tag [--sign -m <message>] <tag>`. Local, so never retried.
    #[instrument(skip_all, fields(tag, signed = sign_message.is_some()))]
    pub fn create_tag(&self, tag: &str, sign_message: Option<&str>) -> Result<()> {
        let mut cmd = self.command().arg("tag");
        if let Some(message) = sign_message {
            cmd = cmd.args(["--sign", "-m", message]);
        }
        self.executor.execute(&cmd.arg(tag), None)?;
        Ok(())
    }

    /// `git push --tags`, retried except when the remote rejects the push.
    #[instrument(skip_all)]
    pub fn push_tags(&self) -> Result<PushOutcome> {
        let policy = RetryPolicy::new(self.max_attempts).with_no_retry([PUSH_REJECTED]);
        let outcome = self
            .executor
            .execute(&self.command().args(["push", "--tags"]), Some(&policy))?;
        if outcome.succeeded() {
            return Ok(PushOutcome::Pushed);
        }
        warn!(exit_code = outcome.exit_code, "push rejected by remote");
        Ok(PushOutcome::Rejected {
            exit_code: outcome.exit_code,
            stderr: outcome.stderr,
        })
    }
}
