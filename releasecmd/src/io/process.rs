//! Spawn external commands with a timeout and bounded, deadlock-free capture.
//!
//! Children share our terminal for stdin and see their stdout echoed, so
//! interactive prompts and progress output reach the user.

use std::io::{self, ErrorKind, Read, Write};
use std::mem;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::command::{
    CommandLine, CommandOutcome, NOT_FOUND_EXIT_CODE, SIGNALED_EXIT_CODE, TIMED_OUT_EXIT_CODE,
};

/// Default wall-clock limit for a single external command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Bytes of stdout/stderr kept per stream.
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;
/// How long readers may keep draining pipes after the child has exited.
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Collapse the raw process result into a classified outcome.
    pub fn into_outcome(self) -> CommandOutcome {
        let exit_code = if self.timed_out {
            TIMED_OUT_EXIT_CODE
        } else {
            self.status.code().unwrap_or(SIGNALED_EXIT_CODE)
        };
        let mut stderr = String::from_utf8_lossy(&self.stderr).into_owned();
        if self.stderr_truncated > 0 {
            stderr.push_str(&format!(
                "\n[stderr truncated {} bytes]\n",
                self.stderr_truncated
            ));
        }
        CommandOutcome {
            exit_code,
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr,
            timed_out: self.timed_out,
            simulated: false,
        }
    }
}

/// Run `command_line` to completion and classify the result.
///
/// A program that cannot be found yields exit code 127, as a shell would
/// report it. Any other spawn failure is an error.
#[instrument(skip_all, fields(command = %command_line, timeout_secs = timeout.as_secs()))]
pub fn run_command_line(
    command_line: &CommandLine,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutcome> {
    let mut cmd = Command::new(&command_line.program);
    cmd.args(&command_line.args);
    match run_command_with_timeout(cmd, timeout, output_limit_bytes) {
        Ok(output) => Ok(output.into_outcome()),
        Err(err) => match err.downcast_ref::<std::io::Error>() {
            Some(io_err) if io_err.kind() == ErrorKind::NotFound => {
                warn!(program = %command_line.program, "program not found");
                Ok(CommandOutcome::from_exit_code(NOT_FOUND_EXIT_CODE)
                    .with_stderr(format!("{}: command not found", command_line.program)))
            }
            _ => Err(err).with_context(|| format!("run {command_line}")),
        },
    }
}

/// Run a command with a timeout, capturing stdout/stderr without risking pipe deadlocks.
///
/// Stdin is inherited so tools can prompt (twine asks for credentials). Stdout is
/// echoed to our stdout as it arrives and captured; stderr is only captured.
/// `output_limit_bytes` bounds what is kept per stream (the rest is drained and
/// discarded).
///
/// Once the child has exited (or been killed on timeout), readers get
/// [`OUTPUT_DRAIN_GRACE`] to reach end of file. A background process that
/// inherited the pipes can hold them open indefinitely, so after the grace the
/// readers are abandoned with whatever they captured.
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_reader = StreamReader::spawn(stdout, output_limit_bytes, io::stdout());
    let stderr_reader = StreamReader::spawn(stderr, output_limit_bytes, io::sink());

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let deadline = Instant::now() + OUTPUT_DRAIN_GRACE;
    let (stdout, stdout_truncated) = stdout_reader.finish(deadline, "stdout")?;
    let (stderr, stderr_truncated) = stderr_reader.finish(deadline, "stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

/// Bytes kept from one child stream, shared with its reader thread.
#[derive(Debug, Default)]
struct StreamCapture {
    bytes: Vec<u8>,
    truncated: usize,
}

/// Background reader draining one child stream.
struct StreamReader {
    capture: Arc<Mutex<StreamCapture>>,
    handle: thread::JoinHandle<Result<()>>,
}

impl StreamReader {
    fn spawn<R, W>(reader: R, limit: usize, echo: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let capture = Arc::new(Mutex::new(StreamCapture::default()));
        let shared = Arc::clone(&capture);
        let handle = thread::spawn(move || read_stream_limited(reader, limit, echo, &shared));
        Self { capture, handle }
    }

    /// Wait until `deadline` for end of file, then take what was captured.
    fn finish(self, deadline: Instant, stream: &str) -> Result<(Vec<u8>, usize)> {
        while !self.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
        if self.handle.is_finished() {
            match self.handle.join() {
                Ok(result) => result.with_context(|| format!("read {stream}"))?,
                Err(_) => return Err(anyhow!("{stream} reader thread panicked")),
            }
        } else {
            warn!(stream, "pipe still open after exit, abandoning reader");
        }
        let mut capture = self
            .capture
            .lock()
            .map_err(|_| anyhow!("{stream} capture lock poisoned"))?;
        Ok((mem::take(&mut capture.bytes), capture.truncated))
    }
}

fn read_stream_limited<R: Read, W: Write>(
    mut reader: R,
    limit: usize,
    mut echo: W,
    capture: &Mutex<StreamCapture>,
) -> Result<()> {
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            return Ok(());
        }
        // Best effort: losing our own stdout must not stop the drain.
        let _ = echo.write_all(&chunk[..n]).and_then(|()| echo.flush());

        let mut kept = capture
            .lock()
            .map_err(|_| anyhow!("output capture lock poisoned"))?;
        let keep = n.min(limit.saturating_sub(kept.bytes.len()));
        kept.bytes.extend_from_slice(&chunk[..keep]);
        kept.truncated += n - keep;
    }
}
