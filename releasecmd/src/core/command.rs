//! Command lines and their classified outcomes.

use std::fmt;

/// Exit code reported when a command was killed by a signal.
pub const SIGNALED_EXIT_CODE: i32 = 1;
/// Exit code reported when a command exceeded its timeout (matches `timeout(1)`).
pub const TIMED_OUT_EXIT_CODE: i32 = 124;
/// Exit code reported when the program could not be found (matches `sh`).
pub const NOT_FOUND_EXIT_CODE: i32 = 127;

/// An external command as an explicit argument vector.
///
/// Never passed through a shell; `Display` quotes arguments only for humans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:{}@+,%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Result of a single external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Child exceeded its timeout and was killed.
    pub timed_out: bool,
    /// Synthetic outcome produced by a dry run; nothing was spawned.
    pub simulated: bool,
}

impl CommandOutcome {
    pub fn from_exit_code(exit_code: i32) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            simulated: false,
        }
    }

    /// Successful outcome standing in for a command that was not run.
    pub fn simulated() -> Self {
        Self {
            simulated: true,
            ..Self::from_exit_code(0)
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_only_when_needed() {
        let cmd = CommandLine::new("git")
            .args(["tag", "--sign", "-m"])
            .arg("GPG signed 1.2.3 tag")
            .arg("v1.2.3");
        assert_eq!(
            cmd.to_string(),
            "git tag --sign -m 'GPG signed 1.2.3 tag' v1.2.3"
        );
    }

    #[test]
    fn display_escapes_single_quotes() {
        let cmd = CommandLine::new("echo").arg("it's");
        assert_eq!(cmd.to_string(), r"echo 'it'\''s'");
    }

    #[test]
    fn simulated_outcome_is_success() {
        let outcome = CommandOutcome::simulated();
        assert!(outcome.succeeded());
        assert!(outcome.simulated);
        assert!(outcome.stdout.is_empty() && outcome.stderr.is_empty());
    }
}
