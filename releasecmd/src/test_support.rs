//! Test-only helpers: scripted command runners and temp project layouts.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::command::{CommandLine, CommandOutcome};
use crate::io::executor::{CommandRunner, Sleeper};

/// Scripted responses for commands whose key starts with `prefix`.
struct Script {
    prefix: String,
    outcomes: VecDeque<CommandOutcome>,
    last: Option<CommandOutcome>,
}

/// Runner that records every command and answers from per-command scripts.
///
/// Commands are keyed as `"<program> <args...>"`; the first script whose
/// prefix matches answers. Each script replays its outcomes in order and then
/// keeps repeating the last one. Unscripted commands succeed.
#[derive(Default)]
pub struct ScriptedRunner {
    scripts: RefCell<Vec<Script>>,
    calls: RefCell<Vec<CommandLine>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script bare exit codes (empty streams) for commands starting with `prefix`.
    pub fn exit_codes<I: IntoIterator<Item = i32>>(self, prefix: &str, codes: I) -> Self {
        self.outcomes(prefix, codes.into_iter().map(CommandOutcome::from_exit_code))
    }

    /// Script full outcomes for commands starting with `prefix`.
    pub fn outcomes<I>(self, prefix: &str, outcomes: I) -> Self
    where
        I: IntoIterator<Item = CommandOutcome>,
    {
        self.scripts.borrow_mut().push(Script {
            prefix: prefix.to_string(),
            outcomes: outcomes.into_iter().collect(),
            last: None,
        });
        self
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<CommandLine> {
        self.calls.borrow().clone()
    }

    /// Rendered command lines run so far.
    pub fn call_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }

    /// Number of calls whose rendered line starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.call_lines()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    /// Fail unless every scripted outcome was consumed.
    pub fn assert_drained(&self) -> Result<()> {
        for script in self.scripts.borrow().iter() {
            if !script.outcomes.is_empty() {
                return Err(anyhow!(
                    "script for `{}` has {} unused outcomes",
                    script.prefix,
                    script.outcomes.len()
                ));
            }
        }
        Ok(())
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutcome> {
        self.calls.borrow_mut().push(command.clone());
        let key = command.to_string();
        let mut scripts = self.scripts.borrow_mut();
        let Some(script) = scripts.iter_mut().find(|s| key.starts_with(&s.prefix)) else {
            return Ok(CommandOutcome::from_exit_code(0));
        };
        if let Some(next) = script.outcomes.pop_front() {
            script.last = Some(next.clone());
            return Ok(next);
        }
        Ok(script
            .last
            .clone()
            .unwrap_or_else(|| CommandOutcome::from_exit_code(0)))
    }
}

/// Sleeper that records requested delays instead of blocking.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

/// Temporary project tree with a version file and a `dist/` directory.
pub struct ProjectDir {
    temp: TempDir,
}

impl ProjectDir {
    /// Empty temporary project (no `dist/`).
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: tempfile::tempdir().context("create temp project")?,
        })
    }

    /// Project with `<package>/__version__.py` declaring `version` and an empty `dist/`.
    pub fn with_version(package: &str, version: &str) -> Result<Self> {
        let project = Self::new()?;
        project.write_file(
            &format!("{package}/__version__.py"),
            &format!("__version__ = \"{version}\"\n"),
        )?;
        fs::create_dir_all(project.dist_dir()).context("create dist")?;
        Ok(project)
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.path().join("dist")
    }

    /// Write `contents` at `rel`, creating parent directories.
    pub fn write_file(&self, rel: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Create empty artifact files under `dist/`.
    pub fn write_artifacts(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.write_file(&format!("dist/{name}"), "")?;
        }
        Ok(())
    }
}
