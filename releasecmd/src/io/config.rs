//! Release configuration loaded from an optional `release.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::backoff::Backoff;
use crate::core::retry::DEFAULT_MAX_ATTEMPTS;
use crate::core::version::{DEFAULT_TAG_TEMPLATE, VERSION_PLACEHOLDER};

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "release.toml";

/// Release configuration (TOML).
///
/// Every field is optional in the file; missing fields take the defaults
/// below. Command-line flags override these values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Directory holding built packages, relative to the working directory.
    pub dist_dir: PathBuf,

    /// Tag name template; must contain `{version}`.
    pub tag_template: String,

    /// Remote queried for existing tags.
    pub remote: String,

    /// Root of the version file search.
    pub search_dir: PathBuf,

    /// Regex matched against file names to find version declarations.
    pub version_file_pattern: String,

    /// Regexes matched against `/`-separated directory paths to skip.
    pub exclude_patterns: Vec<String>,

    /// Kill any external command running longer than this.
    pub command_timeout_secs: u64,

    pub retry: RetryConfig,

    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first failure of a network command.
    pub max_attempts: u32,
    pub backoff_factor_secs: f64,
    pub jitter_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    pub git: String,
    pub gpg: String,
    pub twine: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            dist_dir: PathBuf::from("dist"),
            tag_template: DEFAULT_TAG_TEMPLATE.to_string(),
            remote: "origin".to_string(),
            search_dir: PathBuf::from("."),
            version_file_pattern: r"^_.+_\.py$".to_string(),
            exclude_patterns: [
                "/build/",
                "/.eggs/",
                "/.mypy_cache/",
                "/.tox/",
                "/.venv/",
                "/.pytest_cache/",
            ]
            .iter()
            .map(|pattern| regex::escape(pattern))
            .collect(),
            command_timeout_secs: 30 * 60,
            retry: RetryConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor_secs: 0.5,
            jitter_secs: 0.5,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            gpg: "gpg".to_string(),
            twine: "twine".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_secs_f64(self.backoff_factor_secs),
            Duration::from_secs_f64(self.jitter_secs),
        )
    }
}

impl ReleaseConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tag_template.contains(VERSION_PLACEHOLDER) {
            return Err(anyhow!(
                "tag_template must contain {VERSION_PLACEHOLDER}: {}",
                self.tag_template
            ));
        }
        if self.remote.trim().is_empty() {
            return Err(anyhow!("remote must be non-empty"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be > 0"));
        }
        for (name, value) in [
            ("retry.backoff_factor_secs", self.retry.backoff_factor_secs),
            ("retry.jitter_secs", self.retry.jitter_secs),
        ] {
            if !value.is_finite() || value < 0.0 || value > 3600.0 {
                return Err(anyhow!("{name} must be between 0 and 3600 seconds"));
            }
        }
        for (name, tool) in [
            ("tools.git", &self.tools.git),
            ("tools.gpg", &self.tools.gpg),
            ("tools.twine", &self.tools.twine),
        ] {
            if tool.trim().is_empty() {
                return Err(anyhow!("{name} must be non-empty"));
            }
        }
        Regex::new(&self.version_file_pattern).context("invalid version_file_pattern")?;
        for pattern in &self.exclude_patterns {
            Regex::new(pattern).with_context(|| format!("invalid exclude pattern {pattern}"))?;
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ReleaseConfig::default()`.
pub fn load_config(path: &Path) -> Result<ReleaseConfig> {
    if !path.exists() {
        let cfg = ReleaseConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ReleaseConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
