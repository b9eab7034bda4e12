//! Failure taxonomy for a release run.
//!
//! Every fatal condition surfaces as a [`ReleaseError`] inside an
//! `anyhow::Error`; `main` downcasts it to pick the process exit code.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::command::CommandLine;
use crate::exit_codes;

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("{} directory not found. build the package first.", .0.display())]
    DistDirNotFound(PathBuf),

    #[error("file not found: {}", .0.display())]
    VersionFileNotFound(PathBuf),

    #[error("version not found in {}", .0.display())]
    VersionNotFound(PathBuf),

    #[error("invalid version string: {0}")]
    InvalidVersion(String),

    #[error("package files not found in '{}' that match the version ({version}) to upload", dir.display())]
    NoArtifacts { dir: PathBuf, version: String },

    #[error("tag already exists on {remote}: {tag}")]
    TagExists { tag: String, remote: String },

    #[error("failed to push tag {tag} (exit code {exit_code}): the remote rejected it{}", stderr_suffix(.stderr))]
    TagPushRejected {
        tag: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("failed to execute `{command}` (exit code {exit_code}){}", stderr_suffix(.stderr))]
    CommandFailed {
        command: CommandLine,
        exit_code: i32,
        stderr: String,
    },
}

impl ReleaseError {
    /// Process exit status for this failure category.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseError::DistDirNotFound(_)
            | ReleaseError::VersionFileNotFound(_)
            | ReleaseError::VersionNotFound(_)
            | ReleaseError::NoArtifacts { .. } => exit_codes::NOT_FOUND,
            ReleaseError::InvalidVersion(_) => exit_codes::INVALID_VERSION,
            ReleaseError::TagExists { .. } => exit_codes::ALREADY_EXISTS,
            ReleaseError::TagPushRejected { exit_code, .. }
            | ReleaseError::CommandFailed { exit_code, .. } => *exit_code,
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{trimmed}")
    }
}

/// Exit code for any error returned by the release pipeline.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ReleaseError>() {
        Some(release) => release.exit_code(),
        None => exit_codes::INVALID,
    }
}
