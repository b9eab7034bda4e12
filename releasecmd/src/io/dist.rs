//! Listing of the distribution output directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::artifacts::ArtifactMatcher;
use crate::error::ReleaseError;

/// Artifacts selected for upload, in directory-listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    paths: Vec<PathBuf>,
}

impl ArtifactSet {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

/// Fail with `ReleaseError::DistDirNotFound` unless `dir` is a directory.
pub fn ensure_dist_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    Err(ReleaseError::DistDirNotFound(dir.to_path_buf()).into())
}

/// File names in `dir`, in the order the OS lists them.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        if !entry.file_type().context("read file type")?.is_file() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Packages and signatures in `dir` that belong to `version`.
pub fn select_artifacts(dir: &Path, version: &str) -> Result<ArtifactSet> {
    let matcher = ArtifactMatcher::new(version)?;
    let names = list_file_names(dir)?;
    let paths = matcher
        .select_uploads(names.iter().map(String::as_str))
        .into_iter()
        .map(|name| dir.join(name))
        .collect();
    Ok(ArtifactSet { paths })
}

/// Packages in `dir` that belong to `version` and can be signed.
pub fn signable_artifacts(dir: &Path, version: &str) -> Result<Vec<PathBuf>> {
    let matcher = ArtifactMatcher::new(version)?;
    Ok(list_file_names(dir)?
        .into_iter()
        .filter(|name| matcher.is_signable(name))
        .map(|name| dir.join(name))
        .collect())
}
