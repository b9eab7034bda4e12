//! Locate the version declaration in a source tree.

use std::cmp::Ordering;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, instrument};
use walkdir::{DirEntry, WalkDir};

use crate::core::declaration::{VERSION_BINDING, find_string_binding};
use crate::error::ReleaseError;

/// Where the release version came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    /// Given explicitly by the user.
    Override,
    /// Read from a declaration file.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: String,
    pub source: VersionSource,
}

/// Rules for finding version declaration files.
#[derive(Debug, Clone)]
pub struct VersionSearch {
    pub root: PathBuf,
    pub file_pattern: Regex,
    pub exclude_patterns: Vec<Regex>,
}

impl VersionSearch {
    pub fn new(
        root: impl Into<PathBuf>,
        file_pattern: &str,
        exclude_patterns: &[String],
    ) -> Result<Self> {
        let file_pattern = Regex::new(file_pattern)
            .with_context(|| format!("compile version file pattern {file_pattern}"))?;
        let exclude_patterns = exclude_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).with_context(|| format!("compile exclude pattern {pattern}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            root: root.into(),
            file_pattern,
            exclude_patterns,
        })
    }

    /// Candidate files in traversal order.
    ///
    /// Within each directory, files come before subdirectories and both are
    /// sorted by name, so the order does not depend on the filesystem.
    /// Directories matching an exclude pattern are not descended into, and
    /// entries that cannot be read are skipped.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by(files_first_by_name)
            .into_iter()
            .filter_entry(|entry| !self.is_excluded_entry(entry));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(cause = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !self.file_pattern.is_match(&name) {
                continue;
            }
            found.push(entry.into_path());
        }
        found
    }

    fn is_excluded_entry(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir() && self.is_excluded_dir(entry.path())
    }

    fn is_excluded_dir(&self, dir: &Path) -> bool {
        let Ok(rel) = dir.strip_prefix(&self.root) else {
            return false;
        };
        let rendered = slash_path(rel);
        let excluded = self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(&rendered));
        if excluded {
            debug!(dir = %dir.display(), "skipping excluded directory");
        }
        excluded
    }
}

fn files_first_by_name(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Render a relative directory as `/a/b/` for fragment matching.
fn slash_path(rel: &Path) -> String {
    let mut out = String::from("/");
    for component in rel.components() {
        if let Component::Normal(part) = component {
            out.push_str(&part.to_string_lossy());
            out.push('/');
        }
    }
    out
}

/// Read the version declared in `path`.
///
/// Missing file is an error. A file that cannot be read as UTF-8 text, has no
/// binding, or binds something other than a plain string literal yields
/// `Ok(None)`.
pub fn extract_version_from_file(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Err(ReleaseError::VersionFileNotFound(path.to_path_buf()).into());
    }
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            debug!(path = %path.display(), cause = %err, "skipping unreadable candidate");
            return Ok(None);
        }
    };
    match find_string_binding(&source, VERSION_BINDING) {
        Ok(version) => Ok(version),
        Err(err) => {
            // Treated as "no version here" so the search moves on. This hides
            // genuinely broken declarations; keep the cause visible in debug logs.
            debug!(path = %path.display(), cause = %err, "ignoring unreadable version binding");
            Ok(None)
        }
    }
}

/// Determine the release version: the override if given, otherwise the first
/// candidate file that declares one.
#[instrument(skip_all, fields(has_override = version_override.is_some()))]
pub fn resolve_version(
    version_override: Option<&str>,
    search: &VersionSearch,
) -> Result<ResolvedVersion> {
    if let Some(version) = version_override {
        return Ok(ResolvedVersion {
            version: version.to_string(),
            source: VersionSource::Override,
        });
    }

    for candidate in search.candidates() {
        if let Some(version) = extract_version_from_file(&candidate)? {
            debug!(path = %candidate.display(), %version, "version found");
            return Ok(ResolvedVersion {
                version,
                source: VersionSource::File(candidate),
            });
        }
    }

    Err(ReleaseError::VersionNotFound(search.root.clone()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::ReleaseConfig;
    use crate::test_support::ProjectDir;

    fn search(root: &Path) -> VersionSearch {
        let cfg = ReleaseConfig::default();
        VersionSearch::new(root, &cfg.version_file_pattern, &cfg.exclude_patterns).expect("search")
    }

    #[test]
    fn override_skips_filesystem() {
        let missing = Path::new("/definitely/not/a/real/dir");
        let resolved = resolve_version(Some("9.9.9"), &search(missing)).expect("override");
        assert_eq!(resolved.version, "9.9.9");
        assert_eq!(resolved.source, VersionSource::Override);
    }

    #[test]
    fn finds_version_in_package_file() {
        let project = ProjectDir::with_version("pkg", "1.2.3").expect("project");
        let resolved = resolve_version(None, &search(project.path())).expect("resolve");
        assert_eq!(resolved.version, "1.2.3");
        assert_eq!(
            resolved.source,
            VersionSource::File(project.path().join("pkg/__version__.py"))
        );
    }

    #[test]
    fn candidates_under_excluded_dirs_are_skipped() {
        let project = ProjectDir::new().expect("project");
        project
            .write_file("build/lib/pkg/__version__.py", "__version__ = \"1.2.3\"\n")
            .expect("write");
        project
            .write_file(".tox/py312/__version__.py", "__version__ = \"1.2.3\"\n")
            .expect("write");
        let err = resolve_version(None, &search(project.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReleaseError>(),
            Some(ReleaseError::VersionNotFound(_))
        ));
    }

    #[test]
    fn files_come_before_subdirectories() {
        let project = ProjectDir::new().expect("project");
        project
            .write_file("a/__version__.py", "__version__ = \"2.0.0\"\n")
            .expect("write");
        project
            .write_file("_top_.py", "__version__ = \"1.0.0\"\n")
            .expect("write");
        let candidates = search(project.path()).candidates();
        assert_eq!(
            candidates,
            vec![
                project.path().join("_top_.py"),
                project.path().join("a/__version__.py")
            ]
        );
        let resolved = resolve_version(None, &search(project.path())).expect("resolve");
        assert_eq!(resolved.version, "1.0.0");
    }

    #[test]
    fn candidates_without_version_are_passed_over() {
        let project = ProjectDir::new().expect("project");
        project
            .write_file("pkg/__init__.py", "from .core import run\n")
            .expect("write");
        project
            .write_file("pkg/__version__.py", "__version__ = '0.3.0'\n")
            .expect("write");
        let resolved = resolve_version(None, &search(project.path())).expect("resolve");
        assert_eq!(resolved.version, "0.3.0");
    }

    // Computed bindings are skipped like missing ones; the search continues.
    #[test]
    fn computed_binding_is_treated_as_not_found() {
        let project = ProjectDir::new().expect("project");
        project
            .write_file("pkg/__init__.py", "__version__ = get_version()\n")
            .expect("write");
        project
            .write_file("pkg/__version__.py", "__version__ = \"0.4.0\"\n")
            .expect("write");
        let resolved = resolve_version(None, &search(project.path())).expect("resolve");
        assert_eq!(resolved.version, "0.4.0");
    }

    #[test]
    fn non_utf8_candidate_is_passed_over() {
        let project = ProjectDir::new().expect("project");
        let legacy = project.path().join("a/__init__.py");
        fs::create_dir_all(legacy.parent().expect("parent")).expect("mkdir");
        fs::write(&legacy, b"# -*- coding: latin-1 -*-\n# caf\xe9\n").expect("write");
        project
            .write_file("b/__version__.py", "__version__ = \"1.2.3\"\n")
            .expect("write");

        assert_eq!(extract_version_from_file(&legacy).expect("extract"), None);
        let resolved = resolve_version(None, &search(project.path())).expect("resolve");
        assert_eq!(resolved.version, "1.2.3");
        assert_eq!(
            resolved.source,
            VersionSource::File(project.path().join("b/__version__.py"))
        );
    }

    #[test]
    fn missing_file_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = extract_version_from_file(&temp.path().join("__version__.py")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReleaseError>(),
            Some(ReleaseError::VersionFileNotFound(_))
        ));
    }
}
