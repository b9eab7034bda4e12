//! Orchestration for a single release run.
//!
//! Steps run strictly in order and the first fatal condition stops the run:
//! validate the output directory, resolve and validate the version, sign
//! artifacts (optional), select artifacts, create and push the tag
//! (optional), upload (optional).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::command::CommandLine;
use crate::core::retry::RetryPolicy;
use crate::core::version::{VERSION_PLACEHOLDER, is_valid_version, render_tag};
use crate::error::ReleaseError;
use crate::io::config::{ReleaseConfig, ToolsConfig};
use crate::io::dist::{ensure_dist_dir, select_artifacts, signable_artifacts};
use crate::io::executor::{CommandExecutor, CommandRunner, Sleeper};
use crate::io::git::{Git, PushOutcome, RemoteTag};
use crate::io::version_file::{VersionSearch, VersionSource, resolve_version};

/// Per-invocation switches, usually from the command line.
#[derive(Debug, Clone, Default)]
pub struct ReleaseFlags {
    pub skip_tagging: bool,
    pub skip_uploading: bool,
    pub dry_run: bool,
    pub sign: bool,
    pub verbose: bool,
    pub search_dir: Option<PathBuf>,
    pub tag_template: Option<String>,
    pub version: Option<String>,
}

/// Everything a release run needs, built once and passed by reference.
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    pub dist_dir: PathBuf,
    pub search: VersionSearch,
    pub tag_template: String,
    pub remote: String,
    pub tools: ToolsConfig,
    pub max_attempts: u32,
    pub version_override: Option<String>,
    pub skip_tagging: bool,
    pub skip_uploading: bool,
    pub dry_run: bool,
    pub sign: bool,
    pub verbose: bool,
}

impl ReleaseOptions {
    /// Merge `flags` over `config`, resolving relative paths against `root`.
    pub fn new(root: &Path, config: &ReleaseConfig, flags: ReleaseFlags) -> Result<Self> {
        let tag_template = flags
            .tag_template
            .unwrap_or_else(|| config.tag_template.clone());
        if !tag_template.contains(VERSION_PLACEHOLDER) {
            return Err(anyhow!(
                "tag template must contain {VERSION_PLACEHOLDER}: {tag_template}"
            ));
        }
        let search_dir = flags
            .search_dir
            .unwrap_or_else(|| config.search_dir.clone());
        let search = VersionSearch::new(
            root.join(search_dir),
            &config.version_file_pattern,
            &config.exclude_patterns,
        )?;
        Ok(Self {
            dist_dir: root.join(&config.dist_dir),
            search,
            tag_template,
            remote: config.remote.clone(),
            tools: config.tools.clone(),
            max_attempts: config.retry.max_attempts,
            version_override: flags.version,
            skip_tagging: flags.skip_tagging,
            skip_uploading: flags.skip_uploading,
            dry_run: flags.dry_run,
            sign: flags.sign,
            verbose: flags.verbose,
        })
    }
}

/// Summary of a completed release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub version: String,
    /// Tag created and pushed, unless tagging was skipped.
    pub tag: Option<String>,
    /// Files passed to the upload tool, empty if uploading was skipped.
    pub uploaded: Vec<PathBuf>,
}

/// Run the release pipeline.
#[instrument(skip_all, fields(dry_run = options.dry_run))]
pub fn run_release<R: CommandRunner, S: Sleeper>(
    options: &ReleaseOptions,
    executor: &CommandExecutor<R, S>,
) -> Result<ReleaseOutcome> {
    ensure_dist_dir(&options.dist_dir)?;

    let resolved = resolve_version(options.version_override.as_deref(), &options.search)?;
    if let VersionSource::File(path) = &resolved.source {
        println!("[get the version from {}]", path.display());
    }
    let version = resolved.version;
    if !is_valid_version(&version) {
        return Err(ReleaseError::InvalidVersion(version).into());
    }
    info!(%version, "version resolved");

    if options.sign {
        sign_artifacts(options, executor, &version)?;
    }

    let artifacts = select_artifacts(&options.dist_dir, &version)?;
    if artifacts.is_empty() {
        return Err(ReleaseError::NoArtifacts {
            dir: options.dist_dir.clone(),
            version,
        }
        .into());
    }
    debug!(count = artifacts.len(), "artifacts selected");

    let tag = if options.skip_tagging {
        debug!("tagging skipped");
        None
    } else {
        Some(create_and_push_tag(options, executor, &version)?)
    };

    let uploaded = if options.skip_uploading {
        debug!("upload skipped");
        Vec::new()
    } else {
        upload_artifacts(options, executor, artifacts.paths())?;
        artifacts.into_paths()
    };

    Ok(ReleaseOutcome {
        version,
        tag,
        uploaded,
    })
}

fn sign_artifacts<R: CommandRunner, S: Sleeper>(
    options: &ReleaseOptions,
    executor: &CommandExecutor<R, S>,
    version: &str,
) -> Result<()> {
    warn!("detached signatures are deprecated");
    eprintln!(
        "[WARNING] PyPI no longer accepts detached signatures; the .asc files will be ignored by the index"
    );
    for path in signable_artifacts(&options.dist_dir, version)? {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("[create a .asc file for {file_name}]");
        let cmd = CommandLine::new(&options.tools.gpg)
            .args(["--detach-sign", "--armor"])
            .arg(path.to_string_lossy());
        executor
            .execute(&cmd, None)
            .with_context(|| format!("sign {}", path.display()))?;
    }
    Ok(())
}

fn create_and_push_tag<R: CommandRunner, S: Sleeper>(
    options: &ReleaseOptions,
    executor: &CommandExecutor<R, S>,
    version: &str,
) -> Result<String> {
    let tag = render_tag(&options.tag_template, version);
    let git = Git::new(
        executor,
        &options.tools.git,
        &options.remote,
        options.max_attempts,
    );

    println!("[fetch git tags]");
    git.fetch_tags()?;

    println!("[check the git tag existence: {tag}]");
    if git.remote_tag(&tag)? == RemoteTag::Present {
        return Err(ReleaseError::TagExists {
            tag,
            remote: git.remote().to_string(),
        }
        .into());
    }

    let sign_message = options.sign.then(|| format!("GPG signed {version} tag"));
    let extra_log = if options.sign { " with gpg signing" } else { "" };
    println!("[create a git tag{extra_log}: {tag}]");
    git.create_tag(&tag, sign_message.as_deref())?;

    println!("[push git tags]");
    match git.push_tags()? {
        PushOutcome::Pushed => {}
        PushOutcome::Rejected { exit_code, stderr } => {
            return Err(ReleaseError::TagPushRejected {
                tag,
                exit_code,
                stderr,
            }
            .into());
        }
    }
    info!(%tag, "tag pushed");
    Ok(tag)
}

fn upload_artifacts<R: CommandRunner, S: Sleeper>(
    options: &ReleaseOptions,
    executor: &CommandExecutor<R, S>,
    paths: &[PathBuf],
) -> Result<()> {
    println!("[upload packages to PyPI]");
    let mut cmd = CommandLine::new(&options.tools.twine).arg("upload");
    if options.verbose {
        cmd = cmd.arg("--verbose");
    }
    let cmd = cmd.args(paths.iter().map(|path| path.to_string_lossy().into_owned()));
    executor.execute(&cmd, Some(&RetryPolicy::new(options.max_attempts)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backoff::Backoff;
    use crate::test_support::{ProjectDir, RecordingSleeper, ScriptedRunner};

    fn options(project: &ProjectDir, flags: ReleaseFlags) -> ReleaseOptions {
        ReleaseOptions::new(project.path(), &ReleaseConfig::default(), flags).expect("options")
    }

    fn executor(
        runner: ScriptedRunner,
        dry_run: bool,
    ) -> CommandExecutor<ScriptedRunner, RecordingSleeper> {
        CommandExecutor::new(runner, RecordingSleeper::default(), Backoff::default(), dry_run)
    }

    #[test]
    fn options_reject_template_without_placeholder() {
        let project = ProjectDir::new().expect("project");
        let flags = ReleaseFlags {
            tag_template: Some("latest".to_string()),
            ..ReleaseFlags::default()
        };
        assert!(ReleaseOptions::new(project.path(), &ReleaseConfig::default(), flags).is_err());
    }

    #[test]
    fn invalid_version_stops_before_any_command() {
        let project = ProjectDir::with_version("proj", "not-a-version").expect("project");
        project.write_artifacts(&["proj-1.0.tar.gz"]).expect("artifacts");
        let exec = executor(ScriptedRunner::new(), false);
        let err = run_release(&options(&project, ReleaseFlags::default()), &exec).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReleaseError>(),
            Some(ReleaseError::InvalidVersion(_))
        ));
        assert!(exec.runner().calls().is_empty());
    }

    #[test]
    fn padded_override_is_rejected_before_tagging() {
        let project = ProjectDir::with_version("proj", "1.2.3").expect("project");
        project.write_artifacts(&["proj-1.2.3.tar.gz"]).expect("artifacts");
        let exec = executor(ScriptedRunner::new(), false);
        let flags = ReleaseFlags {
            version: Some(" 1.2.3 ".to_string()),
            ..ReleaseFlags::default()
        };
        let err = run_release(&options(&project, flags), &exec).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ReleaseError>().map(ReleaseError::exit_code),
            Some(crate::exit_codes::INVALID_VERSION)
        );
        assert!(exec.runner().calls().is_empty());
    }

    #[test]
    fn no_artifacts_is_reported_before_tagging() {
        let project = ProjectDir::with_version("proj", "1.2.3").expect("project");
        project.write_artifacts(&["proj-1.2.2.tar.gz"]).expect("artifacts");
        let exec = executor(ScriptedRunner::new(), false);
        let err = run_release(&options(&project, ReleaseFlags::default()), &exec).unwrap_err();
        let release = err.downcast_ref::<ReleaseError>().expect("release error");
        assert!(matches!(release, ReleaseError::NoArtifacts { .. }));
        assert_eq!(release.exit_code(), crate::exit_codes::NOT_FOUND);
        assert!(exec.runner().calls().is_empty());
    }

    #[test]
    fn verbose_upload_passes_flag() {
        let project = ProjectDir::with_version("proj", "1.2.3").expect("project");
        project.write_artifacts(&["proj-1.2.3.tar.gz"]).expect("artifacts");
        let exec = executor(ScriptedRunner::new(), false);
        let flags = ReleaseFlags {
            skip_tagging: true,
            verbose: true,
            ..ReleaseFlags::default()
        };
        run_release(&options(&project, flags), &exec).expect("release");
        let calls = exec.runner().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args[..2], ["upload", "--verbose"]);
    }

    #[test]
    fn custom_template_names_the_tag() {
        let project = ProjectDir::with_version("proj", "1.2.3").expect("project");
        project.write_artifacts(&["proj-1.2.3.tar.gz"]).expect("artifacts");
        let exec = executor(ScriptedRunner::new().exit_codes("git ls-remote", [2]), false);
        let flags = ReleaseFlags {
            skip_uploading: true,
            tag_template: Some("release-{version}".to_string()),
            ..ReleaseFlags::default()
        };
        let outcome = run_release(&options(&project, flags), &exec).expect("release");
        assert_eq!(outcome.tag.as_deref(), Some("release-1.2.3"));
        assert_eq!(exec.runner().count("git tag release-1.2.3"), 1);
    }
}
