//! `releasecmd`: tag the current commit and upload built packages.
//!
//! Reads the version from the source tree (or `--version`), creates and
//! pushes `v<version>`, then uploads matching files from `dist/` with twine.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use releasecmd::error::exit_code_for;
use releasecmd::exit_codes;
use releasecmd::io::config::{DEFAULT_CONFIG_FILE, load_config};
use releasecmd::io::executor::{CommandExecutor, ProcessRunner, ThreadSleeper};
use releasecmd::io::process::DEFAULT_OUTPUT_LIMIT_BYTES;
use releasecmd::logging;
use releasecmd::release::{ReleaseFlags, ReleaseOptions, run_release};

#[derive(Parser, Debug)]
#[command(
    name = "releasecmd",
    about = "Create a git tag and push it, then upload packages to PyPI"
)]
struct Cli {
    /// Skip creating and pushing the git tag.
    #[arg(long)]
    skip_tagging: bool,

    /// Skip uploading packages.
    #[arg(long)]
    skip_uploading: bool,

    /// Print the commands that would run without running them.
    #[arg(long)]
    dry_run: bool,

    /// Sign packages with gpg and create a signed tag.
    #[arg(long)]
    sign: bool,

    /// Verbose upload output and debug diagnostics.
    #[arg(short, long)]
    verbose: bool,

    /// Directory to search for the version file (default: current directory).
    #[arg(long, value_name = "DIR")]
    search_dir: Option<PathBuf>,

    /// Tag name template; `{version}` is replaced by the version.
    #[arg(long, value_name = "TEMPLATE")]
    tag_template: Option<String>,

    /// Release this version instead of reading it from the source tree.
    #[arg(long, value_name = "VERSION")]
    version: Option<String>,

    /// Configuration file (default: ./release.toml when present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn flags(&self) -> ReleaseFlags {
        ReleaseFlags {
            skip_tagging: self.skip_tagging,
            skip_uploading: self.skip_uploading,
            dry_run: self.dry_run,
            sign: self.sign,
            verbose: self.verbose,
            search_dir: self.search_dir.clone(),
            tag_template: self.tag_template.clone(),
            version: self.version.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(&cli) {
        Ok(()) => ExitCode::from(exit_codes::OK as u8),
        Err(err) => {
            eprintln!("[ERROR] {err:#}");
            ExitCode::from(exit_status_byte(exit_code_for(&err)))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let root = std::env::current_dir().context("resolve current directory")?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| root.join(DEFAULT_CONFIG_FILE));
    let config = load_config(&config_path)?;
    let options = ReleaseOptions::new(&root, &config, cli.flags())?;
    debug!(?options, config = %config_path.display(), "options resolved");

    let runner = ProcessRunner {
        timeout: Duration::from_secs(config.command_timeout_secs),
        output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
    };
    let executor = CommandExecutor::new(
        runner,
        ThreadSleeper,
        config.retry.backoff(),
        options.dry_run,
    );
    let outcome = run_release(&options, &executor)?;
    debug!(?outcome, "release finished");
    Ok(())
}

/// Exit statuses are a single byte on POSIX; out-of-range codes become 1.
fn exit_status_byte(code: i32) -> u8 {
    u8::try_from(code)
        .ok()
        .filter(|byte| *byte != 0)
        .unwrap_or(exit_codes::INVALID as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["releasecmd"]);
        let flags = cli.flags();
        assert!(!flags.skip_tagging && !flags.skip_uploading && !flags.dry_run && !flags.sign);
        assert!(flags.version.is_none());
    }

    #[test]
    fn parse_version_override_and_switches() {
        let cli = Cli::parse_from([
            "releasecmd",
            "--version",
            "1.2.3",
            "--skip-tagging",
            "--dry-run",
            "--tag-template",
            "release-{version}",
        ]);
        let flags = cli.flags();
        assert_eq!(flags.version.as_deref(), Some("1.2.3"));
        assert!(flags.skip_tagging && flags.dry_run);
        assert_eq!(flags.tag_template.as_deref(), Some("release-{version}"));
    }

    #[test]
    fn exit_status_stays_nonzero() {
        assert_eq!(exit_status_byte(2), 2);
        assert_eq!(exit_status_byte(300), 1);
        assert_eq!(exit_status_byte(-1), 1);
        assert_eq!(exit_status_byte(0), 1);
    }
}
