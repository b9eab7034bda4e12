//! CLI tests for `releasecmd` exit codes and tool I/O.
//!
//! Most runs stop at a precondition before any external tool is invoked; the
//! upload test swaps twine for a shell script.

use std::process::Command;

use releasecmd::exit_codes;
use releasecmd::test_support::ProjectDir;

#[test]
fn missing_dist_exits_with_not_found() {
    let project = ProjectDir::new().expect("project");

    let output = Command::new(env!("CARGO_BIN_EXE_releasecmd"))
        .current_dir(project.path())
        .output()
        .expect("releasecmd");

    assert_eq!(output.status.code(), Some(exit_codes::NOT_FOUND));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[ERROR]"), "stderr: {stderr}");
    assert!(stderr.contains("directory not found"), "stderr: {stderr}");
}

#[test]
fn invalid_version_exits_with_einval() {
    let project = ProjectDir::with_version("proj", "1.0.0").expect("project");

    let status = Command::new(env!("CARGO_BIN_EXE_releasecmd"))
        .current_dir(project.path())
        .args(["--version", "not a version"])
        .status()
        .expect("releasecmd");

    assert_eq!(status.code(), Some(exit_codes::INVALID_VERSION));
}

#[test]
fn no_matching_artifacts_exits_with_not_found() {
    let project = ProjectDir::with_version("proj", "1.0.0").expect("project");
    project.write_artifacts(&["proj-0.9.0.tar.gz"]).expect("artifacts");

    let status = Command::new(env!("CARGO_BIN_EXE_releasecmd"))
        .current_dir(project.path())
        .status()
        .expect("releasecmd");

    assert_eq!(status.code(), Some(exit_codes::NOT_FOUND));
}

#[test]
fn invalid_config_exits_with_invalid() {
    let project = ProjectDir::with_version("proj", "1.0.0").expect("project");
    project
        .write_file("release.toml", "tag_template = \"latest\"\n")
        .expect("config");

    let status = Command::new(env!("CARGO_BIN_EXE_releasecmd"))
        .current_dir(project.path())
        .status()
        .expect("releasecmd");

    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn dry_run_succeeds_without_tools() {
    let project = ProjectDir::with_version("proj", "1.0.0").expect("project");
    project.write_artifacts(&["proj-1.0.0.tar.gz"]).expect("artifacts");

    let output = Command::new(env!("CARGO_BIN_EXE_releasecmd"))
        .current_dir(project.path())
        .arg("--dry-run")
        .output()
        .expect("releasecmd");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dry run: git tag v1.0.0"), "stdout: {stdout}");
    assert!(stdout.contains("dry run: twine upload"), "stdout: {stdout}");
}

/// Stand-in for twine that asks for a username like an unconfigured upload.
#[cfg(unix)]
const PROMPTING_TWINE: &str = "#!/bin/sh\n\
    printf 'Enter your username: '\n\
    read -r user || exit 1\n\
    echo \"uploaded as $user\"\n";

/// Tools read credentials from our stdin and their output reaches our stdout.
#[cfg(unix)]
#[test]
fn upload_tool_can_prompt_on_the_terminal() {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::process::Stdio;

    let project = ProjectDir::with_version("proj", "1.0.0").expect("project");
    project.write_artifacts(&["proj-1.0.0.tar.gz"]).expect("artifacts");
    let twine = project
        .write_file("bin/twine", PROMPTING_TWINE)
        .expect("script");
    std::fs::set_permissions(&twine, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    project
        .write_file(
            "release.toml",
            &format!(
                "[tools]\n\
                 twine = \"{}\"\n\
                 \n\
                 [retry]\n\
                 max_attempts = 1\n\
                 backoff_factor_secs = 0.0\n\
                 jitter_secs = 0.0\n",
                twine.display()
            ),
        )
        .expect("config");

    let mut child = Command::new(env!("CARGO_BIN_EXE_releasecmd"))
        .current_dir(project.path())
        .arg("--skip-tagging")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("releasecmd");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"alice\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        output.status.code(),
        Some(exit_codes::OK),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Enter your username: "), "stdout: {stdout}");
    assert!(stdout.contains("uploaded as alice"), "stdout: {stdout}");
}
