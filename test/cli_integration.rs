//! CLI Integration Tests for rjs-optimize
//!
//! Runs the built binary end to end in scratch project directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Get the path to the rjs-optimize binary
fn rjs_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rjs-optimize"))
}

/// Command running in `dir`, isolated from the caller's environment
fn rjs(dir: &Path) -> Command {
    let mut cmd = Command::new(rjs_binary());
    cmd.current_dir(dir)
        .env_remove("RJS_OPTIMIZE_SKIP")
        .env_remove("RUST_LOG");
    cmd
}

/// Scratch project with a build profile
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("app.build.js"),
        "({ baseUrl: '${baseUrl}', name: 'main', out: 'main-built.js' })",
    )
    .unwrap();
    dir
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// General
// ============================================================================

#[test]
fn test_help() {
    let output = Command::new(rjs_binary())
        .arg("--help")
        .output()
        .expect("Failed to run rjs-optimize");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("optimize"));
    assert!(stdout.contains("engines"));
}

#[test]
fn test_version() {
    let output = Command::new(rjs_binary())
        .arg("--version")
        .output()
        .expect("Failed to run rjs-optimize");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_runner_rejected() {
    let dir = project();
    let output = rjs(dir.path())
        .args(["optimize", "--runner", "jscript"])
        .output()
        .expect("Failed to run rjs-optimize");

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("unknown runner"));
}

// ============================================================================
// Init / Engines
// ============================================================================

#[test]
fn test_init_writes_project_file() {
    let dir = project();
    let output = rjs(dir.path())
        .args(["init", "--config-file", "app.build.js"])
        .output()
        .expect("Failed to run rjs-optimize");

    assert!(output.status.success(), "init failed: {}", stderr(&output));
    let written = fs::read_to_string(dir.path().join("rjs-optimize.toml")).unwrap();
    assert!(written.contains("[optimize]"));
    assert!(written.contains("app.build.js"));

    // Refuses to overwrite without --force
    let again = rjs(dir.path())
        .arg("init")
        .output()
        .expect("Failed to run rjs-optimize");
    assert_eq!(again.status.code(), Some(2));
}

#[test]
fn test_engines_reports_selection() {
    let dir = project();
    let output = rjs(dir.path())
        .args(["engines", "--runner", "rhino"])
        .output()
        .expect("Failed to run rjs-optimize");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Runner preference: rhino"));
    assert!(stdout.contains("embedded JavaScript engine"));
}

// ============================================================================
// Optimize
// ============================================================================

#[test]
fn test_skip_flag() {
    let dir = project();
    let output = rjs(dir.path())
        .args(["optimize", "--skip", "--filter-config", "-c", "app.build.js"])
        .output()
        .expect("Failed to run rjs-optimize");

    assert!(output.status.success());
    assert!(stderr(&output).contains("Optimization is skipped."));
    assert!(!dir.path().join("target").exists());
}

#[test]
fn test_skip_from_environment() {
    let dir = project();
    let output = rjs(dir.path())
        .env("RJS_OPTIMIZE_SKIP", "1")
        .args(["optimize", "-c", "app.build.js"])
        .output()
        .expect("Failed to run rjs-optimize");

    assert!(output.status.success());
    assert!(stderr(&output).contains("Optimization is skipped."));
}

#[test]
fn test_missing_config_file_setting() {
    let dir = project();
    let output = rjs(dir.path())
        .args(["optimize", "--runner", "rhino"])
        .output()
        .expect("Failed to run rjs-optimize");

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("No build profile configured"));
}

#[test]
fn test_unreadable_build_profile() {
    let dir = project();
    fs::write(dir.path().join("r.js"), "print('never');").unwrap();

    let output = rjs(dir.path())
        .args([
            "optimize",
            "--runner",
            "rhino",
            "--optimizer-file",
            "r.js",
            "-c",
            "missing.build.js",
        ])
        .output()
        .expect("Failed to run rjs-optimize");

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_project_file_settings_are_used() {
    let dir = project();
    fs::write(
        dir.path().join("rjs-optimize.toml"),
        "[optimize]\nconfig_file = \"app.build.js\"\nskip = true\n",
    )
    .unwrap();

    let output = rjs(dir.path())
        .arg("optimize")
        .output()
        .expect("Failed to run rjs-optimize");

    assert!(output.status.success());
    assert!(stderr(&output).contains("Optimization is skipped."));
}

#[cfg(unix)]
#[test]
fn test_external_runner_with_explicit_executable() {
    let dir = project();
    fs::write(
        dir.path().join("r.sh"),
        "echo \"optimizing $1\"\nshift\necho \"params: $*\"\n",
    )
    .unwrap();

    let output = rjs(dir.path())
        .args([
            "optimize",
            "--runner",
            "nodejs",
            "--node-executable",
            "/bin/sh",
            "--optimizer-file",
            "r.sh",
            "--filter-config",
            "-D",
            "baseUrl=js",
            "-c",
            "app.build.js",
            "--",
            "optimize=none",
            "skipDirOptimize=true",
        ])
        .output()
        .expect("Failed to run rjs-optimize");

    assert!(output.status.success(), "optimize failed: {}", stderr(&output));
    let log = stderr(&output);
    assert!(log.contains("filtered-build.js"));
    assert!(log.contains("params: optimize=none skipDirOptimize=true"));

    let filtered =
        fs::read_to_string(dir.path().join("target/requirejs-config/filtered-build.js")).unwrap();
    assert!(filtered.contains("baseUrl: 'js'"));
}

#[cfg(unix)]
#[test]
fn test_external_runner_failure_exit_code() {
    let dir = project();
    fs::write(dir.path().join("r.sh"), "echo 'Error: module not found' >&2\nexit 1\n").unwrap();

    let output = rjs(dir.path())
        .args([
            "optimize",
            "--node-executable",
            "/bin/sh",
            "--optimizer-file",
            "r.sh",
            "-c",
            "app.build.js",
        ])
        .output()
        .expect("Failed to run rjs-optimize");

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error: module not found"));
}

#[cfg(unix)]
#[test]
fn test_no_filter_config_overrides_project_file() {
    let dir = project();
    fs::write(dir.path().join("r.sh"), "echo \"optimizing $1\"\n").unwrap();
    fs::write(
        dir.path().join("rjs-optimize.toml"),
        "[optimize]\nconfig_file = \"app.build.js\"\nfilter_config = true\n\
         node_executable = \"/bin/sh\"\noptimizer_file = \"r.sh\"\n",
    )
    .unwrap();

    let output = rjs(dir.path())
        .args(["optimize", "--no-filter-config"])
        .output()
        .expect("Failed to run rjs-optimize");

    assert!(output.status.success(), "optimize failed: {}", stderr(&output));
    let log = stderr(&output);
    let line = log
        .lines()
        .find(|l| l.contains("optimizing "))
        .expect("optimizer output missing");
    assert!(line.ends_with("app.build.js"));
    assert!(!log.contains("filtered-build.js"));
    assert!(!dir.path().join("target").exists());
}

#[cfg(feature = "embedded-engine")]
#[test]
fn test_embedded_runner_end_to_end() {
    let dir = project();
    fs::write(
        dir.path().join("r.js"),
        "print('Tracing dependencies for: ' + arguments[0]);",
    )
    .unwrap();

    let output = rjs(dir.path())
        .args([
            "optimize",
            "--runner",
            "rhino",
            "--optimizer-file",
            "r.js",
            "-c",
            "app.build.js",
        ])
        .output()
        .expect("Failed to run rjs-optimize");

    assert!(output.status.success(), "optimize failed: {}", stderr(&output));
    assert!(stderr(&output).contains("Tracing dependencies for:"));
}

#[cfg(feature = "embedded-engine")]
#[test]
fn test_embedded_runner_exit_codes() {
    let dir = project();
    fs::write(dir.path().join("quit.js"), "quit(1);").unwrap();
    fs::write(dir.path().join("broken.js"), "var = ;").unwrap();

    let run = |script: &str| {
        rjs(dir.path())
            .args([
                "optimize",
                "--runner",
                "rhino",
                "--optimizer-file",
                script,
                "-c",
                "app.build.js",
            ])
            .output()
            .expect("Failed to run rjs-optimize")
    };

    assert_eq!(run("quit.js").status.code(), Some(1));
    assert_eq!(run("broken.js").status.code(), Some(4));
}
