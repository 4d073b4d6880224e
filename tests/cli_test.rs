//! Integration tests for the command-line surface
//!
//! Usage output, exit codes and argument validation.

mod common;

use common::{stderr, stdout, TestWorkspace};

#[test]
fn test_no_subcommand_prints_usage() {
    let workspace = TestWorkspace::new();
    let output = workspace.run(&[]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage"), "stdout: {}", stdout(&output));
}

#[test]
fn test_unknown_subcommand_prints_usage() {
    let workspace = TestWorkspace::new();
    let output = workspace.run(&["frobnicate"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Usage"));
}

#[test]
fn test_version_flag() {
    let workspace = TestWorkspace::new();
    let output = workspace.run(&["--version"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("monoforge"));
}

#[test]
fn test_build_without_package_fails() {
    let workspace = TestWorkspace::new();
    let output = workspace.run(&["build"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Please specify a package"));
}

#[test]
fn test_dev_without_package_fails() {
    let workspace = TestWorkspace::new();
    let output = workspace.run(&["dev"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Please specify a package"));
}

#[test]
fn test_dev_mode_flags_are_exclusive() {
    let workspace = TestWorkspace::new();
    workspace.add_package("app", &[]);
    let output = workspace.run(&["dev", "app", "--alias", "--dist"]);

    assert!(!output.status.success());
}

#[test]
fn test_dev_unknown_entry_fails() {
    let workspace = TestWorkspace::new();
    workspace.add_package("app", &[]);
    let output = workspace.run(&["dev", "missing", "--port", "0"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("missing"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let workspace = TestWorkspace::new();
    workspace.add_package("a", &[]);
    workspace.write_config("[build]\njobs = 0\n");

    let output = workspace.run(&["analyze"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("configuration"));
}

#[test]
fn test_malformed_config_is_rejected() {
    let workspace = TestWorkspace::new();
    workspace.write_config("[build\n");

    let output = workspace.run(&["analyze"]);
    assert!(!output.status.success());
}
