//! Integration tests for `monoforge build`
//!
//! Each package's build appends its directory name to `build.log` in the
//! project directory, so tests can see which builds ran and in what order.

#![cfg(unix)]

mod common;

use common::{stderr, stdout, TestWorkspace};

const RECORDING_BUILD: &str = "[build]\ncommand = 'basename \"$(pwd -P)\" >> ../../build.log'\n";

const FAILING_A_BUILD: &str = "[build]\ncommand = 'if [ \"$(basename \"$(pwd -P)\")\" = a ]; then echo \"broken import\" >&2; exit 1; fi; basename \"$(pwd -P)\" >> ../../build.log'\n";

fn chain_workspace(config: &str) -> TestWorkspace {
    let workspace = TestWorkspace::new();
    workspace.add_package("b", &[]);
    workspace.add_package("a", &["b"]);
    workspace.add_package("c", &["a"]);
    workspace.add_package("docs", &[]);
    workspace.write_config(config);
    workspace
}

fn build_log(workspace: &TestWorkspace) -> Vec<String> {
    workspace
        .read_file("build.log")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_build_runs_dependents_in_order() {
    let workspace = chain_workspace(RECORDING_BUILD);

    let output = workspace.run(&["build", "b"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(build_log(&workspace), vec!["b", "a", "c"]);
    assert!(stdout(&output).contains("Built 3 package(s), 0 unchanged"));
}

#[test]
fn test_build_only_touches_affected_packages() {
    let workspace = chain_workspace(RECORDING_BUILD);

    let output = workspace.run(&["build", "a"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(build_log(&workspace), vec!["a", "c"]);
}

#[test]
fn test_build_skips_unchanged_packages_across_runs() {
    let workspace = chain_workspace(RECORDING_BUILD);

    assert!(workspace.run(&["build", "b"]).status.success());
    assert!(workspace.file_exists(".monoforge/cache.json"));

    let output = workspace.run(&["build", "b"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(build_log(&workspace), vec!["b", "a", "c"]);
    assert!(stdout(&output).contains("Built 0 package(s), 3 unchanged"));
}

#[test]
fn test_build_rebuilds_changed_package_only() {
    let workspace = chain_workspace(RECORDING_BUILD);
    assert!(workspace.run(&["build", "b"]).status.success());

    workspace.create_file("packages/a/src/index.ts", "export const changed = true;\n");
    let output = workspace.run(&["build", "b"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(build_log(&workspace), vec!["b", "a", "c", "a"]);
}

#[test]
fn test_build_force_ignores_cache() {
    let workspace = chain_workspace(RECORDING_BUILD);
    assert!(workspace.run(&["build", "a"]).status.success());

    let output = workspace.run(&["build", "a", "--force"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(build_log(&workspace), vec!["a", "c", "a", "c"]);
}

#[test]
fn test_build_force_keeps_unrelated_entries() {
    let workspace = chain_workspace(RECORDING_BUILD);
    assert!(workspace.run(&["build", "docs"]).status.success());

    let forced = workspace.run(&["build", "b", "--force"]);
    assert!(forced.status.success(), "stderr: {}", stderr(&forced));

    let cache = workspace.read_file(".monoforge/cache.json");
    assert!(cache.contains("\"docs\""), "cache: {cache}");

    let again = workspace.run(&["build", "docs"]);
    assert!(again.status.success());
    assert!(stdout(&again).contains("Built 0 package(s), 1 unchanged"));
    let docs_builds = build_log(&workspace).iter().filter(|l| *l == "docs").count();
    assert_eq!(docs_builds, 1);
}

#[test]
fn test_build_without_persistence_always_rebuilds() {
    let config = format!("{RECORDING_BUILD}\n[cache]\npersist = false\n");
    let workspace = chain_workspace(&config);

    assert!(workspace.run(&["build", "c"]).status.success());
    assert!(workspace.run(&["build", "c"]).status.success());

    assert_eq!(build_log(&workspace), vec!["c", "c"]);
    assert!(!workspace.file_exists(".monoforge/cache.json"));
}

#[test]
fn test_build_failure_stops_dependents() {
    let workspace = chain_workspace(FAILING_A_BUILD);

    let output = workspace.run(&["build", "b"]);

    assert!(!output.status.success());
    assert_eq!(build_log(&workspace), vec!["b"]);
    let err = stderr(&output);
    assert!(err.contains("'a'") || err.contains(" a "), "stderr: {err}");
    assert!(err.contains("broken import"), "stderr: {err}");
}

#[test]
fn test_build_failure_keeps_successful_entries() {
    let workspace = chain_workspace(FAILING_A_BUILD);
    assert!(!workspace.run(&["build", "b"]).status.success());

    let info = workspace.run(&["cache", "info"]);
    let out = stdout(&info);
    assert!(out.contains("  b  "), "stdout: {out}");
    assert!(!out.contains("  a  "), "stdout: {out}");
}

#[test]
fn test_failed_package_is_retried_next_run() {
    let workspace = chain_workspace(FAILING_A_BUILD);
    assert!(!workspace.run(&["build", "b"]).status.success());

    workspace.write_config(RECORDING_BUILD);
    let output = workspace.run(&["build", "b"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(build_log(&workspace), vec!["b", "a", "c"]);
}

#[test]
fn test_build_unknown_package_fails() {
    let workspace = chain_workspace(RECORDING_BUILD);

    let output = workspace.run(&["build", "nope"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Package 'nope' not found"));
    assert!(build_log(&workspace).is_empty());
}

#[test]
fn test_build_rejects_zero_jobs() {
    let workspace = chain_workspace(RECORDING_BUILD);

    let output = workspace.run(&["build", "b", "--jobs", "0"]);

    assert!(!output.status.success());
    assert!(build_log(&workspace).is_empty());
}

#[test]
fn test_build_verbose_logs_order() {
    let workspace = chain_workspace(RECORDING_BUILD);

    let quiet = workspace.run(&["build", "b", "--force"]);
    assert!(!stderr(&quiet).contains("Build order"));

    let verbose = workspace.run(&["-v", "build", "b", "--force"]);
    assert!(verbose.status.success());
    assert!(stderr(&verbose).contains("Build order: b → a → c"));
}
