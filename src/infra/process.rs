//! External process execution
//!
//! Runs per-package build commands through the platform shell and supervises
//! the long-running dev server process.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::process::{Child, Command};

use crate::config::defaults;
use crate::core::graph::PackageNode;
use crate::error::{BuildError, DevError};

/// Number of trailing output lines kept in a failure reason
const FAILURE_TAIL_LINES: usize = 10;

/// Runs the build of a single package
pub trait BuildRunner: Send + Sync {
    /// Build `package`, succeeding only if the build command succeeded
    fn run<'a>(&'a self, package: &'a PackageNode) -> BoxFuture<'a, Result<(), BuildError>>;
}

/// Runs a fixed shell command in the package directory
#[derive(Debug, Clone)]
pub struct ShellRunner {
    command: String,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(defaults::DEFAULT_BUILD_COMMAND)
    }
}

impl ShellRunner {
    /// Create a runner for `command`
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The shell command line
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl BuildRunner for ShellRunner {
    fn run<'a>(&'a self, package: &'a PackageNode) -> BoxFuture<'a, Result<(), BuildError>> {
        Box::pin(async move {
            tracing::debug!(
                "Running '{}' in {}",
                self.command,
                package.directory.display()
            );

            let output = shell_command(&self.command)
                .current_dir(&package.directory)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| BuildError::Spawn {
                    package: package.name.clone(),
                    error: e.to_string(),
                })?;

            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stdout.trim().is_empty() {
                tracing::debug!("[{}] stdout:\n{}", package.name, stdout.trim_end());
            }
            if !stderr.trim().is_empty() {
                tracing::debug!("[{}] stderr:\n{}", package.name, stderr.trim_end());
            }

            if output.status.success() {
                return Ok(());
            }

            let shown: &str = if stderr.trim().is_empty() { &stdout } else { &stderr };
            let tail = output_tail(shown);
            let reason = if tail.is_empty() {
                format!("command '{}' {}", self.command, describe_status(output.status))
            } else {
                format!(
                    "command '{}' {}: {tail}",
                    self.command,
                    describe_status(output.status)
                )
            };
            Err(BuildError::CommandFailed {
                package: package.name.clone(),
                reason,
            })
        })
    }
}

/// Build a command that runs `command_line` through the platform shell
pub fn shell_command(command_line: &str) -> Command {
    #[cfg(windows)]
    {
        let mut command = Command::new("cmd");
        command.args(["/C", command_line]);
        command
    }
    #[cfg(not(windows))]
    {
        let mut command = Command::new("sh");
        command.args(["-c", command_line]);
        command
    }
}

fn output_tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(FAILURE_TAIL_LINES);
    lines[start..].join("\n")
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

/// The entry package's dev server, running in its own process group
#[derive(Debug)]
pub struct DevProcess {
    package: String,
    child: Child,
}

impl DevProcess {
    /// Start `command` in the package directory
    ///
    /// Output goes to the terminal. Stdin is closed because the process runs
    /// in its own process group, where reading the terminal stops it.
    ///
    /// # Errors
    ///
    /// Returns `DevError::DevProcess` if the command cannot be launched.
    pub fn spawn(package: &PackageNode, command: &str) -> Result<Self, DevError> {
        let mut shell = shell_command(command);
        shell
            .current_dir(&package.directory)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        shell.process_group(0);

        let child = shell.spawn().map_err(|e| DevError::DevProcess {
            package: package.name.clone(),
            error: e.to_string(),
        })?;

        tracing::info!(
            "Started dev process for '{}' (pid {})",
            package.name,
            child.id().unwrap_or_default()
        );
        Ok(Self {
            package: package.name.clone(),
            child,
        })
    }

    /// Process id, if the process has not been reaped
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the process to exit on its own
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Ask the process group to stop, then kill it after `grace`
    pub async fn terminate(&mut self, grace: Duration) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(
                    "Dev process for '{}' already {}",
                    self.package,
                    describe_status(status)
                );
                return;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to poll dev process for '{}': {e}", self.package),
        }

        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            signal_group(pid, "-TERM").await;
            match tokio::time::timeout(grace, self.child.wait()).await {
                Ok(Ok(status)) => {
                    tracing::debug!(
                        "Dev process for '{}' {}",
                        self.package,
                        describe_status(status)
                    );
                    return;
                }
                Ok(Err(e)) => {
                    tracing::warn!("Failed to wait for dev process of '{}': {e}", self.package);
                }
                Err(_) => {
                    tracing::warn!(
                        "Dev process for '{}' did not exit within {}ms, killing it",
                        self.package,
                        grace.as_millis()
                    );
                    signal_group(pid, "-KILL").await;
                }
            }
        }
        #[cfg(not(unix))]
        let _ = grace;

        if let Err(e) = self.child.start_kill() {
            tracing::debug!("Kill of dev process for '{}' failed: {e}", self.package);
        }
        if let Err(e) = self.child.wait().await {
            tracing::warn!("Failed to reap dev process of '{}': {e}", self.package);
        }
    }
}

#[cfg(unix)]
async fn signal_group(pid: u32, signal: &str) {
    let group = format!("-{pid}");
    let result = Command::new("kill")
        .args([signal, "--", group.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match result {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::debug!("kill {signal} {group} {}", describe_status(status)),
        Err(e) => tracing::warn!("Failed to run kill {signal} {group}: {e}"),
    }
}
