//! Scoped execution of native helper programs.
//!
//! The SANE and WIA adapters reach their subsystems through external
//! programs (`scanimage`, `powershell`). Every invocation here is bounded
//! by a timeout and spawned with `kill_on_drop`, so a timed-out or
//! abandoned call never leaves a process behind. Output captured to a
//! temporary file is removed when the call returns, on success or error.

use crate::core::{BackendKind, ScanError};

use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Captured result of one program run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit status.
    pub status: ExitStatus,
    /// Bytes written to stdout (empty when stdout went to a file).
    pub stdout: Vec<u8>,
    /// Stderr, lossily decoded.
    pub stderr: String,
}

impl ProcessOutput {
    /// Returns `true` if the program exited with status zero.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, if the program exited normally.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Stdout, lossily decoded.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// A one-line description of a failed run for error messages.
    pub fn failure_summary(&self) -> String {
        let stderr = self.stderr.trim();
        match (self.code(), stderr.is_empty()) {
            (Some(code), true) => format!("exited with status {}", code),
            (Some(code), false) => format!("exited with status {}: {}", code, stderr),
            (None, true) => "terminated by signal".to_string(),
            (None, false) => format!("terminated by signal: {}", stderr),
        }
    }
}

/// Runs one external program on behalf of a backend.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    backend: BackendKind,
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl ProcessRunner {
    /// Creates a runner for `program`, attributing failures to `backend`.
    pub fn new(backend: BackendKind, program: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Sets arguments passed before every call's own arguments.
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the program path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns the backend failures are attributed to.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    fn command<I, S>(&self, args: I, envs: &[(&str, String)]) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(args)
            .envs(envs.iter().map(|(key, value)| (*key, value.as_str())))
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Runs the program and captures stdout and stderr.
    ///
    /// A non-zero exit is not an error here; callers decide what it means.
    ///
    /// # Errors
    ///
    /// - `BackendUnavailable` if the program cannot be found or executed.
    /// - `Timeout` if it does not exit within `timeout` (it is killed).
    pub async fn run<I, S>(
        &self,
        args: I,
        envs: &[(&str, String)],
        timeout: Duration,
    ) -> Result<ProcessOutput, ScanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = self.command(args, envs);
        command.stdout(Stdio::piped());
        self.execute(command, timeout).await
    }

    /// Runs the program with stdout redirected to a temporary file and
    /// returns the file's contents alongside the run result.
    ///
    /// Used for image data, which can be far larger than is sensible to
    /// buffer through a pipe.
    pub async fn run_to_file<I, S>(
        &self,
        args: I,
        envs: &[(&str, String)],
        timeout: Duration,
    ) -> Result<(ProcessOutput, Vec<u8>), ScanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output_file = tempfile::Builder::new()
            .prefix("scanbridge-")
            .suffix(".out")
            .tempfile()
            .map_err(|e| self.io_error("create output file", e))?;
        let stdout = output_file
            .reopen()
            .map_err(|e| self.io_error("open output file", e))?;

        let mut command = self.command(args, envs);
        command.stdout(Stdio::from(stdout));
        let output = self.execute(command, timeout).await?;

        let data = tokio::fs::read(output_file.path())
            .await
            .map_err(|e| self.io_error("read output file", e))?;

        Ok((output, data))
    }

    async fn execute(
        &self,
        mut command: Command,
        timeout: Duration,
    ) -> Result<ProcessOutput, ScanError> {
        tracing::debug!(
            backend = %self.backend,
            program = %self.program.display(),
            timeout_ms = timeout.as_millis() as u64,
            "Running native helper"
        );

        let child = command.spawn().map_err(|e| self.spawn_error(e))?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ProcessOutput {
                status: output.status,
                stdout: output.stdout,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Ok(Err(e)) => Err(self.io_error("wait for process", e)),
            Err(_) => {
                // Dropping the wait future drops the child, which kills it.
                tracing::warn!(
                    backend = %self.backend,
                    program = %self.program.display(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Native helper timed out"
                );
                Err(ScanError::Timeout {
                    backend: self.backend,
                    elapsed: timeout,
                })
            }
        }
    }

    fn spawn_error(&self, error: std::io::Error) -> ScanError {
        match error.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => ScanError::unavailable(
                self.backend,
                format!("cannot execute {}: {}", self.program.display(), error),
            ),
            _ => self.io_error("spawn process", error),
        }
    }

    fn io_error(&self, action: &str, error: std::io::Error) -> ScanError {
        ScanError::backend_error(
            self.backend,
            format!("{} ({}): {}", action, self.program.display(), error),
        )
    }
}
