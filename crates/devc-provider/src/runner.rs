//! External process execution
//!
//! Every engine operation ends up here as an argv. The runner inherits
//! stdin and stderr so interactive sessions and build progress reach the
//! user's terminal, and either streams or captures stdout.

use crate::{OutputMode, ProviderError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Runs external programs on behalf of an engine
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `argv` with `cwd` as working directory.
    ///
    /// Returns trimmed stdout in [`OutputMode::Capture`], an empty string otherwise.
    async fn run(&self, argv: &[String], cwd: &Path, mode: OutputMode) -> Result<String>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct CliRunner;

impl CliRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for CliRunner {
    async fn run(&self, argv: &[String], cwd: &Path, mode: OutputMode) -> Result<String> {
        let (program, args) = argv.split_first().ok_or(ProviderError::EmptyCommand)?;
        let line = shell_words::join(argv);
        tracing::info!("Running: {}", line);
        tracing::debug!("Working directory: {}", cwd.display());

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit());

        let spawn_error = |e: std::io::Error| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProviderError::NotFound(program.clone())
            } else {
                ProviderError::IoError(e)
            }
        };

        let (status, stdout) = match mode {
            OutputMode::Stream => {
                let status = cmd
                    .stdout(Stdio::inherit())
                    .status()
                    .await
                    .map_err(spawn_error)?;
                (status, String::new())
            }
            OutputMode::Capture => {
                let output = cmd
                    .stdout(Stdio::piped())
                    .output()
                    .await
                    .map_err(spawn_error)?;
                let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (output.status, stdout)
            }
        };

        if !status.success() {
            return Err(ProviderError::CommandFailed {
                command: line,
                code: status.code(),
            });
        }

        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_capture_trims_output() {
        let tmp = tempfile::tempdir().unwrap();
        let out = CliRunner::new()
            .run(&argv(&["sh", "-c", "echo '  hello  '"]), tmp.path(), OutputMode::Capture)
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("marker"), "x").unwrap();
        let out = CliRunner::new()
            .run(&argv(&["ls"]), tmp.path(), OutputMode::Capture)
            .await
            .unwrap();
        assert_eq!(out, "marker");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = CliRunner::new()
            .run(&argv(&["sh", "-c", "exit 3"]), tmp.path(), OutputMode::Stream)
            .await
            .unwrap_err();
        match err {
            ProviderError::CommandFailed { command, code } => {
                assert_eq!(command, "sh -c 'exit 3'");
                assert_eq!(code, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let tmp = tempfile::tempdir().unwrap();
        let err = CliRunner::new()
            .run(&argv(&["devc-no-such-binary"]), tmp.path(), OutputMode::Capture)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(p) if p == "devc-no-such-binary"));
    }

    #[tokio::test]
    async fn test_empty_argv() {
        let tmp = tempfile::tempdir().unwrap();
        let err = CliRunner::new()
            .run(&[], tmp.path(), OutputMode::Capture)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyCommand));
    }
}
