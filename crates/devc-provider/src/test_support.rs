//! Test support utilities for devc-provider
//!
//! Provides MockRunner for asserting on the exact argv an engine produces
//! without a container runtime installed.

use crate::{CommandRunner, OutputMode, ProviderError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One recorded invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerCall {
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub mode: OutputMode,
}

impl RunnerCall {
    /// Argv joined with single spaces
    pub fn command(&self) -> String {
        self.argv.join(" ")
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Exit(i32),
}

/// Scripted [`CommandRunner`]
///
/// Replies are matched in registration order against the space-joined argv;
/// the first rule whose needle is a substring wins. Unmatched commands
/// succeed with empty output. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    pub calls: Arc<Mutex<Vec<RunnerCall>>>,
    rules: Arc<Mutex<Vec<(String, Reply)>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` to commands containing `needle`
    pub fn respond(&self, needle: &str, output: &str) -> &Self {
        self.rules
            .lock()
            .unwrap()
            .push((needle.to_string(), Reply::Output(output.to_string())));
        self
    }

    /// Fail commands containing `needle` with exit `code`
    pub fn fail(&self, needle: &str, code: i32) -> &Self {
        self.rules
            .lock()
            .unwrap()
            .push((needle.to_string(), Reply::Exit(code)));
        self
    }

    /// Get all recorded calls
    pub fn get_calls(&self) -> Vec<RunnerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded argvs, space-joined
    pub fn commands(&self) -> Vec<String> {
        self.get_calls().iter().map(RunnerCall::command).collect()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, argv: &[String], cwd: &Path, mode: OutputMode) -> Result<String> {
        if argv.is_empty() {
            return Err(ProviderError::EmptyCommand);
        }

        let call = RunnerCall {
            argv: argv.to_vec(),
            cwd: cwd.to_path_buf(),
            mode,
        };
        let command = call.command();
        self.calls.lock().unwrap().push(call);

        let reply = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Exit(code)) => Err(ProviderError::CommandFailed {
                command: shell_words::join(argv),
                code: Some(code),
            }),
            Some(Reply::Output(output)) if mode == OutputMode::Capture => Ok(output),
            _ => Ok(String::new()),
        }
    }
}
