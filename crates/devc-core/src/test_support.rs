//! Test support utilities for devc-core
//!
//! Provides MockEngine for unit testing the ContainerManager without a
//! container runtime. The mock keeps a tiny state machine so probes reflect
//! earlier build / create / start calls.

use crate::ContainerManager;
use async_trait::async_trait;
use devc_config::DevContainerConfig;
use devc_provider::*;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records which methods were called on the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Init,
    IsBuilt,
    IsCreated,
    IsRunning,
    Build,
    Create,
    Start,
    Stop,
    Remove,
    List,
    Run { command: Vec<String> },
    Exec { command: Vec<String>, options: ExecOptions },
}

/// Configurable mock engine; clones share state
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    pub calls: Arc<Mutex<Vec<MockCall>>>,
    pub state: Arc<Mutex<EngineStatus>>,
    /// Operations that fail, by lowercase name ("build", "exec", ...)
    pub failing: Arc<Mutex<Vec<&'static str>>>,
    /// Captured output returned by `run`
    pub run_output: Arc<Mutex<String>>,
}

impl MockEngine {
    /// A mock with nothing built, created or running
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock whose container already exists and runs
    pub fn running() -> Self {
        let mock = Self::new();
        mock.set_state(EngineStatus {
            built: true,
            created: true,
            running: true,
        });
        mock
    }

    pub fn set_state(&self, status: EngineStatus) {
        *self.state.lock().unwrap() = status;
    }

    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().unwrap().push(operation);
    }

    /// Get all recorded calls
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls equal to `call`
    pub fn count(&self, call: &MockCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    /// Calls that change state or run commands, without probes
    pub fn actions(&self) -> Vec<MockCall> {
        self.get_calls()
            .into_iter()
            .filter(|c| {
                !matches!(
                    c,
                    MockCall::Init | MockCall::IsBuilt | MockCall::IsCreated | MockCall::IsRunning
                )
            })
            .collect()
    }

    /// Argv of every exec call, in order
    pub fn exec_commands(&self) -> Vec<Vec<String>> {
        self.get_calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Exec { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    /// A manager over a clone of this mock, configured from `json`
    pub fn manager(&self, json: &str) -> ContainerManager {
        let config = DevContainerConfig::parse(json, Path::new("devcontainer.json"))
            .expect("valid test configuration");
        ContainerManager::with_engine(Box::new(self.clone()), config, Duration::ZERO)
    }

    fn record(&self, call: MockCall, operation: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&operation) {
            return Err(ProviderError::CommandFailed {
                command: format!("mock {}", operation),
                code: Some(1),
            });
        }
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut EngineStatus)) {
        f(&mut self.state.lock().unwrap());
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Docker
    }

    fn status(&self) -> EngineStatus {
        *self.state.lock().unwrap()
    }

    async fn init(&mut self) -> Result<()> {
        self.record(MockCall::Init, "init")
    }

    async fn is_built(&self) -> Result<bool> {
        self.record(MockCall::IsBuilt, "is_built")?;
        Ok(self.status().built)
    }

    async fn is_created(&self) -> Result<bool> {
        self.record(MockCall::IsCreated, "is_created")?;
        Ok(self.status().created)
    }

    async fn is_running(&self) -> Result<bool> {
        self.record(MockCall::IsRunning, "is_running")?;
        Ok(self.status().running)
    }

    async fn build(&mut self) -> Result<()> {
        self.record(MockCall::Build, "build")?;
        self.update(|s| s.built = true);
        Ok(())
    }

    async fn create(&mut self) -> Result<()> {
        self.record(MockCall::Create, "create")?;
        self.update(|s| s.created = true);
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        self.record(MockCall::Start, "start")?;
        self.update(|s| s.running = true);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.record(MockCall::Stop, "stop")?;
        self.update(|s| s.running = false);
        Ok(())
    }

    async fn remove(&mut self) -> Result<()> {
        self.record(MockCall::Remove, "remove")?;
        self.update(|s| {
            s.created = false;
            s.running = false;
        });
        Ok(())
    }

    async fn list(&self) -> Result<()> {
        self.record(MockCall::List, "list")
    }

    async fn run(&self, command: &[String], _mode: OutputMode) -> Result<String> {
        self.record(
            MockCall::Run {
                command: command.to_vec(),
            },
            "run",
        )?;
        Ok(self.run_output.lock().unwrap().clone())
    }

    async fn exec(&self, command: &[String], options: &ExecOptions) -> Result<String> {
        self.record(
            MockCall::Exec {
                command: command.to_vec(),
                options: options.clone(),
            },
            "exec",
        )?;
        Ok(String::new())
    }
}
