//! Container engine trait and implementations for devc
//!
//! An [`Engine`] turns lifecycle requests into invocations of an external
//! container CLI: [`DockerEngine`] manages a single container, while
//! [`ComposeEngine`] drives a compose project. Both run their commands
//! through a [`CommandRunner`].

mod compose;
mod docker;
mod error;
mod runner;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use compose::ComposeEngine;
pub use docker::{derive_image_name, DockerEngine, IMAGE_LABEL, LOCAL_FOLDER_LABEL};
pub use error::*;
pub use runner::{CliRunner, CommandRunner};
pub use types::*;

use async_trait::async_trait;
use devc_config::{
    container_env_names, resolve_container_env, DevContainerConfig, EngineConfig, Workspace,
};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

/// Lifecycle operations over one dev container environment
///
/// Probes and in-container commands take `&self` so a started engine can
/// be shared with background tasks.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Which variant this is
    fn kind(&self) -> EngineKind;

    /// State cached by the last call to [`Engine::init`]
    fn status(&self) -> EngineStatus;

    /// Probe the engine and cache built / created / running state
    async fn init(&mut self) -> Result<()>;

    /// Whether the image (or the project's images) exist
    async fn is_built(&self) -> Result<bool>;

    /// Whether a container exists, running or not
    async fn is_created(&self) -> Result<bool>;

    /// Whether a container is currently running
    async fn is_running(&self) -> Result<bool>;

    /// Build images from the configured Dockerfile or compose files
    async fn build(&mut self) -> Result<()>;

    /// Create the container(s) without starting them
    async fn create(&mut self) -> Result<()>;

    /// Start the container(s), building and creating first when needed.
    /// A running environment is left untouched.
    async fn start(&mut self) -> Result<()>;

    /// Stop the container(s)
    async fn stop(&mut self) -> Result<()>;

    /// Remove the container(s)
    async fn remove(&mut self) -> Result<()>;

    /// Show the environment's containers on stdout
    async fn list(&self) -> Result<()>;

    /// Run a one-shot command in a fresh throwaway container
    async fn run(&self, command: &[String], mode: OutputMode) -> Result<String>;

    /// Run a command inside the running container
    async fn exec(&self, command: &[String], options: &ExecOptions) -> Result<String>;

    /// Value of an environment variable as seen inside the image
    async fn resolve_env(&self, name: &str) -> Result<String> {
        let probe = vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("echo \"${}\"", name),
        ];
        let value = self.run(&probe, OutputMode::Capture).await?;
        Ok(value.trim().to_string())
    }
}

/// Everything an engine needs to act on one workspace
#[derive(Clone)]
pub struct EngineContext {
    /// Fully resolved configuration
    pub config: DevContainerConfig,
    pub workspace: Workspace,
    /// Directory holding `devcontainer.json`; every command runs here
    pub config_dir: PathBuf,
    /// Argv prefix of the external CLI, e.g. `["docker"]`
    pub command: Vec<String>,
    pub runner: Arc<dyn CommandRunner>,
}

impl EngineContext {
    pub(crate) fn argv<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command
            .iter()
            .cloned()
            .chain(args.into_iter().map(Into::into))
            .collect()
    }

    pub(crate) async fn run(&self, argv: &[String], mode: OutputMode) -> Result<String> {
        self.runner.run(argv, &self.config_dir, mode).await
    }
}

/// Build the engine matching the configuration's image source
pub fn create_engine(
    config: DevContainerConfig,
    workspace: Workspace,
    config_dir: PathBuf,
    engines: &EngineConfig,
    runner: Arc<dyn CommandRunner>,
) -> Result<Box<dyn Engine>> {
    let kind = EngineKind::select(&config).ok_or_else(|| {
        ProviderError::ConfigError(
            "no image, build.dockerfile or dockerComposeFile configured".to_string(),
        )
    })?;

    let command = match kind {
        EngineKind::Docker => engines.docker.clone(),
        EngineKind::Compose => engines.compose.clone(),
    };
    if command.is_empty() {
        return Err(ProviderError::EmptyCommand);
    }

    let ctx = EngineContext {
        config,
        workspace,
        config_dir,
        command,
        runner,
    };

    tracing::debug!("Selected {} engine", kind);

    Ok(match kind {
        EngineKind::Docker => Box::new(DockerEngine::new(ctx)),
        EngineKind::Compose => Box::new(ComposeEngine::new(ctx)?),
    })
}

/// Resolve `${containerEnv:NAME}` in every `remoteEnv` value.
///
/// Each distinct name is looked up once through [`Engine::resolve_env`].
pub async fn resolve_remote_env(
    engine: &dyn Engine,
    remote_env: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut values: HashMap<String, String> = HashMap::new();
    for value in remote_env.values() {
        for name in container_env_names(value) {
            if !values.contains_key(&name) {
                let resolved = engine.resolve_env(&name).await?;
                values.insert(name, resolved);
            }
        }
    }

    Ok(remote_env
        .iter()
        .map(|(k, v)| (k.clone(), resolve_container_env(v, &values)))
        .collect())
}

/// `KEY=VALUE` strings for `--env`
pub(crate) fn env_pairs(env: &BTreeMap<String, String>) -> Vec<String> {
    env.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
}
