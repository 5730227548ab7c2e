//! Container manager - sequences engine operations into user-facing verbs

mod exec;
mod lifecycle;

use crate::{run_host_hook, CoreError, Result};
use devc_config::{resolve, DevContainerConfig, GlobalConfig, Workspace};
use devc_provider::{create_engine, CommandRunner, Engine};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use exec::spawn_post_attach;

/// Drives one dev container environment through its lifecycle
pub struct ContainerManager {
    engine: Box<dyn Engine>,
    /// Fully resolved configuration
    config: DevContainerConfig,
    /// Wait before the background `postAttachCommand`
    post_attach_delay: Duration,
}

impl ContainerManager {
    /// Load, resolve and validate the configuration in `config_dir`, run
    /// `initializeCommand` on the host, then select and probe the engine.
    pub async fn open(
        config_dir: &Path,
        workspace: Workspace,
        global: &GlobalConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let config = DevContainerConfig::load(config_dir, &workspace)?;
        let config = resolve(config, &workspace);

        run_host_hook(runner.as_ref(), &config, &workspace.path).await?;

        let mut engine = create_engine(
            config.clone(),
            workspace,
            config_dir.to_path_buf(),
            &global.engine,
            runner,
        )
        .map_err(CoreError::step("initialize"))?;
        engine.init().await.map_err(CoreError::step("initialize"))?;

        Ok(Self::with_engine(
            engine,
            config,
            Duration::from_millis(global.defaults.post_attach_delay_ms),
        ))
    }

    /// Create a manager around an already initialized engine
    pub fn with_engine(
        engine: Box<dyn Engine>,
        config: DevContainerConfig,
        post_attach_delay: Duration,
    ) -> Self {
        Self {
            engine,
            config,
            post_attach_delay,
        }
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub fn config(&self) -> &DevContainerConfig {
        &self.config
    }
}
