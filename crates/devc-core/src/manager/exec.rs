//! Exec and shell operations for ContainerManager

use crate::{run_hook, CoreError, Hook, Result};
use devc_config::DevContainerConfig;
use devc_provider::{Engine, ExecOptions};
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::ContainerManager;

impl ContainerManager {
    /// Start the environment and attach an interactive shell.
    ///
    /// `postAttachCommand` runs concurrently on a background task; its
    /// failure is logged and does not end the session.
    pub async fn shell(mut self, shell: &str) -> Result<()> {
        self.start().await?;

        let engine: Arc<dyn Engine> = Arc::from(self.engine);
        let _post_attach = spawn_post_attach(engine.clone(), self.config, self.post_attach_delay);

        let tty = std::io::stdin().is_terminal();
        engine
            .exec(&[shell.to_string()], &ExecOptions::interactive(tty))
            .await
            .map_err(CoreError::step("execute a shell"))?;
        Ok(())
    }

    /// Start the environment and run one command inside it
    pub async fn exec(&mut self, command: &[String]) -> Result<()> {
        self.start().await?;

        let tty = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
        self.engine
            .exec(command, &ExecOptions::interactive(tty))
            .await
            .map_err(CoreError::step("execute command"))?;
        Ok(())
    }
}

/// Run `postAttachCommand` after `delay` on a detached task.
///
/// Returns `None` when no hook is configured.
pub fn spawn_post_attach(
    engine: Arc<dyn Engine>,
    config: DevContainerConfig,
    delay: Duration,
) -> Option<JoinHandle<()>> {
    Hook::PostAttach.command(&config)?;

    Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = run_hook(engine.as_ref(), &config, Hook::PostAttach).await {
            tracing::error!("{}", e);
        }
    }))
}
