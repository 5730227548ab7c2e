//! Lifecycle hooks declared in `devcontainer.json`

use crate::{CoreError, Result};
use devc_config::{DevContainerConfig, LifecycleCommand};
use devc_provider::{CommandRunner, Engine, ExecOptions, OutputMode};
use std::path::Path;

/// User-defined commands run at fixed points of the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// On the host, before the engine is selected
    Initialize,
    /// In the container, once after creation
    OnCreate,
    /// In the container, once after creation, after `onCreateCommand`
    PostCreate,
    /// In the container, every time the environment is started
    PostStart,
    /// In the container, in the background when a shell attaches
    PostAttach,
}

impl Hook {
    /// Setting name in `devcontainer.json`
    pub fn key(self) -> &'static str {
        match self {
            Hook::Initialize => "initializeCommand",
            Hook::OnCreate => "onCreateCommand",
            Hook::PostCreate => "postCreateCommand",
            Hook::PostStart => "postStartCommand",
            Hook::PostAttach => "postAttachCommand",
        }
    }

    pub fn command(self, config: &DevContainerConfig) -> Option<&LifecycleCommand> {
        match self {
            Hook::Initialize => config.initialize_command.as_ref(),
            Hook::OnCreate => config.on_create_command.as_ref(),
            Hook::PostCreate => config.post_create_command.as_ref(),
            Hook::PostStart => config.post_start_command.as_ref(),
            Hook::PostAttach => config.post_attach_command.as_ref(),
        }
        .filter(|c| !c.is_empty())
    }
}

/// Run a hook inside the container. Absent or empty hooks are skipped.
pub async fn run_hook(engine: &dyn Engine, config: &DevContainerConfig, hook: Hook) -> Result<()> {
    let Some(command) = hook.command(config) else {
        return Ok(());
    };

    for argv in command.argvs() {
        tracing::info!("Running {}: {}", hook.key(), argv.join(" "));
        engine
            .exec(&argv, &ExecOptions::hook())
            .await
            .map_err(|source| CoreError::Hook {
                hook: hook.key(),
                source,
            })?;
    }

    Ok(())
}

/// Run `initializeCommand` on the host from `cwd`
pub async fn run_host_hook(
    runner: &dyn CommandRunner,
    config: &DevContainerConfig,
    cwd: &Path,
) -> Result<()> {
    let hook = Hook::Initialize;
    let Some(command) = hook.command(config) else {
        return Ok(());
    };

    for argv in command.argvs() {
        tracing::info!("Running {}: {}", hook.key(), argv.join(" "));
        runner
            .run(&argv, cwd, OutputMode::Stream)
            .await
            .map_err(|source| CoreError::Hook {
                hook: hook.key(),
                source,
            })?;
    }

    Ok(())
}
