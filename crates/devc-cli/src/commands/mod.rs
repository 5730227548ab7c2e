//! CLI command implementations

mod lifecycle;
mod manage;

use anyhow::Result;
use devc_config::{GlobalConfig, Workspace};
use devc_core::ContainerManager;
use devc_provider::CliRunner;
use std::path::PathBuf;
use std::sync::Arc;

pub use lifecycle::*;
pub use manage::*;

/// Settings shared by every command
pub struct Context {
    pub workspace: Workspace,
    /// Absolute configuration directory
    pub config_dir: PathBuf,
    pub global: GlobalConfig,
}

/// Prepare the manager for the current workspace
async fn open(ctx: &Context) -> Result<ContainerManager> {
    let manager = ContainerManager::open(
        &ctx.config_dir,
        ctx.workspace.clone(),
        &ctx.global,
        Arc::new(CliRunner::new()),
    )
    .await?;
    tracing::debug!(
        "Engine {} status: {:?}",
        manager.engine().kind(),
        manager.engine().status()
    );
    Ok(manager)
}
