//! Lifecycle commands: build, start, stop, list, shell, exec

use anyhow::Result;

use super::{open, Context};

pub async fn build(ctx: &Context) -> Result<()> {
    open(ctx).await?.build().await?;
    Ok(())
}

pub async fn start(ctx: &Context) -> Result<()> {
    open(ctx).await?.start().await?;
    Ok(())
}

pub async fn stop(ctx: &Context, remove: bool) -> Result<()> {
    open(ctx).await?.stop(remove).await?;
    Ok(())
}

pub async fn list(ctx: &Context) -> Result<()> {
    open(ctx).await?.list().await?;
    Ok(())
}

/// Attach a shell, falling back to the configured default shell
pub async fn shell(ctx: &Context, shell: Option<String>) -> Result<()> {
    let shell = shell.unwrap_or_else(|| ctx.global.defaults.shell.clone());
    open(ctx).await?.shell(&shell).await?;
    Ok(())
}

pub async fn exec(ctx: &Context, cmd: Vec<String>) -> Result<()> {
    open(ctx).await?.exec(&cmd).await?;
    Ok(())
}
