//! Lifecycle verbs: build, start, stop, list

use crate::{run_hook, CoreError, Hook, Result};

use super::ContainerManager;

impl ContainerManager {
    /// Build the image unless it already exists. Does not create or start.
    pub async fn build(&mut self) -> Result<()> {
        if self
            .engine
            .is_built()
            .await
            .map_err(CoreError::step("build"))?
        {
            tracing::info!("Image already built");
            return Ok(());
        }
        self.engine.build().await.map_err(CoreError::step("build"))
    }

    /// Bring the environment up.
    ///
    /// Creates the container when missing and starts it when stopped.
    /// `onCreateCommand` and `postCreateCommand` run only after a fresh
    /// creation; `postStartCommand` runs on every call.
    pub async fn start(&mut self) -> Result<()> {
        let created = self
            .engine
            .is_created()
            .await
            .map_err(CoreError::step("start"))?;

        if !created {
            if !self
                .engine
                .is_built()
                .await
                .map_err(CoreError::step("build"))?
            {
                self.engine.build().await.map_err(CoreError::step("build"))?;
            }
            self.engine
                .create()
                .await
                .map_err(CoreError::step("create"))?;
        }

        if !self
            .engine
            .is_running()
            .await
            .map_err(CoreError::step("start"))?
        {
            self.engine.start().await.map_err(CoreError::step("start"))?;
        } else {
            tracing::info!("Container already running");
        }

        if !created {
            run_hook(self.engine.as_ref(), &self.config, Hook::OnCreate).await?;
            run_hook(self.engine.as_ref(), &self.config, Hook::PostCreate).await?;
        }
        run_hook(self.engine.as_ref(), &self.config, Hook::PostStart).await
    }

    /// Stop a running container and optionally remove it.
    ///
    /// Nothing happens when the container was never created.
    pub async fn stop(&mut self, remove: bool) -> Result<()> {
        if !self
            .engine
            .is_created()
            .await
            .map_err(CoreError::step("stop"))?
        {
            tracing::info!("No container to stop");
            return Ok(());
        }

        if self
            .engine
            .is_running()
            .await
            .map_err(CoreError::step("stop"))?
        {
            self.engine.stop().await.map_err(CoreError::step("stop"))?;
        }

        if remove {
            self.engine
                .remove()
                .await
                .map_err(CoreError::step("remove"))?;
        }

        Ok(())
    }

    pub async fn list(&self) -> Result<()> {
        self.engine.list().await.map_err(CoreError::step("list"))
    }
}
