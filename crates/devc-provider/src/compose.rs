//! Multi-service engine driven through a compose CLI
//!
//! Every invocation names the project and each compose file explicitly, so
//! the external tool never falls back to its own file discovery.

use crate::{
    env_pairs, resolve_remote_env, Engine, EngineContext, EngineKind, EngineStatus, ExecOptions,
    OutputMode, ProviderError, Result,
};
use async_trait::async_trait;

/// Engine managing a compose project with one attach target service
pub struct ComposeEngine {
    ctx: EngineContext,
    files: Vec<String>,
    project: String,
    service: String,
    /// Services passed to build / create / up / stop; empty means all
    run_services: Vec<String>,
    status: EngineStatus,
}

impl ComposeEngine {
    pub fn new(ctx: EngineContext) -> Result<Self> {
        let service = ctx
            .config
            .service()
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::ConfigError(
                    "'service' is required when using 'dockerComposeFile'".to_string(),
                )
            })?;

        let files = ctx
            .config
            .docker_compose_file
            .iter()
            .map(|f| ctx.config_dir.join(f).to_string_lossy().to_string())
            .collect();

        // Compose only accepts lowercase project names
        let project = format!("{}_devcontainer", ctx.config.name.to_lowercase());

        let mut run_services = ctx.config.run_services.clone();
        if !run_services.is_empty() && !run_services.contains(&service) {
            run_services.push(service.clone());
        }

        Ok(Self {
            ctx,
            files,
            project,
            service,
            run_services,
            status: EngineStatus::default(),
        })
    }

    /// Full argv for a compose verb
    fn compose<I, S>(&self, verb: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = vec!["--project-name".to_string(), self.project.clone()];
        for file in &self.files {
            args.push("--file".to_string());
            args.push(file.clone());
        }
        args.extend(verb.into_iter().map(Into::into));
        self.ctx.argv(args)
    }

    /// Compose verb followed by the configured run services
    fn compose_services(&self, verb: &[&str]) -> Vec<String> {
        let mut argv = self.compose(verb.iter().copied());
        argv.extend(self.run_services.iter().cloned());
        argv
    }

    async fn probe(&self, verb: &[&str]) -> Result<bool> {
        let output = self
            .ctx
            .run(&self.compose(verb.iter().copied()), OutputMode::Capture)
            .await?;
        Ok(!output.is_empty())
    }
}

#[async_trait]
impl Engine for ComposeEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Compose
    }

    fn status(&self) -> EngineStatus {
        self.status
    }

    async fn init(&mut self) -> Result<()> {
        tracing::debug!("Compose project: {}", self.project);
        self.status = EngineStatus {
            built: self.is_built().await?,
            created: self.is_created().await?,
            running: self.is_running().await?,
        };
        tracing::debug!("Project status: {:?}", self.status);
        Ok(())
    }

    async fn is_built(&self) -> Result<bool> {
        self.probe(&["images", "--quiet"]).await
    }

    async fn is_created(&self) -> Result<bool> {
        self.probe(&["ps", "--all", "--quiet"]).await
    }

    async fn is_running(&self) -> Result<bool> {
        self.probe(&["ps", "--status", "running", "--quiet"]).await
    }

    async fn build(&mut self) -> Result<()> {
        let argv = self.compose_services(&["build"]);
        self.ctx.run(&argv, OutputMode::Stream).await?;
        self.status.built = true;
        Ok(())
    }

    async fn create(&mut self) -> Result<()> {
        let argv = self.compose_services(&["create"]);
        self.ctx.run(&argv, OutputMode::Stream).await?;
        self.status.created = true;
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        if self.is_running().await? {
            tracing::debug!("Project {} already running", self.project);
            self.status.running = true;
            return Ok(());
        }

        // `up` builds and creates whatever is missing
        let argv = self.compose_services(&["up", "--detach"]);
        self.ctx.run(&argv, OutputMode::Stream).await?;
        self.status = EngineStatus {
            built: true,
            created: true,
            running: true,
        };
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let argv = self.compose_services(&["stop"]);
        self.ctx.run(&argv, OutputMode::Stream).await?;
        self.status.running = false;
        Ok(())
    }

    async fn remove(&mut self) -> Result<()> {
        let argv = self.compose(["down", "--volumes"]);
        self.ctx.run(&argv, OutputMode::Stream).await?;
        self.status.created = false;
        self.status.running = false;
        Ok(())
    }

    async fn list(&self) -> Result<()> {
        let filter = format!("name={}", self.project);
        let argv = self.compose(["ls", "--all", "--filter", filter.as_str()]);
        self.ctx.run(&argv, OutputMode::Stream).await?;
        Ok(())
    }

    async fn run(&self, command: &[String], mode: OutputMode) -> Result<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string(), "--no-deps".to_string()];
        if mode == OutputMode::Capture {
            args.push("-T".to_string());
        }
        if let Some(user) = self.ctx.config.effective_user() {
            args.push("--user".to_string());
            args.push(user.to_string());
        }
        args.push(self.service.clone());
        args.extend(command.iter().cloned());

        self.ctx.run(&self.compose(args), mode).await
    }

    async fn exec(&self, command: &[String], options: &ExecOptions) -> Result<String> {
        let config = &self.ctx.config;
        let mut args = vec!["exec".to_string()];
        if !options.tty {
            args.push("-T".to_string());
        }
        args.push("--workdir".to_string());
        args.push(config.workspace_folder.clone());

        if let Some(user) = config.effective_user() {
            args.push("--user".to_string());
            args.push(user.to_string());
        }

        if options.with_env {
            let env = resolve_remote_env(self, &config.remote_env).await?;
            for pair in env_pairs(&env) {
                args.push("--env".to_string());
                args.push(pair);
            }
        }

        args.push(self.service.clone());
        args.extend(command.iter().cloned());

        self.ctx.run(&self.compose(args), OutputMode::Stream).await
    }
}
