//! Single-container engine driven through the `docker` CLI
//!
//! Works with any Docker compatible CLI (`podman`, `nerdctl`) configured as
//! the engine command.

use crate::{
    env_pairs, resolve_remote_env, Engine, EngineContext, EngineKind, EngineStatus, ExecOptions,
    OutputMode, Result,
};
use async_trait::async_trait;
use devc_config::{basename, ImageSource};

/// Label binding a container to its host workspace path
pub const LOCAL_FOLDER_LABEL: &str = "devcontainer.local_folder";

/// Label recording the image a container was created from
pub const IMAGE_LABEL: &str = "devcontainer.image";

/// Keeps the container alive when `overrideCommand` replaces its entrypoint command
const KEEP_ALIVE: &str = "while sleep 1000; do :; done";

/// Image name for a workspace without an explicit `image`.
///
/// `vsc-<basename>-<md5 of path>`, both taken from the lowercased path.
pub fn derive_image_name(workspace_path: &str) -> String {
    let path = workspace_path.to_lowercase();
    format!(
        "vsc-{}-{:x}",
        basename(&path),
        md5::compute(path.as_bytes())
    )
}

/// Engine managing one container for the workspace
pub struct DockerEngine {
    ctx: EngineContext,
    image: String,
    /// Most recently matching container, if known
    container: Option<String>,
    status: EngineStatus,
}

impl DockerEngine {
    pub fn new(ctx: EngineContext) -> Self {
        let image = match ctx.config.image_source() {
            Some(ImageSource::Image(image)) => image,
            _ => derive_image_name(&ctx.workspace.path_str()),
        };

        Self {
            ctx,
            image,
            container: None,
            status: EngineStatus::default(),
        }
    }

    /// Image the container runs
    pub fn image(&self) -> &str {
        &self.image
    }

    fn label_filters(&self) -> Vec<String> {
        vec![
            "--filter".to_string(),
            format!(
                "label={}={}",
                LOCAL_FOLDER_LABEL,
                self.ctx.workspace.path_str()
            ),
            "--filter".to_string(),
            format!("label={}={}", IMAGE_LABEL, self.image),
        ]
    }

    /// Id of the most recently created matching container
    async fn find_container(&self, running: bool) -> Result<Option<String>> {
        let mut args = vec![
            "container".to_string(),
            "ls".to_string(),
            "--quiet".to_string(),
            "--latest".to_string(),
        ];
        args.extend(self.label_filters());
        if running {
            args.push("--filter".to_string());
            args.push("status=running".to_string());
        }

        let output = self
            .ctx
            .run(&self.ctx.argv(args), OutputMode::Capture)
            .await?;
        Ok(output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string))
    }

    async fn container_id(&self) -> Result<Option<String>> {
        match &self.container {
            Some(id) => Ok(Some(id.clone())),
            None => self.find_container(false).await,
        }
    }

    fn build_args(&self, dockerfile: &str) -> Vec<String> {
        let build = &self.ctx.config.build;
        let mut args = vec![
            "image".to_string(),
            "build".to_string(),
            "--tag".to_string(),
            self.image.clone(),
            "--file".to_string(),
            dockerfile.to_string(),
        ];

        if let Some(target) = build.target.as_deref().filter(|t| !t.is_empty()) {
            args.push("--target".to_string());
            args.push(target.to_string());
        }

        for source in &build.cache_from {
            args.push("--cache-from".to_string());
            args.push(source.clone());
        }

        for pair in env_pairs(&build.args) {
            args.push("--build-arg".to_string());
            args.push(pair);
        }

        args.push(build.context.clone());
        args
    }

    fn create_args(&self) -> Vec<String> {
        let config = &self.ctx.config;
        let mut args = vec!["container".to_string(), "create".to_string()];

        // Labels
        args.push("--label".to_string());
        args.push(format!(
            "{}={}",
            LOCAL_FOLDER_LABEL,
            self.ctx.workspace.path_str()
        ));
        args.push("--label".to_string());
        args.push(format!("{}={}", IMAGE_LABEL, self.image));

        if config.init {
            args.push("--init".to_string());
        }
        if config.privileged {
            args.push("--privileged".to_string());
        }

        for cap in &config.cap_add {
            args.push("--cap-add".to_string());
            args.push(cap.clone());
        }
        for opt in &config.security_opt {
            args.push("--security-opt".to_string());
            args.push(opt.clone());
        }

        // Mounts, workspace last
        for mount in &config.mounts {
            args.push("--mount".to_string());
            args.push(mount.clone());
        }
        if !config.workspace_mount.is_empty() {
            args.push("--mount".to_string());
            args.push(config.workspace_mount.clone());
        }

        for port in &config.forward_ports {
            args.push("--publish".to_string());
            args.push(port.clone());
        }

        for pair in env_pairs(&config.container_env) {
            args.push("--env".to_string());
            args.push(pair);
        }

        if let Some(user) = config.container_user.as_deref().filter(|u| !u.is_empty()) {
            args.push("--user".to_string());
            args.push(user.to_string());
        }

        // `container start` rejects create-time flags, so runArgs apply here
        args.extend(config.run_args.iter().cloned());

        args.push(self.image.clone());
        if config.override_command {
            args.push("/bin/sh".to_string());
            args.push("-c".to_string());
            args.push(KEEP_ALIVE.to_string());
        }
        args
    }

    fn exec_args(
        &self,
        container: &str,
        command: &[String],
        options: &ExecOptions,
        env: &[String],
    ) -> Vec<String> {
        let config = &self.ctx.config;
        let mut args = vec!["container".to_string(), "exec".to_string()];
        if options.interactive {
            args.push("--interactive".to_string());
        }
        if options.tty {
            args.push("--tty".to_string());
        }
        args.push("--workdir".to_string());
        args.push(config.workspace_folder.clone());

        if let Some(user) = config.effective_user() {
            args.push("--user".to_string());
            args.push(user.to_string());
        }

        for pair in env {
            args.push("--env".to_string());
            args.push(pair.clone());
        }

        args.push(container.to_string());
        args.extend(command.iter().cloned());
        args
    }
}

#[async_trait]
impl Engine for DockerEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Docker
    }

    fn status(&self) -> EngineStatus {
        self.status
    }

    async fn init(&mut self) -> Result<()> {
        tracing::debug!("Image name: {}", self.image);
        self.container = self.find_container(false).await?;
        let running = match self.container {
            Some(_) => self.find_container(true).await?.is_some(),
            None => false,
        };
        self.status = EngineStatus {
            built: self.is_built().await?,
            created: self.container.is_some(),
            running,
        };
        tracing::debug!("Container status: {:?}", self.status);
        Ok(())
    }

    async fn is_built(&self) -> Result<bool> {
        let argv = self
            .ctx
            .argv(["image", "ls", "--quiet", self.image.as_str()]);
        let output = self.ctx.run(&argv, OutputMode::Capture).await?;
        Ok(!output.is_empty())
    }

    async fn is_created(&self) -> Result<bool> {
        Ok(self.find_container(false).await?.is_some())
    }

    async fn is_running(&self) -> Result<bool> {
        Ok(self.find_container(true).await?.is_some())
    }

    async fn build(&mut self) -> Result<()> {
        let Some(dockerfile) = self.ctx.config.dockerfile().map(str::to_string) else {
            tracing::debug!("No Dockerfile configured, using image {}", self.image);
            return Ok(());
        };

        let argv = self.ctx.argv(self.build_args(&dockerfile));
        self.ctx.run(&argv, OutputMode::Stream).await?;
        self.status.built = true;
        Ok(())
    }

    async fn create(&mut self) -> Result<()> {
        let argv = self.ctx.argv(self.create_args());
        let id = self.ctx.run(&argv, OutputMode::Capture).await?;
        tracing::debug!("Created container {}", id);
        self.container = Some(id).filter(|id| !id.is_empty());
        self.status.created = true;
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        if self.is_running().await? {
            tracing::debug!("Container already running");
            self.status.running = true;
            return Ok(());
        }

        let container = match self.container_id().await? {
            Some(id) => id,
            None => {
                if !self.is_built().await? {
                    self.build().await?;
                }
                self.create().await?;
                match self.container_id().await? {
                    Some(id) => id,
                    None => {
                        return Err(crate::ProviderError::ConfigError(format!(
                            "no container found for image {}",
                            self.image
                        )))
                    }
                }
            }
        };

        let argv = self.ctx.argv(["container", "start", container.as_str()]);
        self.ctx.run(&argv, OutputMode::Capture).await?;
        self.container = Some(container);
        self.status.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(container) = self.container_id().await? else {
            return Ok(());
        };
        let argv = self.ctx.argv(["container", "stop", container.as_str()]);
        self.ctx.run(&argv, OutputMode::Capture).await?;
        self.status.running = false;
        Ok(())
    }

    async fn remove(&mut self) -> Result<()> {
        let Some(container) = self.container_id().await? else {
            return Ok(());
        };
        let argv = self.ctx.argv(["container", "rm", container.as_str()]);
        self.ctx.run(&argv, OutputMode::Capture).await?;
        self.container = None;
        self.status.created = false;
        self.status.running = false;
        Ok(())
    }

    async fn list(&self) -> Result<()> {
        let mut args = vec![
            "container".to_string(),
            "ls".to_string(),
            "--all".to_string(),
        ];
        args.push("--filter".to_string());
        args.push(format!(
            "label={}={}",
            LOCAL_FOLDER_LABEL,
            self.ctx.workspace.path_str()
        ));
        self.ctx
            .run(&self.ctx.argv(args), OutputMode::Stream)
            .await?;
        Ok(())
    }

    async fn run(&self, command: &[String], mode: OutputMode) -> Result<String> {
        let config = &self.ctx.config;
        let mut args = vec![
            "container".to_string(),
            "run".to_string(),
            "--rm".to_string(),
        ];
        for pair in env_pairs(&config.container_env) {
            args.push("--env".to_string());
            args.push(pair);
        }
        if let Some(user) = config.effective_user() {
            args.push("--user".to_string());
            args.push(user.to_string());
        }
        args.push(self.image.clone());
        args.extend(command.iter().cloned());

        self.ctx.run(&self.ctx.argv(args), mode).await
    }

    async fn exec(&self, command: &[String], options: &ExecOptions) -> Result<String> {
        let Some(container) = self.container_id().await? else {
            return Err(crate::ProviderError::ConfigError(format!(
                "no container found for {}",
                self.ctx.workspace.path_str()
            )));
        };

        let env = if options.with_env {
            env_pairs(&resolve_remote_env(self, &self.ctx.config.remote_env).await?)
        } else {
            Vec::new()
        };

        let argv = self
            .ctx
            .argv(self.exec_args(&container, command, options, &env));
        self.ctx.run(&argv, OutputMode::Stream).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockRunner;
    use devc_config::{BuildConfig, DevContainerConfig, Workspace};
    use std::path::PathBuf;
    use std::sync::Arc;

    const WS: &str = "/home/dev/MyProj";

    fn engine(config: DevContainerConfig, runner: &MockRunner) -> DockerEngine {
        let workspace = Workspace::new(WS);
        DockerEngine::new(EngineContext {
            config: config.with_defaults(&workspace),
            workspace,
            config_dir: PathBuf::from("/home/dev/MyProj/.devcontainer"),
            command: vec!["docker".to_string()],
            runner: Arc::new(runner.clone()),
        })
    }

    fn image_config() -> DevContainerConfig {
        DevContainerConfig {
            image: Some("alpine:latest".to_string()),
            ..Default::default()
        }
    }

    fn dockerfile_config() -> DevContainerConfig {
        DevContainerConfig {
            build: BuildConfig {
                dockerfile: Some("Dockerfile".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_derive_image_name() {
        assert_eq!(
            derive_image_name("test_path"),
            "vsc-test_path-5da6ae5928d4a1ce395878ae9c7ea1f6"
        );
    }

    #[test]
    fn test_derive_image_name_is_case_insensitive() {
        assert_eq!(
            derive_image_name("/Home/Dev/TEST_PATH"),
            derive_image_name("/home/dev/test_path")
        );
        assert!(derive_image_name("/Home/Dev/TEST_PATH").starts_with("vsc-test_path-"));
    }

    #[test]
    fn test_md5_digest_format() {
        assert_eq!(
            format!("{:x}", md5::compute("testing")),
            "ae2b1fca515949e5d54fb22b8ed95575"
        );
    }

    #[test]
    fn test_explicit_image_is_used() {
        let runner = MockRunner::new();
        assert_eq!(engine(image_config(), &runner).image(), "alpine:latest");
        assert!(engine(dockerfile_config(), &runner)
            .image()
            .starts_with("vsc-myproj-"));
    }

    #[tokio::test]
    async fn test_probes_filter_by_labels() {
        let runner = MockRunner::new();
        let engine = engine(image_config(), &runner);

        assert!(!engine.is_running().await.unwrap());

        let calls = runner.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].argv,
            argv(&[
                "docker",
                "container",
                "ls",
                "--quiet",
                "--latest",
                "--filter",
                "label=devcontainer.local_folder=/home/dev/MyProj",
                "--filter",
                "label=devcontainer.image=alpine:latest",
                "--filter",
                "status=running",
            ])
        );
        assert_eq!(calls[0].cwd, PathBuf::from("/home/dev/MyProj/.devcontainer"));
        assert_eq!(calls[0].mode, OutputMode::Capture);
    }

    #[tokio::test]
    async fn test_init_caches_status() {
        let runner = MockRunner::new();
        runner
            .respond("status=running", "")
            .respond("container ls", "abc123\nolder456")
            .respond("image ls", "sha256:1");
        let mut engine = engine(image_config(), &runner);

        engine.init().await.unwrap();

        assert_eq!(
            engine.status(),
            EngineStatus {
                built: true,
                created: true,
                running: false,
            }
        );
        assert_eq!(engine.container.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_build_is_noop_without_dockerfile() {
        let runner = MockRunner::new();
        let mut engine = engine(image_config(), &runner);
        engine.build().await.unwrap();
        assert!(runner.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_build_args() {
        let runner = MockRunner::new();
        let mut config = dockerfile_config();
        config.build.target = Some("dev".to_string());
        config.build.cache_from = vec!["a:1".to_string(), "b:2".to_string()];
        config.build.args.insert("VARIANT".to_string(), "3.12".to_string());
        let mut engine = engine(config, &runner);
        let image = engine.image().to_string();

        engine.build().await.unwrap();

        let calls = runner.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].argv,
            argv(&[
                "docker",
                "image",
                "build",
                "--tag",
                &image,
                "--file",
                "Dockerfile",
                "--target",
                "dev",
                "--cache-from",
                "a:1",
                "--cache-from",
                "b:2",
                "--build-arg",
                "VARIANT=3.12",
                ".",
            ])
        );
        assert_eq!(calls[0].mode, OutputMode::Stream);
    }

    #[tokio::test]
    async fn test_create_args() {
        let runner = MockRunner::new();
        runner.respond("container create", "newid");
        let mut config = image_config();
        config.init = true;
        config.cap_add = vec!["SYS_PTRACE".to_string()];
        config.security_opt = vec!["seccomp=unconfined".to_string()];
        config.mounts = vec!["type=volume,source=cache,target=/cache".to_string()];
        config.forward_ports = vec!["8080".to_string()];
        config
            .container_env
            .insert("MODE".to_string(), "dev".to_string());
        config.container_user = Some("vscode".to_string());
        config.run_args = vec!["--network=host".to_string()];
        let mut engine = engine(config, &runner);

        engine.create().await.unwrap();

        assert_eq!(
            runner.get_calls()[0].argv,
            argv(&[
                "docker",
                "container",
                "create",
                "--label",
                "devcontainer.local_folder=/home/dev/MyProj",
                "--label",
                "devcontainer.image=alpine:latest",
                "--init",
                "--cap-add",
                "SYS_PTRACE",
                "--security-opt",
                "seccomp=unconfined",
                "--mount",
                "type=volume,source=cache,target=/cache",
                "--mount",
                "type=bind,source=/home/dev/MyProj,target=/workspace,consistency=cached",
                "--publish",
                "8080",
                "--env",
                "MODE=dev",
                "--user",
                "vscode",
                "--network=host",
                "alpine:latest",
                "/bin/sh",
                "-c",
                "while sleep 1000; do :; done",
            ])
        );
        assert_eq!(engine.container.as_deref(), Some("newid"));
        assert!(engine.status().created);
    }

    #[tokio::test]
    async fn test_create_without_override_command() {
        let runner = MockRunner::new();
        let mut config = image_config();
        config.override_command = false;
        let mut engine = engine(config, &runner);

        engine.create().await.unwrap();

        let argv = &runner.get_calls()[0].argv;
        assert_eq!(argv.last().map(String::as_str), Some("alpine:latest"));
    }

    #[tokio::test]
    async fn test_start_when_running_is_noop() {
        let runner = MockRunner::new();
        runner.respond("container ls", "abc123");
        let mut engine = engine(image_config(), &runner);

        engine.start().await.unwrap();

        assert!(!runner.commands().iter().any(|c| c.contains("container start")));
        assert!(engine.status().running);
    }

    #[tokio::test]
    async fn test_start_creates_when_missing() {
        let runner = MockRunner::new();
        runner.respond("container create", "fresh1");
        let mut engine = engine(dockerfile_config(), &runner);

        engine.start().await.unwrap();

        let commands = runner.commands();
        let position = |needle: &str| commands.iter().position(|c| c.contains(needle));
        let build = position("image build").unwrap();
        let create = position("container create").unwrap();
        let start = position("container start fresh1").unwrap();
        assert!(build < create && create < start);
    }

    #[tokio::test]
    async fn test_stop_and_remove_target_latest_container() {
        let runner = MockRunner::new();
        runner.respond("container ls", "abc123");
        let mut engine = engine(image_config(), &runner);

        engine.stop().await.unwrap();
        engine.remove().await.unwrap();

        let commands = runner.commands();
        assert!(commands.contains(&"docker container stop abc123".to_string()));
        assert!(commands.contains(&"docker container rm abc123".to_string()));
        assert!(!engine.status().created);
    }

    #[tokio::test]
    async fn test_exec_resolves_remote_env() {
        let runner = MockRunner::new();
        runner
            .respond("container run", "/usr/bin:/bin")
            .respond("container ls", "abc123");
        let mut config = image_config();
        config.remote_user = Some("dev".to_string());
        config.remote_env.insert(
            "PATH".to_string(),
            "${containerEnv:PATH}:/opt/bin".to_string(),
        );
        let engine = engine(config, &runner);

        engine
            .exec(&argv(&["bash"]), &ExecOptions::interactive(true))
            .await
            .unwrap();

        let calls = runner.get_calls();
        let probe = calls
            .iter()
            .find(|c| c.argv.contains(&"run".to_string()))
            .unwrap();
        assert_eq!(
            probe.argv,
            argv(&[
                "docker",
                "container",
                "run",
                "--rm",
                "--user",
                "dev",
                "alpine:latest",
                "sh",
                "-c",
                "echo \"$PATH\"",
            ])
        );

        let exec = calls.last().unwrap();
        assert_eq!(
            exec.argv,
            argv(&[
                "docker",
                "container",
                "exec",
                "--interactive",
                "--tty",
                "--workdir",
                "/workspace",
                "--user",
                "dev",
                "--env",
                "PATH=/usr/bin:/bin:/opt/bin",
                "abc123",
                "bash",
            ])
        );
        assert_eq!(exec.mode, OutputMode::Stream);
    }

    #[tokio::test]
    async fn test_hook_exec_detaches_stdin() {
        let runner = MockRunner::new();
        runner.respond("container ls", "abc123");
        let engine = engine(image_config(), &runner);

        engine
            .exec(&argv(&["npm", "ci"]), &ExecOptions::hook())
            .await
            .unwrap();

        let exec = runner.get_calls().last().unwrap().argv.clone();
        assert_eq!(
            exec,
            argv(&[
                "docker",
                "container",
                "exec",
                "--workdir",
                "/workspace",
                "abc123",
                "npm",
                "ci",
            ])
        );
    }

    #[tokio::test]
    async fn test_exec_without_container_fails() {
        let runner = MockRunner::new();
        let engine = engine(image_config(), &runner);
        assert!(engine
            .exec(&argv(&["true"]), &ExecOptions::default())
            .await
            .is_err());
    }
}
