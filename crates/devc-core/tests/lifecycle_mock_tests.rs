//! End-to-end lifecycle tests through the real engines with a scripted
//! command runner, asserting on the external CLI invocations.

use devc_config::{GlobalConfig, Workspace};
use devc_core::{ContainerManager, CoreError};
use devc_provider::test_support::MockRunner;
use std::path::PathBuf;
use std::sync::Arc;

struct Fixture {
    _tmp: tempfile::TempDir,
    workspace: PathBuf,
    config_dir: PathBuf,
}

fn fixture(json: &str) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let workspace = tmp.path().join("webapp");
    let config_dir = workspace.join(".devcontainer");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("devcontainer.json"), json).unwrap();
    Fixture {
        _tmp: tmp,
        workspace,
        config_dir,
    }
}

async fn open(fixture: &Fixture, runner: &MockRunner) -> ContainerManager {
    ContainerManager::open(
        &fixture.config_dir,
        Workspace::new(&fixture.workspace),
        &GlobalConfig::default(),
        Arc::new(runner.clone()),
    )
    .await
    .unwrap()
}

fn position(commands: &[String], needle: &str) -> usize {
    commands
        .iter()
        .position(|c| c.contains(needle))
        .unwrap_or_else(|| panic!("no command containing {:?} in {:#?}", needle, commands))
}

#[tokio::test]
async fn test_dockerfile_start_from_scratch() {
    let fixture = fixture(
        r#"{
            "build": {"dockerfile": "Dockerfile", "args": {"USER": "${localEnv:DEVC_TEST_UNSET_USER:dev}"}},
            "remoteUser": "dev",
            "onCreateCommand": "echo created",
            "postStartCommand": ["echo", "started"]
        }"#,
    );
    let runner = MockRunner::new();
    let mut manager = open(&fixture, &runner).await;
    runner.respond("container create", "c0ffee");

    manager.start().await.unwrap();

    let commands = runner.commands();
    let build = position(&commands, "image build");
    let create = position(&commands, "container create");
    let start = position(&commands, "container start c0ffee");
    let on_create = position(&commands, "echo created");
    let post_start = position(&commands, "echo started");
    assert!(build < create && create < start && start < on_create && on_create < post_start);

    assert!(commands[build].contains("--build-arg USER=dev"));
    assert!(commands[on_create].contains("container exec --workdir /workspace --user dev c0ffee"));
    assert!(runner
        .get_calls()
        .iter()
        .all(|c| c.cwd == fixture.config_dir));
}

#[tokio::test]
async fn test_running_container_is_left_alone() {
    let fixture = fixture(r#"{"image": "alpine:latest", "postStartCommand": "date"}"#);
    let runner = MockRunner::new();
    runner.respond("container ls", "abc123");
    let mut manager = open(&fixture, &runner).await;

    manager.start().await.unwrap();

    let commands = runner.commands();
    assert!(!commands.iter().any(|c| c.contains("container create")));
    assert!(!commands.iter().any(|c| c.contains("container start")));
    assert!(commands
        .last()
        .unwrap()
        .ends_with("abc123 sh -c date"));
}

#[tokio::test]
async fn test_stop_remove_created_and_running() {
    let fixture = fixture(r#"{"image": "alpine:latest"}"#);
    let runner = MockRunner::new();
    runner.respond("container ls", "abc123");
    let mut manager = open(&fixture, &runner).await;

    manager.stop(true).await.unwrap();

    let commands = runner.commands();
    let stop = position(&commands, "container stop abc123");
    let remove = position(&commands, "container rm abc123");
    assert!(stop < remove);
}

#[tokio::test]
async fn test_stop_remove_never_created() {
    let fixture = fixture(r#"{"image": "alpine:latest"}"#);
    let runner = MockRunner::new();
    let mut manager = open(&fixture, &runner).await;

    manager.stop(true).await.unwrap();

    let commands = runner.commands();
    assert!(!commands.iter().any(|c| c.contains("container stop")));
    assert!(!commands.iter().any(|c| c.contains("container rm")));
}

#[tokio::test]
async fn test_compose_start_and_down() {
    let fixture = fixture(
        r#"{
            "name": "Web",
            "dockerComposeFile": ["docker-compose.yml"],
            "service": "app",
            "runServices": ["db"],
            "postCreateCommand": "make setup"
        }"#,
    );
    let runner = MockRunner::new();
    let mut manager = open(&fixture, &runner).await;

    manager.start().await.unwrap();
    runner.respond(" ps ", "c1");
    manager.stop(true).await.unwrap();

    let compose_file = fixture.config_dir.join("docker-compose.yml");
    let prefix = format!(
        "docker compose --project-name web_devcontainer --file {}",
        compose_file.display()
    );
    let commands = runner.commands();
    assert!(commands.contains(&format!("{} build db app", prefix)));
    assert!(commands.contains(&format!("{} create db app", prefix)));
    assert!(commands.contains(&format!("{} up --detach db app", prefix)));
    assert!(commands.contains(&format!(
        "{} exec -T --workdir /workspace app sh -c make setup",
        prefix
    )));
    assert!(commands.contains(&format!("{} stop db app", prefix)));
    assert!(commands.contains(&format!("{} down --volumes", prefix)));
}

#[tokio::test]
async fn test_engine_failure_is_reported_with_step() {
    let fixture = fixture(r#"{"build": {"dockerfile": "Dockerfile"}}"#);
    let runner = MockRunner::new();
    runner.fail("image build", 1);
    let mut manager = open(&fixture, &runner).await;

    let err = manager.build().await.unwrap_err();

    assert!(matches!(err, CoreError::Step { step: "build", .. }));
    assert!(err.to_string().starts_with("cannot build: `docker image build"));
}

#[tokio::test]
async fn test_missing_config_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let result = ContainerManager::open(
        &tmp.path().join("nope"),
        Workspace::new(tmp.path()),
        &GlobalConfig::default(),
        Arc::new(MockRunner::new()),
    )
    .await;
    assert!(matches!(result, Err(CoreError::Config(_))));
}
