//! Common types for container engines

use devc_config::{DevContainerConfig, ImageSource};
use std::fmt;

/// Which engine variant drives a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// One container built from `image` or `build.dockerfile`
    Docker,
    /// A compose project selected by `dockerComposeFile`
    Compose,
}

impl EngineKind {
    /// Pick the engine for a validated configuration
    pub fn select(config: &DevContainerConfig) -> Option<Self> {
        match config.image_source()? {
            ImageSource::Image(_) | ImageSource::Dockerfile(_) => Some(Self::Docker),
            ImageSource::Compose(_) => Some(Self::Compose),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docker => write!(f, "docker"),
            Self::Compose => write!(f, "compose"),
        }
    }
}

/// How a child process's standard output is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Inherit the terminal
    Stream,
    /// Collect stdout and return it trimmed
    Capture,
}

/// Options for running a command inside the dev container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Pass `remoteEnv` with `${containerEnv:NAME}` resolved
    pub with_env: bool,
    /// Keep stdin attached to the container process
    pub interactive: bool,
    /// Allocate a pseudo-terminal
    pub tty: bool,
}

impl ExecOptions {
    /// Interactive session: environment and a terminal when one is attached
    pub fn interactive(tty: bool) -> Self {
        Self {
            with_env: true,
            interactive: true,
            tty,
        }
    }

    /// Lifecycle hook: environment and streamed output, detached from stdin
    pub fn hook() -> Self {
        Self {
            with_env: true,
            interactive: false,
            tty: false,
        }
    }
}

/// Container state observed by the last probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatus {
    pub built: bool,
    pub created: bool,
    pub running: bool,
}
