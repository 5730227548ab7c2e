//! Error types for devc-core

use devc_provider::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0}")]
    Config(#[from] devc_config::ConfigError),

    /// An engine operation failed; `step` is the verb shown to the user
    #[error("cannot {step}: {source}")]
    Step {
        step: &'static str,
        source: ProviderError,
    },

    /// A lifecycle hook exited non-zero or could not be started
    #[error("cannot run {hook}: {source}")]
    Hook {
        hook: &'static str,
        source: ProviderError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Adapter for `map_err` tagging a provider error with its step
    pub fn step(step: &'static str) -> impl FnOnce(ProviderError) -> CoreError {
        move |source| CoreError::Step { step, source }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_message() {
        let err = CoreError::step("build")(ProviderError::CommandFailed {
            command: "docker image build".to_string(),
            code: Some(2),
        });
        assert_eq!(
            err.to_string(),
            "cannot build: `docker image build` failed with exit code 2"
        );
    }

    #[test]
    fn test_hook_message() {
        let err = CoreError::Hook {
            hook: "postStartCommand",
            source: ProviderError::NotFound("docker".to_string()),
        };
        assert!(err
            .to_string()
            .starts_with("cannot run postStartCommand: 'docker' not found"));
    }
}
