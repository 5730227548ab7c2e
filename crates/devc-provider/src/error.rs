//! Error types for container engines

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("'{0}' not found, is it installed and on PATH?")]
    NotFound(String),

    #[error("`{command}` failed with {}", exit_status(*.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("Empty command")]
    EmptyCommand,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn exit_status(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
