//! Configuration parsing for devc
//!
//! This crate handles:
//! - Loading `devcontainer.json` (JSONC, synonyms, defaults, validation)
//! - Variable resolution (`${localEnv:VAR}`, `${localWorkspaceFolder}`, ...)
//! - Global configuration (`~/.config/devc/config.toml`)

mod devcontainer;
mod error;
mod global;
mod substitute;
mod workspace;

pub use devcontainer::*;
pub use error::*;
pub use global::*;
pub use substitute::*;
pub use workspace::*;
