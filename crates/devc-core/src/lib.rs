//! Core logic for devc container lifecycle management
//!
//! This crate provides:
//! - The configuration pipeline (load, resolve, `initializeCommand`, engine selection)
//! - Lifecycle verbs with idempotency checks (build, start, stop, list, shell)
//! - Lifecycle hook execution

mod error;
mod hooks;
mod manager;

pub use error::*;
pub use hooks::*;
pub use manager::*;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
