//! Configuration management for toolforest processes.
//!
//! Settings are sourced from environment variables so the same binaries run
//! unchanged across deployment environments.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{ENV_VARS, load_from_lookup};
pub use schema::{DirectorySettings, LogFormat, LogSettings, RetrySettings, ToolforestConfig};
