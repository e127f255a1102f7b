//! Typed remote toolsets.
//!
//! Depend on this crate via `cargo add toolforest`. It bundles the workspace
//! crates behind feature flags: services enable `runtime` to register and
//! serve tools, callers enable `remote` to discover deployed toolsets and call
//! them through proxies, and `mcp` serves those proxies to MCP clients.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared wire types for convenience.
pub use toolforest_primitives as primitives;

/// Tool registry and request dispatcher (enabled by `runtime` feature).
#[cfg(feature = "runtime")]
pub use toolforest_runtime as runtime;

/// Directory discovery and remote proxies (enabled by `remote` feature).
#[cfg(feature = "remote")]
pub use toolforest_remote as remote;

/// Tracing setup and request records (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use toolforest_telemetry as telemetry;

/// Environment-driven configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use toolforest_config as config;

/// MCP stdio front end for discovered proxies (enabled by `mcp` feature).
#[cfg(feature = "mcp")]
pub use toolforest_mcp as mcp;
