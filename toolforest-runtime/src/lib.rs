//! Server-side runtime for toolforest toolsets.
//!
//! The modules exposed here make it possible to describe typed tools with
//! explicit schemas, collect them in a registry at start-up, and serve the
//! `describe_tools` / `invoke` protocol through a [`Dispatcher`]. The caller's
//! bearer token is available to tool implementations through [`context`]
//! without being threaded through their parameters.

#![warn(missing_docs, clippy::pedantic)]

pub mod context;
pub mod handler;
pub mod registry;
pub mod schema;
pub mod spec;
pub mod token;

pub use context::{InvocationContext, current_user_token};
pub use handler::Dispatcher;
pub use registry::{ToolError, ToolRegistry, ToolResult};
pub use schema::{Diagnostic, Schema};
pub use spec::{Tool, ToolFuture, ToolSpec, ToolSpecBuilder};
