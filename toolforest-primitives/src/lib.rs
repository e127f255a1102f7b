//! Core wire types shared by toolforest services and their callers.
//!
//! Everything that crosses the transport boundary lives here: the request and
//! response envelopes, the error taxonomy, the `describe_tools` manifest, and
//! the directory records written at deployment time.

#![warn(missing_docs, clippy::pedantic)]

mod directory;
mod envelope;
mod error;
mod manifest;

/// Deployment records describing where a toolset can be reached.
pub use directory::DirectoryEntry;
/// Request/response envelopes and the typed RPC error.
pub use envelope::{
    ACTION_DESCRIBE_TOOLS, ACTION_INVOKE, CallContext, ErrorBody, ErrorKind, RequestEnvelope,
    ResponseEnvelope, RpcError,
};
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Toolset manifest returned by `describe_tools`.
pub use manifest::{Manifest, ToolDescriptor, UNKNOWN_TOOLSET, UNKNOWN_TOOLSET_VERSION};
