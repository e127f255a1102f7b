//! Caller-side discovery of deployed toolsets.
//!
//! The flow mirrors a deployment: [`load_directory`] reads the service
//! directory for an environment, [`ProxyBuilder::build`] asks every listed
//! toolset to describe itself, and the resulting [`ProxySet`] exposes one
//! [`RemoteProxy`] per remote tool under `toolset.method`. Calls travel over a
//! pluggable [`Transport`] with bounded exponential retry.

#![warn(missing_docs, clippy::pedantic)]

pub mod directory;
pub mod proxy;
pub mod retry;
pub mod transport;

pub use directory::{
    DirectoryError, DirectoryResult, FsParameterStore, InMemoryParameterStore, Parameter,
    ParameterStore, directory_path, load_directory,
};
pub use proxy::{
    ContextProvider, DiscoveryFailure, ProxyBuilder, ProxyError, ProxyResult, ProxySet,
    RemoteProxy,
};
pub use retry::{RetryConfig, RetryConfigError, RetryExhausted, retry_transport};
pub use transport::{LocalTransport, Transport, TransportError};
