//! Remote proxies built from `describe_tools` manifests.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde_json::{Map, Value};
use thiserror::Error;
use toolforest_primitives::{
    CallContext, DirectoryEntry, Manifest, RequestEnvelope, ResponseEnvelope, ToolDescriptor,
};
use tracing::{debug, info, warn};

use crate::retry::{RetryConfig, RetryExhausted, retry_transport};
use crate::transport::{Transport, TransportError};

/// Result alias for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Supplies the caller identity attached to outgoing calls.
pub type ContextProvider = Arc<dyn Fn() -> Option<CallContext> + Send + Sync>;

/// Errors surfaced to callers of remote proxies.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The remote toolset answered with an error envelope.
    #[error("{kind}: {message}")]
    Remote {
        /// Remote error category, e.g. `ValidationError`.
        kind: String,
        /// Remote error message, verbatim.
        message: String,
    },
    /// The call could not be completed within the attempt budget.
    #[error("transport to `{endpoint}` failed after {attempts} attempt(s): {source}")]
    Transport {
        /// Endpoint reference that was called.
        endpoint: String,
        /// Number of attempts made.
        attempts: usize,
        /// Failure of the last attempt.
        #[source]
        source: TransportError,
    },
    /// The response carried neither a `result` nor an `error`.
    #[error("malformed response from `{endpoint}`: {reason}")]
    MalformedResponse {
        /// Endpoint reference that was called.
        endpoint: String,
        /// Human-readable decoding failure.
        reason: String,
    },
    /// The `describe_tools` result could not be decoded as a manifest.
    #[error("invalid manifest from `{endpoint}`: {reason}")]
    InvalidManifest {
        /// Endpoint reference that was called.
        endpoint: String,
        /// Human-readable decoding failure.
        reason: String,
    },
    /// No proxy is registered under the requested name.
    #[error("no remote tool named `{name}`")]
    UnknownProxy {
        /// Qualified name that was requested.
        name: String,
    },
    /// Another directory entry already claimed the toolset name.
    #[error("toolset `{toolset}` is listed more than once in the directory")]
    ConflictingToolset {
        /// Duplicated toolset name.
        toolset: String,
    },
}

impl ProxyError {
    fn transport(endpoint: &str, exhausted: RetryExhausted) -> Self {
        Self::Transport {
            endpoint: endpoint.to_owned(),
            attempts: exhausted.attempts,
            source: exhausted.source,
        }
    }
}

/// Sends `request` with retries and decodes the response envelope.
async fn exchange(
    transport: &dyn Transport,
    retry: RetryConfig,
    endpoint: &str,
    request: &RequestEnvelope,
) -> ProxyResult<ResponseEnvelope> {
    let body = retry_transport(retry, || transport.invoke(endpoint, request))
        .await
        .map_err(|exhausted| ProxyError::transport(endpoint, exhausted))?;

    serde_json::from_value(body).map_err(|err| ProxyError::MalformedResponse {
        endpoint: endpoint.to_owned(),
        reason: err.to_string(),
    })
}

fn remote_error(response: ResponseEnvelope) -> ProxyResult<Value> {
    response.into_result().map_err(|body| ProxyError::Remote {
        kind: body.kind,
        message: body.message,
    })
}

/// Callable bound to one tool of one remote toolset.
#[derive(Clone)]
pub struct RemoteProxy {
    toolset: String,
    endpoint: String,
    descriptor: ToolDescriptor,
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
    context_provider: Option<ContextProvider>,
}

impl fmt::Debug for RemoteProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteProxy")
            .field("toolset", &self.toolset)
            .field("method", &self.descriptor.name)
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RemoteProxy {
    /// Returns the remote method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Returns the toolset the method belongs to.
    #[must_use]
    pub fn toolset(&self) -> &str {
        &self.toolset
    }

    /// Returns `toolset.method`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.toolset, self.descriptor.name)
    }

    /// Returns the endpoint reference calls are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the remote documentation string.
    #[must_use]
    pub fn doc(&self) -> &str {
        &self.descriptor.doc
    }

    /// Returns the remote parameter schema.
    #[must_use]
    pub fn params_schema(&self) -> &Value {
        &self.descriptor.params_schema
    }

    /// Returns the parameter names advertised by the remote schema.
    #[must_use]
    pub fn parameter_names(&self) -> Vec<String> {
        self.descriptor.parameter_names()
    }

    /// Invokes the remote method with named parameters.
    ///
    /// The caller context, when a provider is installed, travels with the
    /// request. The result is returned exactly as received.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Remote`] for an error envelope (never retried),
    /// [`ProxyError::Transport`] once retries are exhausted, or
    /// [`ProxyError::MalformedResponse`] for an undecodable body.
    pub async fn call(&self, params: Map<String, Value>) -> ProxyResult<Value> {
        let mut request = RequestEnvelope::invoke(self.name(), params);
        if let Some(context) = self.context_provider.as_ref().and_then(|provider| provider()) {
            request = request.with_context(context);
        }

        debug!(proxy = %self.qualified_name(), endpoint = %self.endpoint, "invoking remote tool");
        let response = exchange(self.transport.as_ref(), self.retry, &self.endpoint, &request).await?;
        remote_error(response)
    }
}

/// Discovery failure of one directory entry.
#[derive(Debug)]
pub struct DiscoveryFailure {
    /// Toolset name of the entry.
    pub toolset: String,
    /// Endpoint reference of the entry.
    pub endpoint: String,
    /// Cause of the failure.
    pub error: ProxyError,
}

/// Proxies keyed by `toolset.method`, plus any discovery failures.
#[derive(Debug, Default)]
pub struct ProxySet {
    proxies: IndexMap<String, RemoteProxy>,
    failures: Vec<DiscoveryFailure>,
}

impl ProxySet {
    /// Returns the proxy registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RemoteProxy> {
        self.proxies.get(name)
    }

    /// Invokes the proxy registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::UnknownProxy`] when no such proxy exists, or any
    /// error from [`RemoteProxy::call`].
    pub async fn call(&self, name: &str, params: Map<String, Value>) -> ProxyResult<Value> {
        let proxy = self.get(name).ok_or_else(|| ProxyError::UnknownProxy {
            name: name.to_owned(),
        })?;
        proxy.call(params).await
    }

    /// Iterates over `(qualified name, proxy)` pairs in directory order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RemoteProxy)> {
        self.proxies.iter().map(|(name, proxy)| (name.as_str(), proxy))
    }

    /// Lists qualified proxy names in directory order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.proxies.keys().map(String::as_str).collect()
    }

    /// Returns the number of proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Returns `true` if no proxy was built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Returns the entries whose discovery failed.
    #[must_use]
    pub fn failures(&self) -> &[DiscoveryFailure] {
        &self.failures
    }

    /// Returns the set only if every entry was discovered.
    ///
    /// # Errors
    ///
    /// Returns the error of the first recorded failure.
    pub fn into_complete(mut self) -> ProxyResult<Self> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        Err(self.failures.remove(0).error)
    }
}

/// Builds [`ProxySet`]s from service directory entries.
#[derive(Clone)]
pub struct ProxyBuilder {
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
    context_provider: Option<ContextProvider>,
}

impl fmt::Debug for ProxyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyBuilder")
            .field("retry", &self.retry)
            .field("context_provider", &self.context_provider.is_some())
            .finish_non_exhaustive()
    }
}

impl ProxyBuilder {
    /// Creates a builder using the default retry policy and no context.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            retry: RetryConfig::default(),
            context_provider: None,
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Installs the provider consulted before every proxy call.
    #[must_use]
    pub fn with_context_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Option<CallContext> + Send + Sync + 'static,
    {
        self.context_provider = Some(Arc::new(provider));
        self
    }

    /// Discovers every entry and builds one proxy per advertised tool.
    ///
    /// Entries are described concurrently and applied in directory order. An
    /// entry that fails discovery, or repeats an earlier toolset name, is
    /// recorded in [`ProxySet::failures`] and contributes no proxies. A tool
    /// name repeated within one manifest keeps its first descriptor.
    pub async fn build(&self, entries: &[DirectoryEntry]) -> ProxySet {
        let mut set = ProxySet::default();
        let mut claimed = HashSet::new();
        let mut accepted = Vec::with_capacity(entries.len());

        for entry in entries {
            if claimed.insert(entry.name.as_str()) {
                accepted.push(entry);
            } else {
                warn!(toolset = %entry.name, "duplicate toolset in directory; ignoring entry");
                set.failures.push(DiscoveryFailure {
                    toolset: entry.name.clone(),
                    endpoint: entry.endpoint_ref().to_owned(),
                    error: ProxyError::ConflictingToolset {
                        toolset: entry.name.clone(),
                    },
                });
            }
        }

        let manifests = join_all(accepted.iter().map(|entry| self.describe(entry))).await;

        for (entry, manifest) in accepted.into_iter().zip(manifests) {
            let endpoint = entry.endpoint_ref();
            match manifest {
                Ok(manifest) => {
                    info!(
                        toolset = %entry.name,
                        endpoint,
                        tools = manifest.tools.len(),
                        "toolset discovered"
                    );
                    for descriptor in manifest.tools {
                        let proxy = self.proxy(entry, descriptor);
                        match set.proxies.entry(proxy.qualified_name()) {
                            Entry::Vacant(slot) => {
                                slot.insert(proxy);
                            }
                            Entry::Occupied(slot) => warn!(
                                proxy = %slot.key(),
                                endpoint,
                                "tool advertised twice; keeping the first descriptor"
                            ),
                        }
                    }
                }
                Err(error) => {
                    warn!(toolset = %entry.name, endpoint, %error, "toolset discovery failed");
                    set.failures.push(DiscoveryFailure {
                        toolset: entry.name.clone(),
                        endpoint: endpoint.to_owned(),
                        error,
                    });
                }
            }
        }

        set
    }

    async fn describe(&self, entry: &DirectoryEntry) -> ProxyResult<Manifest> {
        let endpoint = entry.endpoint_ref();
        let response = exchange(
            self.transport.as_ref(),
            self.retry,
            endpoint,
            &RequestEnvelope::describe_tools(),
        )
        .await?;

        serde_json::from_value(remote_error(response)?).map_err(|err| {
            ProxyError::InvalidManifest {
                endpoint: endpoint.to_owned(),
                reason: err.to_string(),
            }
        })
    }

    fn proxy(&self, entry: &DirectoryEntry, descriptor: ToolDescriptor) -> RemoteProxy {
        RemoteProxy {
            toolset: entry.name.clone(),
            endpoint: entry.endpoint_ref().to_owned(),
            descriptor,
            transport: Arc::clone(&self.transport),
            retry: self.retry,
            context_provider: self.context_provider.clone(),
        }
    }
}
