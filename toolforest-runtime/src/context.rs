//! Caller identity scoped to a single dispatch.
//!
//! The dispatcher installs an [`InvocationContext`] around every request it
//! routes. Tool implementations read it back with [`current_user_token`]
//! instead of receiving the token as a parameter. Each scope is bound to the
//! task polling the request future, so concurrent requests never observe
//! each other's token.

use std::fmt;
use std::future::Future;

use toolforest_primitives::CallContext;

tokio::task_local! {
    static CURRENT: InvocationContext;
}

/// Request-scoped caller identity.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    user_token: String,
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("has_user_token", &self.has_user_token())
            .finish()
    }
}

impl InvocationContext {
    /// Creates a context carrying the supplied token.
    #[must_use]
    pub fn new(user_token: impl Into<String>) -> Self {
        Self {
            user_token: user_token.into(),
        }
    }

    /// Returns the bearer token; empty when the caller sent none.
    #[must_use]
    pub fn user_token(&self) -> &str {
        &self.user_token
    }

    /// Returns `true` when a non-empty token is present.
    #[must_use]
    pub fn has_user_token(&self) -> bool {
        !self.user_token.is_empty()
    }

    /// Runs `fut` with this context installed.
    ///
    /// The previous context, if any, is restored once `fut` completes, on
    /// both success and failure paths.
    pub async fn scope<F>(self, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT.scope(self, fut).await
    }
}

impl From<&CallContext> for InvocationContext {
    fn from(value: &CallContext) -> Self {
        Self::new(value.user_token())
    }
}

/// Returns the context of the request being served, if any.
#[must_use]
pub fn current() -> Option<InvocationContext> {
    CURRENT.try_with(Clone::clone).ok()
}

/// Returns the caller's bearer token.
///
/// Yields the empty string outside a dispatch scope or when the caller sent
/// no token.
#[must_use]
pub fn current_user_token() -> String {
    CURRENT
        .try_with(|ctx| ctx.user_token.clone())
        .unwrap_or_default()
}
