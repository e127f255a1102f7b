//! Bearer token helpers.

use std::sync::LazyLock;

use regex::Regex;

static JWT_SHAPE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{32,}$").ok()
});

/// Returns `true` when `token` has the three-segment shape of a signed JWT.
///
/// Only the shape is checked: base64url segments of at least 10, 10, and 32
/// characters. Nothing is decoded or verified.
#[must_use]
pub fn is_jwt_format(token: &str) -> bool {
    JWT_SHAPE
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(token))
}
