//! Shared error definitions for toolforest primitives.

use thiserror::Error;

/// Result alias used throughout the toolforest workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing or decoding primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// A directory record could not be decoded.
    #[error("invalid directory entry: {source}")]
    InvalidDirectoryEntry {
        /// Underlying JSON decoding error.
        #[from]
        source: serde_json::Error,
    },
}
