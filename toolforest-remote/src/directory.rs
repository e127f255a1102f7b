//! Service directory access.
//!
//! Deployed toolsets are recorded as one JSON parameter each under
//! `/toolforest/{env}/toolsets/`. The reader tolerates corrupt records: they
//! are logged and skipped so one bad entry never hides the others.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use toolforest_primitives::DirectoryEntry;
use tracing::{debug, warn};

/// Result alias for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors raised while reading the parameter store.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The backing store rejected the request.
    #[error("parameter store error for `{path}`: {reason}")]
    Store {
        /// Path that was queried.
        path: String,
        /// Human-readable failure detail.
        reason: String,
    },
    /// Filesystem access failed.
    #[error("failed to access `{}`: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// One named value in a hierarchical parameter store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    /// Absolute parameter name, `/`-separated.
    pub name: String,
    /// Raw stored value.
    pub value: String,
}

/// Hierarchical key/value store holding directory records.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Returns every parameter below `path`, recursively, ordered by name.
    async fn parameters_by_path(&self, path: &str) -> DirectoryResult<Vec<Parameter>>;
}

/// Returns the directory path for `environment`.
#[must_use]
pub fn directory_path(environment: &str) -> String {
    format!("/toolforest/{environment}/toolsets/")
}

/// Loads every decodable directory entry for `environment`.
///
/// An empty directory yields an empty list.
///
/// # Errors
///
/// Propagates failures of the store itself; undecodable records are skipped.
pub async fn load_directory(
    store: &dyn ParameterStore,
    environment: &str,
) -> DirectoryResult<Vec<DirectoryEntry>> {
    let path = directory_path(environment);
    let parameters = store.parameters_by_path(&path).await?;

    let mut entries = Vec::with_capacity(parameters.len());
    for parameter in parameters {
        match DirectoryEntry::from_json(&parameter.value) {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!(
                parameter = %parameter.name,
                %err,
                "skipping undecodable directory entry"
            ),
        }
    }

    debug!(%path, entries = entries.len(), "directory loaded");
    Ok(entries)
}

fn prefix_of(path: &str) -> String {
    if path.ends_with('/') {
        path.to_owned()
    } else {
        format!("{path}/")
    }
}

/// Parameter store held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryParameterStore {
    parameters: BTreeMap<String, String>,
}

impl InMemoryParameterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a parameter, returning the store for chaining.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Stores or replaces a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(name.into(), value.into());
    }
}

#[async_trait]
impl ParameterStore for InMemoryParameterStore {
    async fn parameters_by_path(&self, path: &str) -> DirectoryResult<Vec<Parameter>> {
        let prefix = prefix_of(path);
        Ok(self
            .parameters
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .map(|(name, value)| Parameter {
                name: name.clone(),
                value: value.clone(),
            })
            .collect())
    }
}

/// Parameter store backed by a directory tree.
///
/// Parameter `/a/b/c` lives in the file `<root>/a/b/c`.
#[derive(Clone, Debug)]
pub struct FsParameterStore {
    root: PathBuf,
}

impl FsParameterStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a parameter, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Io`] when the file cannot be written.
    pub async fn put(&self, name: &str, value: &str) -> DirectoryResult<()> {
        let file = self.resolve(name);
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DirectoryError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&file, value)
            .await
            .map_err(|source| DirectoryError::Io { path: file, source })
    }

    fn resolve(&self, name: &str) -> PathBuf {
        name.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

#[async_trait]
impl ParameterStore for FsParameterStore {
    async fn parameters_by_path(&self, path: &str) -> DirectoryResult<Vec<Parameter>> {
        let prefix = prefix_of(path);
        let base = self.resolve(&prefix);
        let mut parameters = Vec::new();

        if !tokio::fs::try_exists(&base)
            .await
            .map_err(|source| DirectoryError::Io {
                path: base.clone(),
                source,
            })?
        {
            return Ok(parameters);
        }

        let mut pending = vec![(base, prefix)];
        while let Some((dir, name_prefix)) = pending.pop() {
            let io_err = |source: io::Error| DirectoryError::Io {
                path: dir.clone(),
                source,
            };
            let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_err)?;

            while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
                let file_name = entry.file_name().to_string_lossy().into_owned();
                let name = format!("{name_prefix}{file_name}");
                let file_type = entry.file_type().await.map_err(io_err)?;

                if file_type.is_dir() {
                    pending.push((entry.path(), format!("{name}/")));
                    continue;
                }

                let bytes = tokio::fs::read(entry.path()).await.map_err(io_err)?;
                match String::from_utf8(bytes) {
                    Ok(value) => parameters.push(Parameter { name, value }),
                    Err(_) => warn!(parameter = %name, "skipping non UTF-8 parameter"),
                }
            }
        }

        parameters.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(parameters)
    }
}
