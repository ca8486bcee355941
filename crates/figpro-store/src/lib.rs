//! File-backed JSON key-value stores
//!
//! Provides the persistence layer shared by the plugin's economy and preset
//! state:
//! - One JSON file per store, holding a map from string ID to value
//! - Missing or unparsable files load as empty (availability over strictness)
//! - Saves replace the whole file atomically (write-temp-then-rename)

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Errors raised while persisting a store to disk.
///
/// Loads never fail: a file that cannot be read or parsed is reported as an
/// empty store. Only writes surface errors so callers can log or escalate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("store i/o failed at {}: {source}", .path.display())]
    Io {
        /// File the operation targeted
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Serializing the map to JSON failed
    #[error("store serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A whole-file JSON store mapping string IDs to values of type `T`.
///
/// The store holds no in-memory state of its own; owners keep the working
/// map and write it through after every mutation.
#[derive(Debug, Clone)]
pub struct JsonStore<T> {
    path: PathBuf,
    _value: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a store backed by the given file path.
    ///
    /// The file is not touched until the first `load` or `save`.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _value: PhantomData,
        }
    }

    /// Backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full map from disk.
    ///
    /// A missing file is an empty store. A file that fails to parse is also
    /// an empty store; the parse failure is logged and the old content is
    /// overwritten on the next save.
    pub async fn load(&self) -> BTreeMap<String, T> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "store unreadable, starting empty");
                return BTreeMap::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "store corrupt, starting empty");
                BTreeMap::new()
            }
        }
    }

    /// Serialize the full map and atomically replace the backing file.
    ///
    /// The map is written to a sibling temp file first and renamed into
    /// place, so a crash mid-write never leaves a truncated store behind.
    ///
    /// # Errors
    /// `StoreError::Io` on filesystem failure, `StoreError::Serialize` if
    /// the map cannot be encoded.
    pub async fn save(&self, map: &BTreeMap<String, T>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(map)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StoreError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        Ok(())
    }

    /// Whether the backing file currently exists on disk.
    pub async fn exists(&self) -> bool {
        tokio::fs::metadata(&self.path).await.is_ok()
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
