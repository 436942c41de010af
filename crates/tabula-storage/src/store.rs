use crate::backend::{KvBackend, MemoryBackend};
use crate::codec::{self, CodecError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("blob for `{key}` is {bytes} bytes, over the {limit} byte quota")]
    QuotaExceeded {
        key: String,
        bytes: usize,
        limit: usize,
    },
    #[error("backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn backend(message: impl Into<String>) -> Self {
        StorageError::Backend(message.into())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Largest encoded blob accepted per key (default: 5MB, the usual browser storage quota).
    /// `None` disables the check.
    pub max_blob_bytes: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_blob_bytes: Some(5 * 1024 * 1024),
        }
    }
}

/// Result of a [`PersistenceStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The encoded blob was written to the backend.
    Written { bytes: usize },
    /// The backend already held an identical blob; nothing was written.
    Unchanged,
}

/// JSON + compression on top of a [`KvBackend`].
///
/// Reads never fail: a missing, undecodable or unparseable blob loads as `None`, which callers
/// treat as "no prior state". Writes report errors so callers can warn that durability was lost.
#[derive(Clone)]
pub struct PersistenceStore {
    backend: Arc<dyn KvBackend>,
    config: StoreConfig,
}

impl fmt::Debug for PersistenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersistenceStore {
    pub fn new(backend: impl KvBackend, config: StoreConfig) -> Self {
        Self::with_backend(Arc::new(backend), config)
    }

    pub fn with_backend(backend: Arc<dyn KvBackend>, config: StoreConfig) -> Self {
        Self { backend, config }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new(), StoreConfig::default())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Serialize, compress and write `value` under `key`.
    ///
    /// Saving a value whose encoding matches what is already stored skips the write.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<SaveOutcome> {
        let json = serde_json::to_string(value)?;
        let encoded = codec::compress(&json);

        if let Some(limit) = self.config.max_blob_bytes {
            if encoded.len() > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    bytes: encoded.len(),
                    limit,
                });
            }
        }

        if self.backend.get(key)?.as_deref() == Some(encoded.as_str()) {
            log::debug!("skipping write of unchanged blob `{key}`");
            return Ok(SaveOutcome::Unchanged);
        }

        self.backend.put(key, &encoded)?;
        log::debug!(
            "wrote blob `{key}` ({} json bytes, {} encoded bytes)",
            json.len(),
            encoded.len()
        );
        Ok(SaveOutcome::Written {
            bytes: encoded.len(),
        })
    }

    /// Load the value under `key`, treating every failure as absent.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_load(key) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("discarding unreadable blob `{key}`: {err}");
                None
            }
        }
    }

    /// Like [`PersistenceStore::load`], but reports why a present blob could not be read.
    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(encoded) = self.backend.get(key)? else {
            return Ok(None);
        };
        let json = codec::decompress(&encoded)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    pub fn clear(&self, key: &str) -> Result<()> {
        self.backend.delete(key)
    }

    /// Raw encoded blob, for diagnostics.
    pub fn raw(&self, key: &str) -> Result<Option<String>> {
        self.backend.get(key)
    }
}
