use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io failure for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stored document under key {key} is not valid json: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("document for key {key} could not be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Logical save/load contract the core's collaborators persist through.
/// Keys are slash-separated relative paths; last writer wins.
pub trait JsonStore {
    fn save(&self, key: &str, document: &Value) -> Result<(), StoreError>;
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError>;
}

/// File-backed store: one JSON document per key under a root directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl JsonStore for FileStore {
    fn save(&self, key: &str, document: &Value) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| StoreError::Io { key: key.to_string(), source })?;
        }

        let encoded = serde_json::to_vec_pretty(document)
            .map_err(|source| StoreError::Encode { key: key.to_string(), source })?;
        fs::write(&path, encoded)
            .map_err(|source| StoreError::Io { key: key.to_string(), source })?;
        debug!(event_name = "store.save", key, "persisted document");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(event_name = "store.miss", key, "no document for key");
                return Ok(None);
            }
            Err(source) => return Err(StoreError::Io { key: key.to_string(), source }),
        };

        let document = serde_json::from_str(&raw)
            .map_err(|source| StoreError::Decode { key: key.to_string(), source })?;
        debug!(event_name = "store.load", key, "loaded document");
        Ok(Some(document))
    }
}
