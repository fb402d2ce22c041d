use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum StoreError {
    #[error("Store read for `{key}` failed: {source}")]
    #[diagnostic(code(flatdex_client::store_read))]
    Read {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Store write for `{key}` failed: {source}")]
    #[diagnostic(code(flatdex_client::store_write))]
    Write {
        key: String,
        #[source]
        source: io::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The shared build descriptor store.
///
/// The store is a plain key/value cache with no expiry; it exists to avoid
/// repeat build-system queries across runs, and failures to write it must
/// never fail the caller.
pub trait BuildStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// Filesystem-backed store: one JSON document per key under a root
/// directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        // Keys like `build:app-1.2-3` become one flat file each
        self.root.join(format!("{}.json", key.replace('/', "-")))
    }
}

impl BuildStore for FsStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Write {
            key: key.to_string(),
            source,
        })?;
        fs::write(self.key_path(key), value).map_err(|source| StoreError::Write {
            key: key.to_string(),
            source,
        })
    }
}

/// In-memory store, used by tests and as an ephemeral backend.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BuildStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_fs_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path().join("builds"));

        assert_eq!(store.get("build:app-1.2-3").unwrap(), None);
        store.set("build:app-1.2-3", "{\"Nvr\":\"app-1.2-3\"}").unwrap();
        assert_eq!(
            store.get("build:app-1.2-3").unwrap().as_deref(),
            Some("{\"Nvr\":\"app-1.2-3\"}")
        );
    }

    #[test]
    fn test_fs_store_overwrites() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());

        store.set("key", "one").unwrap();
        store.set("key", "two").unwrap();
        assert_eq!(store.get("key").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").unwrap(), None);
        store.set("key", "value").unwrap();
        assert_eq!(store.get("key").unwrap().as_deref(), Some("value"));
    }
}
