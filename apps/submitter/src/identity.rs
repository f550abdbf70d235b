//! Identity Store — durable key/value persistence for the installation's session id.
//!
//! The on-disk layout is a flat JSON object of string keys to string values.
//! A missing file is an empty store. Writes go through a temp file in the same
//! directory and are renamed into place, so a crash never leaves a torn file.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Key the session id is stored under.
pub const SESSION_ID_KEY: &str = "sessionId";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("identity store I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("identity store at {path:?} is not a valid JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Small capability interface over platform storage so the session manager
/// can run against an in-memory fake.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// FileIdentityStore
// ────────────────────────────────────────────────────────────────────────────

/// JSON-file-backed store. Unrelated keys already in the file are preserved on write.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = read_entries(&self.path).await?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // An unreadable file is an error here, not an empty map: never clobber data we can't parse.
        let mut entries = read_entries(&self.path).await?;
        entries.insert(key.to_string(), value.to_string());

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &entries))
            .await
            .map_err(|e| StoreError::Io {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::Other, e),
            })??;

        debug!("Wrote key '{key}' to identity store {:?}", self.path);
        Ok(())
    }
}

async fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
        Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_atomically(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let io_err = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    serde_json::to_writer_pretty(&mut tmp, entries).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryIdentityStore
// ────────────────────────────────────────────────────────────────────────────

/// In-memory store for tests. Counts writes so callers can assert "no write happened".
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    entries: std::sync::Mutex<BTreeMap<String, String>>,
    writes: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryIdentityStore {
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("identity.json"));
        assert_eq!(store.get(SESSION_ID_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("identity.json");
        let store = FileIdentityStore::new(&path);

        store.set(SESSION_ID_KEY, "abc").await.unwrap();

        assert!(path.exists());
        let reopened = FileIdentityStore::new(&path);
        assert_eq!(
            reopened.get(SESSION_ID_KEY).await.unwrap().as_deref(),
            Some("abc")
        );
    }

    #[tokio::test]
    async fn test_set_preserves_other_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();
        let store = FileIdentityStore::new(&path);

        store.set(SESSION_ID_KEY, "abc").await.unwrap();

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(raw.get(SESSION_ID_KEY).map(String::as_str), Some("abc"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error_and_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, "not json at all").unwrap();
        let store = FileIdentityStore::new(&path);

        assert!(matches!(
            store.get(SESSION_ID_KEY).await,
            Err(StoreError::Corrupt { .. })
        ));
        assert!(store.set(SESSION_ID_KEY, "abc").await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json at all");
    }

    #[tokio::test]
    async fn test_unreachable_path_is_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let store = FileIdentityStore::new(blocker.join("identity.json"));

        assert!(matches!(
            store.get(SESSION_ID_KEY).await,
            Err(StoreError::Io { .. })
        ));
        assert!(store.set(SESSION_ID_KEY, "abc").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_counts_writes() {
        let store = MemoryIdentityStore::default();
        store.set(SESSION_ID_KEY, "a").await.unwrap();
        store.set(SESSION_ID_KEY, "b").await.unwrap();
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.get(SESSION_ID_KEY).await.unwrap().as_deref(), Some("b"));
    }
}
