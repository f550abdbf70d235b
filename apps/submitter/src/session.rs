//! Session Manager — one stable, locally generated identifier per installation.
//!
//! Resolution order on the first call of a process:
//! 1. stored non-empty value → returned verbatim, no write
//! 2. store empty → generate, persist, return
//! 3. store unreadable or write fails → generate, keep in memory only, log
//!
//! Later calls return the cached value without touching the store.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::identity::{IdentityStore, SESSION_ID_KEY};

/// Opaque installation tag. Stored values are kept as-is, even if they don't
/// look like the ids this crate generates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Random version-4 id: 36 chars, 8-4-4-4-12 lower-case hex.
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().hyphenated().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks the 8-4-4-4-12 hex shape with version digit `4` and variant digit `8`-`b`.
    pub fn is_well_formed(candidate: &str) -> bool {
        let bytes = candidate.as_bytes();
        if bytes.len() != 36 {
            return false;
        }
        for (i, &b) in bytes.iter().enumerate() {
            let ok = match i {
                8 | 13 | 18 | 23 => b == b'-',
                14 => b == b'4',
                19 => matches!(b.to_ascii_lowercase(), b'8' | b'9' | b'a' | b'b'),
                _ => b.is_ascii_hexdigit(),
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        SessionId(value)
    }
}

pub struct SessionManager {
    store: Arc<dyn IdentityStore>,
    resolved: Option<SessionId>,
    persistent: bool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self {
            store,
            resolved: None,
            persistent: false,
        }
    }

    /// Returns the installation's session id, creating and persisting one if needed.
    /// Never fails: storage problems degrade to an id that lives only for this process.
    pub async fn ensure_session_id(&mut self) -> SessionId {
        if let Some(id) = &self.resolved {
            return id.clone();
        }

        let (id, persistent) = self.load_or_create().await;
        self.resolved = Some(id.clone());
        self.persistent = persistent;
        id
    }

    /// `false` until an id is resolved, and in degraded mode.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    async fn load_or_create(&self) -> (SessionId, bool) {
        match self.store.get(SESSION_ID_KEY).await {
            Ok(Some(stored)) if !stored.is_empty() => {
                if !SessionId::is_well_formed(&stored) {
                    debug!("Stored session ID '{stored}' has an unfamiliar shape; keeping it");
                }
                info!("Loaded session ID {stored}");
                return (SessionId(stored), true);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Error reading session ID, using an ephemeral one: {e}");
                let id = SessionId::generate();
                warn!("Session ID {id} will not survive restart");
                return (id, false);
            }
        }

        let id = SessionId::generate();
        match self.store.set(SESSION_ID_KEY, id.as_str()).await {
            Ok(()) => {
                info!("Generated new session ID {id}");
                (id, true)
            }
            Err(e) => {
                error!("Error persisting session ID, using it for this run only: {e}");
                (id, false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{FileIdentityStore, MemoryIdentityStore, StoreError};
    use tempfile::tempdir;

    #[test]
    fn test_generated_ids_are_well_formed() {
        for _ in 0..200 {
            let id = SessionId::generate();
            assert_eq!(id.as_str().len(), 36);
            assert!(SessionId::is_well_formed(id.as_str()), "bad id {id}");
        }
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_is_well_formed_rejects_wrong_shapes() {
        assert!(SessionId::is_well_formed("123e4567-e89b-42d3-a456-426614174000"));
        assert!(SessionId::is_well_formed("123E4567-E89B-42D3-B456-426614174000"));
        // version digit
        assert!(!SessionId::is_well_formed("123e4567-e89b-12d3-a456-426614174000"));
        // variant digit
        assert!(!SessionId::is_well_formed("123e4567-e89b-42d3-c456-426614174000"));
        // hyphen position
        assert!(!SessionId::is_well_formed("123e4567e-89b-42d3-a456-426614174000"));
        assert!(!SessionId::is_well_formed("not-a-session-id"));
        assert!(!SessionId::is_well_formed(""));
    }

    #[tokio::test]
    async fn test_stored_value_is_returned_without_write() {
        let store = Arc::new(MemoryIdentityStore::with_entry(SESSION_ID_KEY, "legacy-tag"));
        let mut manager = SessionManager::new(store.clone());

        let id = manager.ensure_session_id().await;

        assert_eq!(id.as_str(), "legacy-tag");
        assert_eq!(store.write_count(), 0);
        assert!(manager.is_persistent());
    }

    #[tokio::test]
    async fn test_empty_store_generates_and_persists() {
        let store = Arc::new(MemoryIdentityStore::default());
        let mut manager = SessionManager::new(store.clone());

        let id = manager.ensure_session_id().await;

        assert!(SessionId::is_well_formed(id.as_str()));
        assert_eq!(store.write_count(), 1);
        assert_eq!(
            store.get(SESSION_ID_KEY).await.unwrap().as_deref(),
            Some(id.as_str())
        );
    }

    #[tokio::test]
    async fn test_stored_empty_string_counts_as_absent() {
        let store = Arc::new(MemoryIdentityStore::with_entry(SESSION_ID_KEY, ""));
        let mut manager = SessionManager::new(store.clone());

        let id = manager.ensure_session_id().await;

        assert!(SessionId::is_well_formed(id.as_str()));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_repeated_calls_do_not_touch_store() {
        let store = Arc::new(MemoryIdentityStore::default());
        let mut manager = SessionManager::new(store.clone());

        let first = manager.ensure_session_id().await;
        let second = manager.ensure_session_id().await;

        assert_eq!(first, second);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_id_survives_a_fresh_process() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("identity.json");

        let first = SessionManager::new(Arc::new(FileIdentityStore::new(&path)))
            .ensure_session_id()
            .await;
        let second = SessionManager::new(Arc::new(FileIdentityStore::new(&path)))
            .ensure_session_id()
            .await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unreadable_store_degrades_to_ephemeral_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, "{{ corrupted").unwrap();
        let mut manager = SessionManager::new(Arc::new(FileIdentityStore::new(&path)));

        let id = manager.ensure_session_id().await;

        assert!(SessionId::is_well_formed(id.as_str()));
        assert!(!manager.is_persistent());
        // degraded mode never writes
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{{ corrupted");
        // and keeps returning the same id for the rest of the process
        assert_eq!(manager.ensure_session_id().await, id);
    }

    struct ReadOnlyStore;

    #[async_trait::async_trait]
    impl IdentityStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: "identity.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[tokio::test]
    async fn test_failed_write_degrades_but_returns_id() {
        let mut manager = SessionManager::new(Arc::new(ReadOnlyStore));

        let id = manager.ensure_session_id().await;

        assert!(SessionId::is_well_formed(id.as_str()));
        assert!(!manager.is_persistent());
        assert_eq!(manager.ensure_session_id().await, id);
    }
}
