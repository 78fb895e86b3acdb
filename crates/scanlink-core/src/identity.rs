//! Stable per-installation device identity.
//!
//! Every outgoing transaction carries the device id so the orchestrator
//! can attribute and dedup scans. The id is generated once, persisted,
//! and never regenerated while the persisted copy survives.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::store::{keys, StateStore};

/// Stable per-installation device identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Read the persisted identity, generating and persisting a fresh one
    /// if none exists.
    ///
    /// Idempotent across calls and restarts. A persist failure is
    /// non-fatal: the generated id still serves the current session, it
    /// just may not survive a restart.
    pub fn get_or_create(store: &dyn StateStore) -> Self {
        match store.get(keys::DEVICE_ID) {
            Ok(Some(id)) if !id.trim().is_empty() => return Self(id.trim().to_string()),
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "failed to read persisted device id, generating fresh");
            }
        }

        let id = Self::generate();
        if let Err(err) = store.set(keys::DEVICE_ID, id.as_str()) {
            warn!(error = %err, "failed to persist device id, identity will not survive restart");
        }
        id
    }

    /// Generate a fresh identifier.
    fn generate() -> Self {
        Self(format!("scanner-{}", Uuid::new_v4()))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, ScanlinkError};
    use crate::store::MemoryStore;

    /// Store whose writes always fail; reads delegate to an inner store.
    struct ReadOnlyStore(MemoryStore);

    impl StateStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(ScanlinkError::Persistence("storage unavailable".into()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Err(ScanlinkError::Persistence("storage unavailable".into()))
        }
    }

    #[test]
    fn test_generates_and_persists_on_first_call() {
        let store = MemoryStore::new();
        let id = DeviceId::get_or_create(&store);

        assert!(id.as_str().starts_with("scanner-"));
        assert_eq!(
            store.get(keys::DEVICE_ID).unwrap().as_deref(),
            Some(id.as_str())
        );
    }

    #[test]
    fn test_idempotent_across_calls() {
        let store = MemoryStore::new();
        let first = DeviceId::get_or_create(&store);
        let second = DeviceId::get_or_create(&store);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reuses_existing_persisted_id() {
        let store = MemoryStore::new();
        store.set(keys::DEVICE_ID, "scanner-legacy").unwrap();

        let id = DeviceId::get_or_create(&store);
        assert_eq!(id.as_str(), "scanner-legacy");
    }

    #[test]
    fn test_persist_failure_is_non_fatal() {
        let store = ReadOnlyStore(MemoryStore::new());
        let id = DeviceId::get_or_create(&store);
        // Usable for the session even though the write failed.
        assert!(id.as_str().starts_with("scanner-"));
    }

    #[test]
    fn test_blank_persisted_id_regenerates() {
        let store = MemoryStore::new();
        store.set(keys::DEVICE_ID, "  ").unwrap();

        let id = DeviceId::get_or_create(&store);
        assert!(id.as_str().starts_with("scanner-"));
    }
}
