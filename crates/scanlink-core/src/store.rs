//! Persistent key-value state storage.
//!
//! The client persists three pieces of state: the orchestrator base URL,
//! the device identity, and the serialized offline queue. [`StateStore`]
//! is the narrow port they go through; production uses [`FileStore`]
//! (one file per key under a data directory), tests use [`MemoryStore`].
//!
//! The port is synchronous on purpose: every queue mutation and its
//! paired persistence write form one critical section, and a sync write
//! keeps that section free of suspension points.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{Result, ScanlinkError};

/// Well-known persisted state keys.
pub mod keys {
    /// Orchestrator base address override.
    pub const ORCHESTRATOR_URL: &str = "orchestrator_url";
    /// Stable per-installation device identifier.
    pub const DEVICE_ID: &str = "device_id";
    /// Serialized offline queue.
    pub const OFFLINE_QUEUE: &str = "offline_queue";
}

/// Port for persisted client state.
///
/// Implementations are single-writer from this client's perspective;
/// values are opaque strings (the callers decide on JSON or plain text).
pub trait StateStore: Send + Sync {
    /// Read the value for `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write (or overwrite) the value for `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value for `key`, if present.
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed store: one file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `data_dir`.
    #[must_use]
    pub const fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Get the default storage location.
    ///
    /// On dedicated scanner hardware: `/var/lib/scanlink/`
    /// For development: the platform data dir (e.g. `~/.local/share/scanlink/`)
    pub fn default_location() -> Result<Self> {
        #[cfg(target_os = "linux")]
        {
            Ok(Self::new(PathBuf::from("/var/lib/scanlink")))
        }
        #[cfg(not(target_os = "linux"))]
        {
            let dirs = directories::ProjectDirs::from("", "", "scanlink").ok_or_else(|| {
                ScanlinkError::Persistence("Cannot determine data directory".into())
            })?;
            Ok(Self::new(dirs.data_dir().to_path_buf()))
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if path.exists() {
            Ok(Some(std::fs::read_to_string(&path)?))
        } else {
            Ok(None)
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ScanlinkError::Persistence("store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ScanlinkError::Persistence("store lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ScanlinkError::Persistence("store lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}
