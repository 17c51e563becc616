//! JSON-per-key durable store.
//!
//! The persistence model mirrors browser localStorage: each named value is
//! one JSON blob, overwritten wholesale on every save. Here a key maps to
//! `{data_dir}/{key}.json`, and each save is atomic (temp file + rename), so
//! a crash mid-write leaves the previous blob intact.

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::StoreError;

/// Store keys. Names match the original persisted layout.
pub mod keys {
    pub const TASKS: &str = "tasks";
    pub const USERS: &str = "users";
    pub const CURRENT_USER: &str = "currentUser";
    pub const IS_AUTHENTICATED: &str = "isAuthenticated";
    pub const THEME: &str = "theme";
}

/// Handle to a data directory holding one JSON file per key.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Write {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Load the value stored under `key`, or `default` when the key is
    /// absent or the stored blob does not parse.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let path = self.path_for(key);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return default,
        };
        match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, err = %e, "stored value does not parse — using default");
                default
            }
        }
    }

    /// Serialize `value` and overwrite `key`. The write lands in a temp file
    /// in the same directory first, then renames over the target.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        let write_err = |source| StoreError::Write {
            key: key.to_string(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.persist(self.path_for(key))
            .map_err(|e| write_err(e.error))?;
        Ok(())
    }

    /// Remove `key` entirely. Removing an absent key is fine.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                key: key.to_string(),
                source,
            }),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{seed_tasks, Task};

    fn open_temp() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn round_trip_preserves_order() {
        let (_dir, store) = open_temp();
        let tasks = seed_tasks();
        store.save(keys::TASKS, &tasks).unwrap();
        let loaded: Vec<Task> = store.load(keys::TASKS, Vec::new());
        assert_eq!(loaded, tasks);
    }

    #[test]
    fn absent_key_yields_default() {
        let (_dir, store) = open_temp();
        let loaded: Vec<Task> = store.load("missing", seed_tasks());
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn malformed_blob_yields_default() {
        let (dir, store) = open_temp();
        std::fs::write(dir.path().join("tasks.json"), "{not json").unwrap();
        let loaded: Vec<Task> = store.load(keys::TASKS, Vec::new());
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_overwrites_previous_value() {
        let (_dir, store) = open_temp();
        store.save(keys::THEME, &"light").unwrap();
        store.save(keys::THEME, &"dark").unwrap();
        let theme: String = store.load(keys::THEME, String::new());
        assert_eq!(theme, "dark");
    }

    #[test]
    fn remove_is_idempotent() {
        let (_dir, store) = open_temp();
        store.save(keys::CURRENT_USER, &Some("x")).unwrap();
        store.remove(keys::CURRENT_USER).unwrap();
        store.remove(keys::CURRENT_USER).unwrap();
        let loaded: Option<String> = store.load(keys::CURRENT_USER, None);
        assert_eq!(loaded, None);
    }
}
