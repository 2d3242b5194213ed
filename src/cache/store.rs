//! Fail-soft JSON key-value store.
//!
//! Storage-layer errors (missing directory, corrupt JSON, full disk) are
//! caught and logged; `get` returns `None` and `set` is a no-op. No error
//! propagates to callers, so the dashboard stays paintable from whatever
//! state it already has even when persistence is broken.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persistent key-value store backed by a single JSON file.
///
/// Every read loads the file, every write rewrites it; concurrent writers
/// are last-write-wins, which is acceptable because each key is logically
/// owned by one `(language, location)` or date combination.
#[derive(Debug, Clone)]
pub struct KvStore {
    path: PathBuf,
}

impl KvStore {
    /// Open a store at the given file path. The file is created lazily on
    /// the first `set`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> BTreeMap<String, Value> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!("Cache store read failed ({}): {e}", self.path.display());
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    "Cache store is corrupt, treating as empty ({}): {e}",
                    self.path.display()
                );
                BTreeMap::new()
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, Value>) {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warn!("Cache store mkdir failed ({}): {e}", parent.display());
            return;
        }

        let serialized = match serde_json::to_string(map) {
            Ok(s) => s,
            Err(e) => {
                warn!("Cache store serialization failed: {e}");
                return;
            }
        };

        if let Err(e) = fs::write(&self.path, serialized) {
            warn!("Cache store write failed ({}): {e}", self.path.display());
        }
    }

    /// Load and deserialize a value. Returns `None` on a missing key, a
    /// missing/corrupt store file, or a value that does not match `T`.
    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let map = self.read_map();
        let value = map.get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Cache entry has unexpected shape, ignoring (key={key}): {e}");
                None
            }
        }
    }

    /// Serialize and persist a value. Errors are logged and swallowed.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let serialized = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!("Cache value serialization failed (key={key}): {e}");
                return;
            }
        };

        let mut map = self.read_map();
        map.insert(key.to_string(), serialized);
        self.write_map(&map);
        debug!("Cache entry written: key={key}");
    }

    /// Drop every entry. Used by the cache-reset command.
    pub fn clear_all(&self) {
        self.write_map(&BTreeMap::new());
        debug!("Cache store cleared: {}", self.path.display());
    }
}
