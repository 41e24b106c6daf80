//! Durable string key-value storage for client settings.
//!
//! The whole map lives in memory and is rewritten to a JSON object file on
//! every change. Writes go to a sibling temp file that is renamed over the
//! target, so the file on disk is always a complete snapshot. A missing,
//! unreadable or corrupt file opens as an empty store.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

type Values = BTreeMap<String, String>;

/// Key-value store backed by a JSON file.
pub struct JsonStore {
    path: PathBuf,
    values: Mutex<Values>,
}

impl JsonStore {
    /// Opens the store at `path`. Never fails: anything that cannot be
    /// read back is logged and replaced by an empty store.
    pub fn open(path: PathBuf) -> Self {
        let values = match read_values(&path) {
            Ok(values) => values,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable store");
                Values::new()
            }
        };
        debug!(path = %path.display(), entries = values.len(), "store opened");
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    /// Sets a value, overwriting any previous one.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    /// Removes a key. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|values| values.remove(key).is_some())
    }

    /// Applies `change` to a copy of the map and commits it once the file
    /// is written. `change` returns false when nothing changed.
    fn update(&self, change: impl FnOnce(&mut Values) -> bool) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        let mut next = values.clone();
        if !change(&mut next) {
            return Ok(());
        }
        write_values(&self.path, &next)?;
        *values = next;
        Ok(())
    }
}

fn read_values(path: &Path) -> Result<Values, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(serde_json::from_str(&data)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Values::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_values(path: &Path, values: &Values) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Returns the default store path.
pub fn default_store_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("wakemate").join("storage.json"))
}

/// Returns the per-user configuration directory: `%APPDATA%` on Windows,
/// `$XDG_CONFIG_HOME` or `~/.config` elsewhere.
pub fn config_dir() -> Option<PathBuf> {
    let var = |name: &str| {
        std::env::var_os(name)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    };
    if cfg!(target_os = "windows") {
        var("APPDATA")
    } else {
        var("XDG_CONFIG_HOME").or_else(|| var("HOME").map(|home| home.join(".config")))
    }
}
