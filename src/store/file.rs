//! JSON file configuration store.

use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{merge, select, ChangeListener, ConfigStore, Listeners, StoreValues};
use crate::error::StoreError;
use crate::persist::{read_optional, write_atomic};

/// FileStore persists the configuration as one JSON object.
///
/// Every `get` reads the file, so external edits are picked up. Writes
/// replace the file atomically.
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
    listeners: Listeners,
}

impl FileStore {
    /// Create a store backed by `path`. The file is created on first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
            listeners: Listeners::default(),
        }
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreValues, StoreError> {
        let data = match read_optional(&self.path)? {
            Some(data) => data,
            None => return Ok(StoreValues::new()),
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoreValues::new());
        }

        match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Object(values)) => Ok(values),
            Ok(other) => Err(StoreError::Corrupt(format!(
                "{}: expected object, got {}",
                self.path.display(),
                other
            ))),
            Err(e) => Err(StoreError::Corrupt(format!("{}: {}", self.path.display(), e))),
        }
    }
}

impl ConfigStore for FileStore {
    fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError> {
        Ok(select(&self.load()?, keys))
    }

    fn set(&self, values: StoreValues) -> Result<(), StoreError> {
        let change = {
            let _guard = self.write_lock.lock();
            let mut current = self.load()?;
            let change = merge(&mut current, values);
            if !change.is_empty() {
                let data = serde_json::to_vec_pretty(&current)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                write_atomic(&self.path, &data)?;
            }
            change
        };
        self.listeners.notify(&change);
        Ok(())
    }

    fn subscribe(&self, listener: ChangeListener) {
        self.listeners.add(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("config.json"));
        assert!(store.get(&["redirectUrl"]).unwrap().is_empty());
    }

    #[test]
    fn test_set_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let store = FileStore::new(&path);
        let mut values = StoreValues::new();
        values.insert("blockedWebsites".to_string(), json!(["a.com"]));
        store.set(values).unwrap();

        let reopened = FileStore::new(&path);
        let got = reopened.get(&["blockedWebsites"]).unwrap();
        assert_eq!(got.get("blockedWebsites"), Some(&json!(["a.com"])));
    }

    #[test]
    fn test_set_merges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let store = FileStore::new(&path);
        let mut values = StoreValues::new();
        values.insert("extensionEnabled".to_string(), json!(false));
        store.set(values).unwrap();

        let got = store.get(&["theme", "extensionEnabled"]).unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[1, 2]").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get(&["a"]), Err(StoreError::Corrupt(_))));
    }
}
