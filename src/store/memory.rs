//! In-memory configuration store.

use parking_lot::RwLock;

use super::{merge, select, ChangeListener, ConfigStore, Listeners, StoreValues};
use crate::error::StoreError;

/// MemoryStore keeps the configuration in process memory.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<StoreValues>,
    listeners: Listeners,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `values`.
    pub fn with_values(values: StoreValues) -> Self {
        Self {
            values: RwLock::new(values),
            listeners: Listeners::default(),
        }
    }

    /// Get the number of registered change listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError> {
        Ok(select(&self.values.read(), keys))
    }

    fn set(&self, values: StoreValues) -> Result<(), StoreError> {
        let change = {
            let mut current = self.values.write();
            merge(&mut current, values)
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
    use crate::store::StoreChange;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_set_notifies_changed_keys() {
        let store = MemoryStore::new();
        let seen: Arc<Mutex<Vec<StoreChange>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(Box::new(move |change| {
            sink.lock().push(change.clone());
            true
        }));

        let mut values = StoreValues::new();
        values.insert("redirectUrl".to_string(), json!("https://safe.test"));
        store.set(values.clone()).unwrap();
        // Same value again: no notification
        store.set(values).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].touches(&["redirectUrl"]));
    }

    #[test]
    fn test_get_selects_keys() {
        let mut values = StoreValues::new();
        values.insert("a".to_string(), json!(1));
        values.insert("b".to_string(), json!(2));
        let store = MemoryStore::with_values(values);

        let got = store.get(&["b"]).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got.get("b"), Some(&json!(2)));
    }
}
