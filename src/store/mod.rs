//! Key/value configuration store seam.
//!
//! The store owns the persisted configuration. It answers `get` for a set of
//! keys, merges partial records on `set`, and tells subscribers which keys
//! changed.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Key/value record as held by the store.
pub type StoreValues = Map<String, Value>;

/// Change notification listener. Returning `false` unsubscribes it.
pub type ChangeListener = Box<dyn Fn(&StoreChange) -> bool + Send + Sync>;

/// Keys whose value changed in one `set`, with their new values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreChange {
    pub changed: StoreValues,
}

impl StoreChange {
    /// Check if any of `keys` changed.
    pub fn touches(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.changed.contains_key(*key))
    }

    /// Get the changed keys.
    pub fn keys(&self) -> Vec<String> {
        self.changed.keys().cloned().collect()
    }

    /// Check if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

/// ConfigStore is the interface to the configuration store.
pub trait ConfigStore: Send + Sync {
    /// Read the given keys. Absent keys are omitted from the result.
    fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError>;

    /// Merge a partial record into the store.
    ///
    /// Listeners are notified after the write with the keys whose value
    /// actually changed; nothing is sent when no value changed.
    fn set(&self, values: StoreValues) -> Result<(), StoreError>;

    /// Register a change listener. It stays registered until it returns
    /// `false` from a notification.
    fn subscribe(&self, listener: ChangeListener);
}

impl<S: ConfigStore + ?Sized> ConfigStore for std::sync::Arc<S> {
    fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError> {
        (**self).get(keys)
    }

    fn set(&self, values: StoreValues) -> Result<(), StoreError> {
        (**self).set(values)
    }

    fn subscribe(&self, listener: ChangeListener) {
        (**self).subscribe(listener)
    }
}

/// Registered change listeners.
#[derive(Default)]
pub(crate) struct Listeners {
    listeners: RwLock<Vec<ChangeListener>>,
}

impl Listeners {
    pub(crate) fn add(&self, listener: ChangeListener) {
        self.listeners.write().push(listener);
    }

    pub(crate) fn notify(&self, change: &StoreChange) {
        if change.is_empty() {
            return;
        }
        log::debug!("Store change: {:?}", change.keys());
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|listener| listener(change));
        if listeners.len() < before {
            log::debug!("Dropped {} closed store listeners", before - listeners.len());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }
}

/// Select the requested keys from a record.
pub(crate) fn select(current: &StoreValues, keys: &[&str]) -> StoreValues {
    keys.iter()
        .filter_map(|key| current.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

/// Merge `values` into `current`, returning the entries that changed.
pub(crate) fn merge(current: &mut StoreValues, values: StoreValues) -> StoreChange {
    let mut changed = StoreValues::new();
    for (key, value) in values {
        if current.get(&key) != Some(&value) {
            current.insert(key.clone(), value.clone());
            changed.insert(key, value);
        }
    }
    StoreChange { changed }
}
