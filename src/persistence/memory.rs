use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::persistence::{KeyValueStore, StorageResult};

/// Purely in-memory backend. Never fails; cloned handles share the same
/// underlying map, so one instance can back several emulators in a test.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("missing").unwrap(), None);

        storage.set_item("key", "value").unwrap();
        assert_eq!(storage.get_item("key").unwrap(), Some("value".to_string()));

        storage.remove_item("key").unwrap();
        assert_eq!(storage.get_item("key").unwrap(), None);
    }

    #[test]
    fn clones_share_entries() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.set_item("shared", "yes").unwrap();
        assert_eq!(other.get_item("shared").unwrap(), Some("yes".to_string()));
    }
}
