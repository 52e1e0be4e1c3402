use std::collections::HashMap;
use std::fs::{read_to_string, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{from_str as deserialize_entries, to_string as serialize_entries};

use crate::persistence::{KeyValueStore, StorageError, StorageResult};

/// File-backed key-value store. All keys live in a single JSON object file;
/// every mutation rewrites the whole file, which keeps the unit of durability
/// identical to the web-storage backends this stands in for.
#[derive(Clone)]
pub struct FileStorage {
    path: Arc<PathBuf>,
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage").field("path", &self.path).finish()
    }
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Arc::new(path.as_ref().to_path_buf()),
        }
    }

    fn load(&self) -> StorageResult<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let buffer = read_to_string(&*self.path)
            .map_err(|err| StorageError::new(format!("failed to read storage file: {err}")))?;
        if buffer.is_empty() {
            return Ok(HashMap::new());
        }
        deserialize_entries(&buffer)
            .map_err(|err| StorageError::new(format!("failed to parse storage file: {err}")))
    }

    fn save(&self, entries: &HashMap<String, String>) -> StorageResult<()> {
        let serialized = serialize_entries(entries)
            .map_err(|err| StorageError::new(format!("failed to serialize storage: {err}")))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                StorageError::new(format!("failed to create storage directory: {err}"))
            })?;
        }
        let mut file = File::create(&*self.path)
            .map_err(|err| StorageError::new(format!("failed to create storage file: {err}")))?;
        file.write_all(serialized.as_bytes())
            .map_err(|err| StorageError::new(format!("failed to write storage file: {err}")))
    }
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.save(&entries)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::remove_file;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "offline-firebase-test-{}-{}.json",
            name,
            std::process::id()
        ));
        path
    }

    #[test]
    fn roundtrip_storage() {
        let path = temp_path("roundtrip");
        let storage = FileStorage::new(&path);

        assert_eq!(storage.get_item("key").unwrap(), None);

        storage.set_item("key", "value").unwrap();
        storage.set_item("other", "{\"nested\":true}").unwrap();
        assert_eq!(storage.get_item("key").unwrap(), Some("value".to_string()));
        assert_eq!(
            storage.get_item("other").unwrap(),
            Some("{\"nested\":true}".to_string())
        );

        storage.remove_item("key").unwrap();
        assert_eq!(storage.get_item("key").unwrap(), None);
        assert!(storage.get_item("other").unwrap().is_some());

        let _ = remove_file(path);
    }

    #[test]
    fn remove_without_file_is_noop() {
        let storage = FileStorage::new(temp_path("remove-noop"));
        storage.remove_item("anything").unwrap();
    }
}
