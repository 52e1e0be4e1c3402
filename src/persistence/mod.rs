mod file;
mod memory;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub use file::FileStorage;
pub use memory::MemoryStorage;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure reported by a [`KeyValueStore`].
///
/// Consumers in this crate never propagate these: a failing backend degrades
/// the emulators to in-memory operation, so the error carries only a message
/// for logging.
#[derive(Clone, Debug)]
pub struct StorageError {
    message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for StorageError {}

/// Best-effort synchronous key-value byte store underlying both emulators.
///
/// The contract mirrors web storage: string keys, string values, and no
/// guarantee that any call succeeds. Implementors can wrap a file, a browser
/// storage shim, or nothing at all; callers must treat every operation as
/// fallible and carry on without it.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

type DynGetFn = dyn Fn(&str) -> StorageResult<Option<String>> + Send + Sync;
type DynSetFn = dyn Fn(&str, &str) -> StorageResult<()> + Send + Sync;
type DynRemoveFn = dyn Fn(&str) -> StorageResult<()> + Send + Sync;

/// Key-value backend built from closures, for embedding hosts that already
/// have a storage mechanism of their own.
pub struct ClosureStorage {
    get_fn: Arc<DynGetFn>,
    set_fn: Arc<DynSetFn>,
    remove_fn: Arc<DynRemoveFn>,
}

impl ClosureStorage {
    pub fn new<Get, Set, Remove>(get: Get, set: Set, remove: Remove) -> Self
    where
        Get: Fn(&str) -> StorageResult<Option<String>> + Send + Sync + 'static,
        Set: Fn(&str, &str) -> StorageResult<()> + Send + Sync + 'static,
        Remove: Fn(&str) -> StorageResult<()> + Send + Sync + 'static,
    {
        Self {
            get_fn: Arc::new(get),
            set_fn: Arc::new(set),
            remove_fn: Arc::new(remove),
        }
    }
}

impl KeyValueStore for ClosureStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (self.get_fn)(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (self.set_fn)(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (self.remove_fn)(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[test]
    fn closure_storage_delegates_to_its_closures() {
        let entries = Arc::new(Mutex::new(HashMap::<String, String>::new()));

        let get_entries = entries.clone();
        let set_entries = entries.clone();
        let remove_entries = entries.clone();
        let storage = ClosureStorage::new(
            move |key: &str| Ok(get_entries.lock().unwrap().get(key).cloned()),
            move |key: &str, value: &str| {
                set_entries
                    .lock()
                    .unwrap()
                    .insert(key.to_owned(), value.to_owned());
                Ok(())
            },
            move |key: &str| {
                remove_entries.lock().unwrap().remove(key);
                Ok(())
            },
        );

        assert_eq!(storage.get_item("missing").unwrap(), None);
        storage.set_item("key", "value").unwrap();
        assert_eq!(storage.get_item("key").unwrap(), Some("value".to_string()));
        storage.remove_item("key").unwrap();
        assert_eq!(storage.get_item("key").unwrap(), None);
    }

    #[test]
    fn closure_storage_surfaces_closure_failures() {
        let storage = ClosureStorage::new(
            |_key: &str| Err(StorageError::new("disabled")),
            |_key: &str, _value: &str| Err(StorageError::new("disabled")),
            |_key: &str| Err(StorageError::new("disabled")),
        );
        assert!(storage.get_item("key").is_err());
        assert!(storage.set_item("key", "value").is_err());
        assert!(storage.remove_item("key").is_err());
    }
}
