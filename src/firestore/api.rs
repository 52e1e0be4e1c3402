use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::firestore::error::{not_found, FirestoreResult};
use crate::firestore::listeners::{ListenerRegistration, ListenerRegistry};
use crate::firestore::path::{CollectionPath, DocumentPath};
use crate::firestore::snapshot::{
    DocumentData, DocumentSnapshot, QueryDocumentSnapshot, QuerySnapshot,
};
use crate::persistence::KeyValueStore;
use crate::util::random_document_id;

/// Key the serialized store blob lives under in the persistence backend.
/// Distinct from the auth namespace so both emulators can share one backend.
const STORAGE_KEY: &str = "__offline_firestore_store__";

type StoreMap = BTreeMap<String, BTreeMap<String, DocumentData>>;

/// Handle to the local document store. Clones share the same underlying
/// state; construct one per backend at application start and inject it into
/// consumers.
#[derive(Clone)]
pub struct Firestore {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    backend: Arc<dyn KeyValueStore>,
    // In-memory mirror of the persisted blob. Serves reads and absorbs writes
    // whenever the backend is unavailable or holds malformed data.
    memory: Mutex<StoreMap>,
    listeners: Arc<ListenerRegistry>,
}

impl Firestore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(FirestoreInner {
                backend,
                memory: Mutex::new(StoreMap::new()),
                listeners: Arc::new(ListenerRegistry::new()),
            }),
        }
    }

    /// Resolves a collection reference, normalizing and validating the path.
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        Ok(CollectionReference {
            firestore: self.clone(),
            path: CollectionPath::parse(path)?,
        })
    }

    /// Resolves a document reference, normalizing and validating the path.
    pub fn doc(&self, path: &str) -> FirestoreResult<DocumentReference> {
        Ok(DocumentReference {
            firestore: self.clone(),
            path: DocumentPath::parse(path)?,
        })
    }
}

impl FirestoreInner {
    /// Re-reads the persisted blob so a write from another instance sharing
    /// the backend is picked up before mutating. Backend failures and
    /// malformed payloads degrade to the in-memory mirror.
    fn read_store(&self) -> StoreMap {
        match self.backend.get_item(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<StoreMap>(&raw) {
                Ok(parsed) => {
                    *self.memory.lock().unwrap() = parsed.clone();
                    parsed
                }
                Err(err) => {
                    log::warn!("failed to parse cached document store: {err}");
                    self.memory.lock().unwrap().clone()
                }
            },
            Ok(None) => self.memory.lock().unwrap().clone(),
            Err(err) => {
                log::warn!("document store backend unavailable: {err}");
                self.memory.lock().unwrap().clone()
            }
        }
    }

    /// Writes the whole blob back in one call. The memory mirror is updated
    /// first so a failing backend only costs durability, never correctness
    /// within the session.
    fn write_store(&self, store: &StoreMap) {
        *self.memory.lock().unwrap() = store.clone();
        match serde_json::to_string(store) {
            Ok(raw) => {
                if let Err(err) = self.backend.set_item(STORAGE_KEY, &raw) {
                    log::warn!("failed to persist document store: {err}");
                }
            }
            Err(err) => log::warn!("failed to serialize document store: {err}"),
        }
    }

    fn collection_snapshot(store: &StoreMap, canonical: &str) -> QuerySnapshot {
        let docs = store
            .get(canonical)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, data)| QueryDocumentSnapshot::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default();
        QuerySnapshot::new(docs)
    }

    /// Queues one delivery of the collection's current state to every listener
    /// on the path. Must run after `write_store` so durable state is never
    /// behind what subscribers observe.
    fn queue_snapshot(&self, canonical: &str, store: &StoreMap) {
        let targets = self.listeners.targets(canonical);
        if targets.is_empty() {
            return;
        }
        let snapshot = Self::collection_snapshot(store, canonical);
        self.listeners
            .enqueue(canonical.to_string(), targets, snapshot);
    }
}

/// Reference to a collection of documents.
#[derive(Clone)]
pub struct CollectionReference {
    firestore: Firestore,
    path: CollectionPath,
}

impl CollectionReference {
    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Reference to the document with the given id inside this collection.
    pub fn doc(&self, id: &str) -> FirestoreResult<DocumentReference> {
        Ok(DocumentReference {
            firestore: self.firestore.clone(),
            path: self.path.document(id)?,
        })
    }

    /// Returns a point-in-time copy of every document in the collection.
    pub async fn get(&self) -> FirestoreResult<QuerySnapshot> {
        let inner = &self.firestore.inner;
        let store = inner.read_store();
        Ok(FirestoreInner::collection_snapshot(
            &store,
            &self.path.canonical_string(),
        ))
    }

    /// Stores `data` under a freshly generated id. The collection is created
    /// implicitly if this is its first document.
    pub async fn add(&self, data: DocumentData) -> FirestoreResult<DocumentReference> {
        let inner = &self.firestore.inner;
        let canonical = self.path.canonical_string();
        let id = random_document_id();

        let mut store = inner.read_store();
        store
            .entry(canonical.clone())
            .or_default()
            .insert(id.clone(), data);
        inner.write_store(&store);
        inner.queue_snapshot(&canonical, &store);
        inner.listeners.drain().await;

        self.doc(&id)
    }

    /// Registers a snapshot listener and queues an immediate replay of the
    /// collection's current state (an empty snapshot if it was never written
    /// to). The callback never fires synchronously inside this call's frame
    /// before registration has settled. The replay is delivered before this
    /// call resolves, so the returned registration only stops later
    /// deliveries.
    pub async fn on_snapshot<F>(&self, callback: F) -> FirestoreResult<ListenerRegistration>
    where
        F: Fn(&QuerySnapshot) + Send + Sync + 'static,
    {
        let inner = &self.firestore.inner;
        let canonical = self.path.canonical_string();
        let id = inner.listeners.register(&canonical, Arc::new(callback));

        let store = inner.read_store();
        let snapshot = FirestoreInner::collection_snapshot(&store, &canonical);
        inner
            .listeners
            .enqueue(canonical.clone(), vec![id], snapshot);
        inner.listeners.drain().await;

        Ok(ListenerRegistration::new(
            inner.listeners.clone(),
            canonical,
            id,
        ))
    }
}

/// Reference to a single document.
#[derive(Clone)]
pub struct DocumentReference {
    firestore: Firestore,
    path: DocumentPath,
}

impl DocumentReference {
    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    pub fn parent(&self) -> CollectionReference {
        CollectionReference {
            firestore: self.firestore.clone(),
            path: self.path.parent(),
        }
    }

    /// Reads the document. A missing document is reported through
    /// `DocumentSnapshot::exists`, not as an error.
    pub async fn get(&self) -> FirestoreResult<DocumentSnapshot> {
        let inner = &self.firestore.inner;
        let store = inner.read_store();
        let data = store
            .get(&self.path.parent().canonical_string())
            .and_then(|documents| documents.get(self.path.id()))
            .cloned();
        Ok(DocumentSnapshot::new(self.path.id().to_string(), data))
    }

    /// Unconditional upsert: creates the document or replaces its fields.
    pub async fn set(&self, data: DocumentData) -> FirestoreResult<()> {
        let inner = &self.firestore.inner;
        let canonical = self.path.parent().canonical_string();

        let mut store = inner.read_store();
        store
            .entry(canonical.clone())
            .or_default()
            .insert(self.path.id().to_string(), data);
        inner.write_store(&store);
        inner.queue_snapshot(&canonical, &store);
        inner.listeners.drain().await;
        Ok(())
    }

    /// Shallow-merges `data` into the existing document: top-level keys in
    /// `data` replace the document's, everything else is preserved. Fails
    /// with `firestore/not-found` if the document does not exist, in which
    /// case nothing is persisted and no listener fires.
    pub async fn update(&self, data: DocumentData) -> FirestoreResult<()> {
        let inner = &self.firestore.inner;
        let canonical = self.path.parent().canonical_string();

        let mut store = inner.read_store();
        let existing = store
            .get_mut(&canonical)
            .and_then(|documents| documents.get_mut(self.path.id()));
        let Some(existing) = existing else {
            return Err(not_found(format!(
                "Document {} does not exist",
                self.path.canonical_string()
            )));
        };
        for (key, value) in data {
            existing.insert(key, value);
        }
        inner.write_store(&store);
        inner.queue_snapshot(&canonical, &store);
        inner.listeners.drain().await;
        Ok(())
    }

    /// Removes the document; a no-op if it is already absent. Persists and
    /// notifies in both cases so subscribers stay on the write-ordered path.
    pub async fn delete(&self) -> FirestoreResult<()> {
        let inner = &self.firestore.inner;
        let canonical = self.path.parent().canonical_string();

        let mut store = inner.read_store();
        if let Some(documents) = store.get_mut(&canonical) {
            documents.remove(self.path.id());
        }
        inner.write_store(&store);
        inner.queue_snapshot(&canonical, &store);
        inner.listeners.drain().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;
    use serde_json::json;

    fn test_firestore() -> Firestore {
        Firestore::new(Arc::new(MemoryStorage::new()))
    }

    fn fields(value: serde_json::Value) -> DocumentData {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn add_list_update_delete_roundtrip() {
        let firestore = test_firestore();
        let prompts = firestore.collection("/prompts").unwrap();

        let created = prompts.add(fields(json!({"title": "A"}))).await.unwrap();

        let listed = prompts.get().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.docs()[0].id(), created.id());
        assert_eq!(listed.docs()[0].data()["title"], json!("A"));

        created.update(fields(json!({"title": "B"}))).await.unwrap();
        let snapshot = created.get().await.unwrap();
        assert!(snapshot.exists());
        assert_eq!(snapshot.data().unwrap()["title"], json!("B"));

        created.delete().await.unwrap();
        let snapshot = created.get().await.unwrap();
        assert!(!snapshot.exists());
    }

    #[tokio::test]
    async fn update_preserves_unspecified_fields() {
        let firestore = test_firestore();
        let doc = firestore.doc("/prompts/p1").unwrap();
        doc.set(fields(json!({"title": "A", "tags": ["x"]})))
            .await
            .unwrap();
        doc.update(fields(json!({"title": "B"}))).await.unwrap();

        let data = doc.get().await.unwrap().data().unwrap();
        assert_eq!(data["title"], json!("B"));
        assert_eq!(data["tags"], json!(["x"]));
    }

    #[tokio::test]
    async fn update_missing_document_fails_without_side_effects() {
        let backend = Arc::new(MemoryStorage::new());
        let firestore = Firestore::new(backend.clone() as Arc<dyn KeyValueStore>);
        let doc = firestore.doc("/prompts/missing").unwrap();

        let err = doc.update(fields(json!({"title": "B"}))).await.unwrap_err();
        assert_eq!(err.code_str(), "firestore/not-found");
        // Nothing was persisted.
        assert_eq!(backend.get_item(STORAGE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let firestore = test_firestore();
        let doc = firestore.doc("/prompts/p1").unwrap();
        doc.delete().await.unwrap();
        doc.delete().await.unwrap();
        assert!(!doc.get().await.unwrap().exists());
    }

    #[tokio::test]
    async fn documents_survive_across_instances_sharing_a_backend() {
        let backend = Arc::new(MemoryStorage::new());
        let first = Firestore::new(backend.clone() as Arc<dyn KeyValueStore>);
        first
            .doc("/prompts/p1")
            .unwrap()
            .set(fields(json!({"title": "kept"})))
            .await
            .unwrap();

        let second = Firestore::new(backend as Arc<dyn KeyValueStore>);
        let snapshot = second.doc("/prompts/p1").unwrap().get().await.unwrap();
        assert!(snapshot.exists());
        assert_eq!(snapshot.data().unwrap()["title"], json!("kept"));
    }

    #[tokio::test]
    async fn malformed_persisted_blob_loads_as_empty_store() {
        let backend = Arc::new(MemoryStorage::new());
        backend.set_item(STORAGE_KEY, "not json at all").unwrap();

        let firestore = Firestore::new(backend as Arc<dyn KeyValueStore>);
        let listed = firestore.collection("/prompts").unwrap().get().await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn rejects_malformed_paths() {
        let firestore = test_firestore();
        assert!(firestore.collection("///").is_err());
        assert!(firestore.collection("/prompts/p1").is_err());
        assert!(firestore.doc("/prompts").is_err());
    }
}
