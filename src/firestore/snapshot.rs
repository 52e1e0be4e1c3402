use serde_json::{Map, Value};

/// Document payload: a JSON object whose top-level keys are the document's
/// fields.
pub type DocumentData = Map<String, Value>;

/// Point-in-time copy of a single document inside a [`QuerySnapshot`].
#[derive(Clone, Debug)]
pub struct QueryDocumentSnapshot {
    id: String,
    data: DocumentData,
}

impl QueryDocumentSnapshot {
    pub(crate) fn new(id: String, data: DocumentData) -> Self {
        Self { id, data }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns a copy of the document's fields. Mutating the returned map has
    /// no effect on the store.
    pub fn data(&self) -> DocumentData {
        self.data.clone()
    }
}

/// Immutable copy of a collection's documents, materialized when the
/// triggering write was applied. Later writes never alter a delivered
/// snapshot.
#[derive(Clone, Debug, Default)]
pub struct QuerySnapshot {
    docs: Vec<QueryDocumentSnapshot>,
}

impl QuerySnapshot {
    pub(crate) fn new(docs: Vec<QueryDocumentSnapshot>) -> Self {
        Self { docs }
    }

    pub fn docs(&self) -> &[QueryDocumentSnapshot] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryDocumentSnapshot> {
        self.docs.iter()
    }
}

/// Result of a single-document read. A missing document is not an error;
/// `exists()` reports whether data was found.
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    id: String,
    data: Option<DocumentData>,
}

impl DocumentSnapshot {
    pub(crate) fn new(id: String, data: Option<DocumentData>) -> Self {
        Self { id, data }
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> Option<DocumentData> {
        self.data.clone()
    }
}
