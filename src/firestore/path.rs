use std::fmt::{Display, Formatter};

use crate::firestore::error::{invalid_path, FirestoreResult};

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .collect()
}

/// Normalized address of a set of documents.
///
/// The canonical form carries exactly one leading `/`, no trailing `/` and no
/// repeated separators; two paths are equal iff their canonical forms are.
/// Collection paths always have an odd number of segments, document paths an
/// even number, so the two kinds can never alias each other.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    pub fn parse(path: &str) -> FirestoreResult<Self> {
        let segments = split_segments(path);
        if segments.is_empty() {
            return Err(invalid_path(format!("Invalid collection path: {path:?}")));
        }
        if segments.len() % 2 == 0 {
            return Err(invalid_path(format!(
                "Collection path must have an odd number of segments: {path:?}"
            )));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn canonical_string(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Addresses the document with the given id inside this collection.
    pub fn document(&self, id: &str) -> FirestoreResult<DocumentPath> {
        if id.is_empty() || id.contains('/') {
            return Err(invalid_path(format!("Invalid document id: {id:?}")));
        }
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Ok(DocumentPath { segments })
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}

/// Normalized address of a single document: its owning collection path plus a
/// trailing document id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    pub fn parse(path: &str) -> FirestoreResult<Self> {
        let segments = split_segments(path);
        if segments.len() < 2 {
            return Err(invalid_path(format!("Invalid document path: {path:?}")));
        }
        if segments.len() % 2 != 0 {
            return Err(invalid_path(format!(
                "Document path must have an even number of segments: {path:?}"
            )));
        }
        Ok(Self { segments })
    }

    pub fn id(&self) -> &str {
        self.segments.last().expect("document path has segments")
    }

    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    pub fn canonical_string(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

impl Display for DocumentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}
