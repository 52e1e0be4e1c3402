mod api;
pub mod error;
mod listeners;
mod path;
mod snapshot;

pub use api::{CollectionReference, DocumentReference, Firestore};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use listeners::ListenerRegistration;
pub use path::{CollectionPath, DocumentPath};
pub use snapshot::{DocumentData, DocumentSnapshot, QueryDocumentSnapshot, QuerySnapshot};
