//! Local, in-process emulation of a Firestore-style document database and a
//! Firebase-style authentication service.
//!
//! Both emulators sit on top of a pluggable [`persistence::KeyValueStore`]:
//! documents and the signed-in identity survive across sessions when the
//! backend is durable, and silently fall back to in-memory state when it is
//! not. Construct a [`app::FirebaseApp`] once at startup and hand clones of
//! its [`auth::Auth`] and [`firestore::Firestore`] handles to consumers.

pub mod app;
pub mod auth;
pub mod firestore;
pub mod persistence;
pub mod util;
