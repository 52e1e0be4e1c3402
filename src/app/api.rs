use std::sync::Arc;

use crate::app::errors::AppResult;
use crate::app::types::{FirebaseAppSettings, FirebaseOptions};
use crate::auth::Auth;
use crate::firestore::Firestore;
use crate::persistence::KeyValueStore;

const DEFAULT_APP_IDENTIFIER: &str = "gbs-gemini-training";
const DEFAULT_COLLECTION_ROOT: &str = "artifacts";

/// One initialized application: validated options plus the pair of emulators
/// sharing a persistence backend. Construct once at startup and pass clones
/// to consumers; there are no module-level singletons.
#[derive(Clone)]
pub struct FirebaseApp {
    inner: Arc<FirebaseAppInner>,
}

struct FirebaseAppInner {
    options: FirebaseOptions,
    app_identifier: String,
    collection_root: String,
    auth: Auth,
    firestore: Firestore,
}

/// Validates the options and builds the app over the given backend. Fails
/// with `firebase/missing-config` before any emulator state is touched.
pub fn initialize_app(
    options: FirebaseOptions,
    settings: Option<FirebaseAppSettings>,
    backend: Arc<dyn KeyValueStore>,
) -> AppResult<FirebaseApp> {
    options.validate()?;
    let settings = settings.unwrap_or_default();
    Ok(FirebaseApp {
        inner: Arc::new(FirebaseAppInner {
            options,
            app_identifier: settings
                .app_identifier
                .unwrap_or_else(|| DEFAULT_APP_IDENTIFIER.to_string()),
            collection_root: settings
                .collection_root
                .unwrap_or_else(|| DEFAULT_COLLECTION_ROOT.to_string()),
            auth: Auth::new(backend.clone()),
            firestore: Firestore::new(backend),
        }),
    })
}

impl FirebaseApp {
    pub fn options(&self) -> &FirebaseOptions {
        &self.inner.options
    }

    pub fn app_identifier(&self) -> &str {
        &self.inner.app_identifier
    }

    pub fn collection_root(&self) -> &str {
        &self.inner.collection_root
    }

    /// The identity emulator. Cloned handles share one identity.
    pub fn auth(&self) -> Auth {
        self.inner.auth.clone()
    }

    /// The document store emulator. Cloned handles share one store.
    pub fn firestore(&self) -> Firestore {
        self.inner.firestore.clone()
    }

    /// Composes the per-identity collection path the application scopes its
    /// data under: `/<root>/<app identifier>/users/<uid>/<name>`.
    pub fn user_collection(&self, uid: &str, name: &str) -> String {
        let root = self.inner.collection_root.trim_matches('/');
        format!(
            "/{root}/{}/users/{uid}/{name}",
            self.inner.app_identifier
        )
    }
}

impl std::fmt::Debug for FirebaseApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseApp")
            .field("app_identifier", &self.inner.app_identifier)
            .field("collection_root", &self.inner.collection_root)
            .finish()
    }
}
