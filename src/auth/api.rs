use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::auth::error::{AuthError, AuthResult};
use crate::auth::model::{User, UserCredential};
use crate::persistence::KeyValueStore;
use crate::util::{random_uid, token_derived_uid};

/// Key the serialized identity lives under in the persistence backend.
/// Distinct from the document-store namespace so both emulators can share one
/// backend.
const STORAGE_KEY: &str = "__offline_firebase_auth__";

const ANONYMOUS_UID_PREFIX: &str = "anon";

type AuthStateCallback = Arc<dyn Fn(Option<&User>) + Send + Sync>;

struct PendingDelivery {
    targets: Vec<u64>,
    user: Option<User>,
}

#[derive(Default)]
struct AuthState {
    current: Option<User>,
    listeners: HashMap<u64, AuthStateCallback>,
    pending: VecDeque<PendingDelivery>,
}

/// Handle to the local identity emulator. Clones observe the same underlying
/// identity; so do separate instances constructed over the same backend.
#[derive(Clone)]
pub struct Auth {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    backend: Arc<dyn KeyValueStore>,
    state: Mutex<AuthState>,
    next_listener_id: AtomicU64,
    draining: AtomicBool,
}

impl Auth {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                backend,
                state: Mutex::new(AuthState::default()),
                next_listener_id: AtomicU64::new(1),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// The currently signed-in user, if any. While signed out this re-reads
    /// the backend, so an identity persisted by another instance is found.
    pub fn current_user(&self) -> Option<User> {
        let mut state = self.inner.state.lock().unwrap();
        if state.current.is_none() {
            state.current = self.inner.load_persisted();
        }
        state.current.clone()
    }

    /// Registers an auth-state listener and queues an immediate delivery of
    /// the current identity (or `None`). Subsequent transitions are delivered
    /// in order; the callback never fires synchronously inside this call's
    /// frame before registration has settled. The initial delivery completes
    /// before this call resolves, so unsubscribing only stops later
    /// deliveries.
    pub async fn on_auth_state_changed<F>(&self, callback: F) -> AuthListenerRegistration
    where
        F: Fn(Option<&User>) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        let current = self.current_user();
        {
            let mut state = self.inner.state.lock().unwrap();
            state.listeners.insert(id, Arc::new(callback));
            state.pending.push_back(PendingDelivery {
                targets: vec![id],
                user: current,
            });
        }
        self.inner.drain().await;
        AuthListenerRegistration {
            inner: self.inner.clone(),
            id,
            removed: AtomicBool::new(false),
        }
    }

    /// Signs in without credentials. A previously persisted identity is
    /// reused, so a returning session keeps the same uid; otherwise a fresh
    /// anonymous identity is minted and persisted. Listeners are notified
    /// either way.
    pub async fn sign_in_anonymously(&self) -> AuthResult<UserCredential> {
        let user = match self.current_user() {
            Some(existing) => existing,
            None => User::anonymous(random_uid(ANONYMOUS_UID_PREFIX)),
        };
        self.inner.persist_and_notify(user.clone()).await;
        Ok(UserCredential { user })
    }

    /// Signs in with a caller-supplied token. The uid is derived
    /// deterministically from the token, so the same token always lands on
    /// the same identity, and the user is marked non-anonymous.
    pub async fn sign_in_with_custom_token(&self, token: &str) -> AuthResult<UserCredential> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken(
                "A custom token must be provided".to_string(),
            ));
        }
        let user = User::from_token_uid(token_derived_uid(token));
        self.inner.persist_and_notify(user.clone()).await;
        Ok(UserCredential { user })
    }
}

impl AuthInner {
    fn load_persisted(&self) -> Option<User> {
        match self.backend.get_item(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    log::warn!("failed to parse cached auth user: {err}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                log::warn!("auth storage backend unavailable: {err}");
                None
            }
        }
    }

    /// Persists the identity, then queues a delivery to every listener. The
    /// backend write lands before any listener observes the transition; a
    /// failing backend only costs durability.
    async fn persist_and_notify(&self, user: User) {
        {
            let mut state = self.state.lock().unwrap();
            state.current = Some(user.clone());
        }
        match serde_json::to_string(&user) {
            Ok(raw) => {
                if let Err(err) = self.backend.set_item(STORAGE_KEY, &raw) {
                    log::warn!("failed to persist auth user: {err}");
                }
            }
            Err(err) => log::warn!("failed to serialize auth user: {err}"),
        }

        {
            let mut state = self.state.lock().unwrap();
            let targets: Vec<u64> = state.listeners.keys().copied().collect();
            if !targets.is_empty() {
                state.pending.push_back(PendingDelivery {
                    targets,
                    user: Some(user),
                });
            }
        }
        self.drain().await;
    }

    fn pop_pending(&self) -> Option<PendingDelivery> {
        self.state.lock().unwrap().pending.pop_front()
    }

    fn callback(&self, id: u64) -> Option<AuthStateCallback> {
        self.state.lock().unwrap().listeners.get(&id).cloned()
    }

    /// Delivers queued auth-state events in enqueue order, resolving each
    /// target against the live listener set so an unsubscribed callback's
    /// queued deliveries become no-ops.
    async fn drain(&self) {
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }
        tokio::task::yield_now().await;
        while let Some(delivery) = self.pop_pending() {
            for target in &delivery.targets {
                let Some(callback) = self.callback(*target) else {
                    continue;
                };
                let outcome =
                    std::panic::catch_unwind(AssertUnwindSafe(|| callback(delivery.user.as_ref())));
                if outcome.is_err() {
                    log::error!("auth state listener panicked");
                }
            }
        }
        self.draining.store(false, Ordering::SeqCst);
    }
}

/// Disposer for an auth-state subscription. `unsubscribe` is idempotent; an
/// unsubscribed listener receives nothing further, including deliveries that
/// were already queued.
pub struct AuthListenerRegistration {
    inner: Arc<AuthInner>,
    id: u64,
    removed: AtomicBool,
}

impl AuthListenerRegistration {
    pub fn unsubscribe(&self) {
        if self.removed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.state.lock().unwrap().listeners.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;

    fn test_auth() -> Auth {
        Auth::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn anonymous_sign_in_is_stable_within_a_session() {
        let auth = test_auth();
        let first = auth.sign_in_anonymously().await.unwrap();
        let second = auth.sign_in_anonymously().await.unwrap();
        assert_eq!(first.user.uid, second.user.uid);
        assert!(first.user.is_anonymous);
    }

    #[tokio::test]
    async fn anonymous_identity_survives_across_instances() {
        let backend = Arc::new(MemoryStorage::new());
        let first = Auth::new(backend.clone() as Arc<dyn KeyValueStore>);
        let original = first.sign_in_anonymously().await.unwrap();

        let second = Auth::new(backend as Arc<dyn KeyValueStore>);
        let returning = second.sign_in_anonymously().await.unwrap();
        assert_eq!(original.user.uid, returning.user.uid);
    }

    #[tokio::test]
    async fn custom_token_uid_is_deterministic_across_instances() {
        let first = test_auth();
        let second = test_auth();

        let left = first.sign_in_with_custom_token("abc").await.unwrap();
        let right = second.sign_in_with_custom_token("abc").await.unwrap();
        assert_eq!(left.user.uid, right.user.uid);
        assert!(!left.user.is_anonymous);

        let other = first.sign_in_with_custom_token("xyz").await.unwrap();
        assert_ne!(other.user.uid, left.user.uid);
    }

    #[tokio::test]
    async fn empty_custom_token_is_rejected() {
        let auth = test_auth();
        let err = auth.sign_in_with_custom_token("").await.unwrap_err();
        assert_eq!(err.code_str(), "auth/invalid-custom-token");
        assert_eq!(auth.current_user(), None);
    }

    #[tokio::test]
    async fn listener_receives_initial_state_and_transitions_in_order() {
        let auth = test_auth();
        let events: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = events.clone();

        let registration = auth
            .on_auth_state_changed(move |user| {
                captured
                    .lock()
                    .unwrap()
                    .push(user.map(|user| user.uid.clone()));
            })
            .await;

        let credential = auth.sign_in_anonymously().await.unwrap();

        {
            let events = events.lock().unwrap();
            assert_eq!(
                events.as_slice(),
                &[None, Some(credential.user.uid.clone())]
            );
        }
        registration.unsubscribe();
    }

    #[tokio::test]
    async fn unsubscribed_listener_receives_nothing_further() {
        let auth = test_auth();
        let events: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = events.clone();

        let registration = auth
            .on_auth_state_changed(move |user| {
                captured
                    .lock()
                    .unwrap()
                    .push(user.map(|user| user.uid.clone()));
            })
            .await;
        registration.unsubscribe();
        registration.unsubscribe();

        auth.sign_in_anonymously().await.unwrap();
        assert_eq!(events.lock().unwrap().len(), 1);
    }
}
