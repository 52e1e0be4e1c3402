use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::firestore::snapshot::QuerySnapshot;

pub(crate) type SnapshotCallback = Arc<dyn Fn(&QuerySnapshot) + Send + Sync>;

struct PendingDelivery {
    path: String,
    targets: Vec<u64>,
    snapshot: QuerySnapshot,
}

#[derive(Default)]
struct RegistryState {
    // Keyed by canonical collection path. An entry exists only while at least
    // one listener is registered on that path.
    listeners: HashMap<String, HashMap<u64, SnapshotCallback>>,
    pending: VecDeque<PendingDelivery>,
}

/// Owns every snapshot subscription plus the FIFO queue of deliveries still
/// waiting to fire. Deliveries resolve their callbacks against the live
/// registry at delivery time, so detaching a listener silently voids anything
/// already queued for it.
pub(crate) struct ListenerRegistry {
    state: Mutex<RegistryState>,
    next_id: AtomicU64,
    draining: AtomicBool,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            next_id: AtomicU64::new(1),
            draining: AtomicBool::new(false),
        }
    }

    pub(crate) fn register(&self, path: &str, callback: SnapshotCallback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state
            .listeners
            .entry(path.to_string())
            .or_default()
            .insert(id, callback);
        id
    }

    pub(crate) fn remove(&self, path: &str, id: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(callbacks) = state.listeners.get_mut(path) {
            callbacks.remove(&id);
            if callbacks.is_empty() {
                state.listeners.remove(path);
            }
        }
    }

    /// Ids of every listener currently registered on the path.
    pub(crate) fn targets(&self, path: &str) -> Vec<u64> {
        let state = self.state.lock().unwrap();
        state
            .listeners
            .get(path)
            .map(|callbacks| callbacks.keys().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn enqueue(&self, path: String, targets: Vec<u64>, snapshot: QuerySnapshot) {
        if targets.is_empty() {
            return;
        }
        let mut state = self.state.lock().unwrap();
        state.pending.push_back(PendingDelivery {
            path,
            targets,
            snapshot,
        });
    }

    fn pop_pending(&self) -> Option<PendingDelivery> {
        self.state.lock().unwrap().pending.pop_front()
    }

    fn callback(&self, path: &str, id: u64) -> Option<SnapshotCallback> {
        let state = self.state.lock().unwrap();
        state
            .listeners
            .get(path)
            .and_then(|callbacks| callbacks.get(&id))
            .cloned()
    }

    /// Delivers queued snapshots in enqueue order. Runs after the triggering
    /// operation has finished its own work; a nested call while a drain is in
    /// progress returns immediately and leaves its entries for the outer loop.
    pub(crate) async fn drain(&self) {
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }
        tokio::task::yield_now().await;
        while let Some(delivery) = self.pop_pending() {
            for target in &delivery.targets {
                let Some(callback) = self.callback(&delivery.path, *target) else {
                    continue;
                };
                let outcome =
                    std::panic::catch_unwind(AssertUnwindSafe(|| callback(&delivery.snapshot)));
                if outcome.is_err() {
                    log::error!("snapshot listener for {} panicked", delivery.path);
                }
            }
        }
        self.draining.store(false, Ordering::SeqCst);
    }
}

/// Disposer for a snapshot subscription. `detach` is idempotent; a detached
/// listener receives no further deliveries, including ones already queued.
pub struct ListenerRegistration {
    registry: Arc<ListenerRegistry>,
    path: String,
    id: u64,
    detached: AtomicBool,
}

impl ListenerRegistration {
    pub(crate) fn new(registry: Arc<ListenerRegistry>, path: String, id: u64) -> Self {
        Self {
            registry,
            path,
            id,
            detached: AtomicBool::new(false),
        }
    }

    pub fn detach(&self) {
        if self.detached.swap(true, Ordering::SeqCst) {
            return;
        }
        self.registry.remove(&self.path, self.id);
    }
}
