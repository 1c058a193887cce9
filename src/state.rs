use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::data::model::Dataset;

/// Cookie carrying the caller's session id.
pub const SESSION_COOKIE: &str = "file_analyzer_session";

/// Sessions kept when no capacity is configured.
pub const DEFAULT_MAX_SESSIONS: usize = 64;

// ---------------------------------------------------------------------------
// Session store
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Slot {
    dataset: Arc<Dataset>,
    last_used: AtomicU64,
}

/// One dataset slot per session, at most `capacity` of them.
///
/// An upload replaces the slot's `Arc` in one step; readers clone the `Arc`
/// and keep working on that snapshot, so a computation always sees exactly
/// one dataset even when a new upload lands mid-request. Installing a new
/// session into a full store evicts the least recently used one.
#[derive(Debug)]
pub struct SessionStore {
    slots: RwLock<HashMap<String, Slot>>,
    clock: AtomicU64,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Install `dataset` for `session`, returning the one it replaced.
    pub fn install(&self, session: &str, dataset: Dataset) -> Option<Arc<Dataset>> {
        let slot = Slot {
            dataset: Arc::new(dataset),
            last_used: AtomicU64::new(self.tick()),
        };
        let mut slots = self.slots.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !slots.contains_key(session) && slots.len() >= self.capacity {
            let oldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_used.load(Ordering::Relaxed))
                .map(|(id, _)| id.clone());
            if let Some(id) = oldest {
                slots.remove(&id);
                log::info!("session store full ({}); evicted least recently used session", self.capacity);
            }
        }
        slots.insert(session.to_string(), slot).map(|old| old.dataset)
    }

    /// Snapshot of the session's current dataset.
    pub fn get(&self, session: &str) -> Option<Arc<Dataset>> {
        let slots = self.slots.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = slots.get(session)?;
        slot.last_used.store(self.tick(), Ordering::Relaxed);
        Some(Arc::clone(&slot.dataset))
    }

    pub fn len(&self) -> usize {
        self.slots.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
