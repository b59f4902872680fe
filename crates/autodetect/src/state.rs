//! Shared capability state.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use opkit_core::CapabilityKey;

/// Process-wide store, created on first use.
static GLOBAL_STATE: OnceLock<Arc<SharedStateStore>> = OnceLock::new();

/// Concurrently readable map from capability key to availability.
///
/// Unknown keys read as unavailable. A poisoned lock is recovered, so a
/// panicking writer never takes readers down with it.
#[derive(Debug, Default)]
pub struct SharedStateStore {
    states: RwLock<HashMap<CapabilityKey, bool>>,
}

impl SharedStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lazily created process-wide store.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL_STATE.get_or_init(|| Arc::new(Self::new())))
    }

    /// Availability of `key`; `false` when never set.
    #[must_use]
    pub fn get(&self, key: &CapabilityKey) -> bool {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        states.get(key).copied().unwrap_or(false)
    }

    /// Record availability of `key`.
    pub fn set(&self, key: CapabilityKey, available: bool) {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        states.insert(key, available);
    }

    /// Copy of every recorded key.
    #[must_use]
    pub fn snapshot(&self) -> im::HashMap<CapabilityKey, bool> {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        states.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}
