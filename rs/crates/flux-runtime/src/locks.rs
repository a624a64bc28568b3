//! Per-instance exclusive tokens.
//!
//! Each `(kind, id)` maps to a fair async mutex: waiters are served in the
//! order they called `acquire`, which is the order actions were accepted.
//! The outer map lock is only held to look up or insert a slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::component::Identity;

/// Held for the duration of Mount/Handle/Render on one instance.
pub type Token = OwnedMutexGuard<()>;

#[derive(Default)]
pub struct InstanceLocks {
    slots: Mutex<HashMap<Identity, Arc<AsyncMutex<()>>>>,
}

impl InstanceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, identity: &Identity) -> Token {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(identity.clone()).or_default())
        };
        slot.lock_owned().await
    }

    /// Drop slots nobody holds or waits on. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        before - slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
