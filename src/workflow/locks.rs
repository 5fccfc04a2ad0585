use crate::shared::InstanceId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Per-instance mutual exclusion for read-modify-write transitions within one
/// process. Threads queue here instead of polling the store's own lock.
///
/// Slots are created on demand and dropped once no caller holds or waits on
/// them, so the table only grows with concurrently touched instances. The
/// slots guard no data, so a panic inside one leaves nothing to repair and
/// poisoning is ignored.
#[derive(Debug, Default)]
pub struct InstanceLocks {
    slots: Mutex<HashMap<InstanceId, Arc<Mutex<()>>>>,
}

impl InstanceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock<R>(&self, id: InstanceId, f: impl FnOnce() -> R) -> R {
        let slot = Arc::clone(self.table().entry(id).or_default());
        let release = SlotRelease {
            locks: self,
            id,
            slot,
        };
        let _guard = release.slot.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    pub fn active_slots(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<InstanceId, Arc<Mutex<()>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops the table entry on every exit path, unwinding included.
struct SlotRelease<'a> {
    locks: &'a InstanceLocks,
    id: InstanceId,
    slot: Arc<Mutex<()>>,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.table();
        // One reference lives in the table, one is ours.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.id);
        }
    }
}
