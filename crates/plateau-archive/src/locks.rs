//! Per-archive write locks.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Map from archive file name to a mutex serializing work on that name.
///
/// A slot lives only while someone holds or waits on it: [`KeyedLocks::with`]
/// evicts the slot on the way out when no other caller has a handle to it.
#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    slots: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `name`.
    pub fn with<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let slot = self.slot(name);
        let out = {
            let _held = slot.lock();
            f()
        };
        drop(slot);
        self.evict(name);
        out
    }

    fn slot(&self, name: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.slots
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Drop the slot for `name` if only the map still refers to it. Handing
    /// out a slot and removing one both run under the shard lock, so a
    /// caller that got a handle keeps the count above one.
    fn evict(&self, name: &str) {
        self.slots
            .remove_if(name, |_, slot| Arc::strong_count(slot) == 1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
