//! # Generic In-Memory Store
//!
//! Thread-safe, cloneable map from `Uuid` to records. Operations are
//! synchronous: the lock is `parking_lot`, never held across `.await`, and
//! does not poison when a writer panics.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// Snapshot of all records, in no particular order.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(id)?;
        f(entry);
        Some(entry.clone())
    }

    /// Insert `value` after removing every record matching `displaces`, all
    /// under one write lock. Returns the removed records.
    pub fn replace_where(&self, id: Uuid, value: T, displaces: impl Fn(&T) -> bool) -> Vec<T> {
        let mut guard = self.data.write();
        let stale: Vec<Uuid> = guard
            .iter()
            .filter(|(_, v)| displaces(v))
            .map(|(k, _)| *k)
            .collect();
        let removed = stale.iter().filter_map(|k| guard.remove(k)).collect();
        guard.insert(id, value);
        removed
    }

    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}
