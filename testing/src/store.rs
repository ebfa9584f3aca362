//! In-memory store shared between handlers and test assertions.
//!
//! Handlers under test write whatever they produce (projections, received
//! events) into an [`InMemoryTestStore`]; tests then read it back by type.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

type Entry = Arc<dyn Any + Send + Sync>;

/// Append-only, type-indexed record of values.
///
/// Clones share the same storage.
///
/// # Example
///
/// ```
/// use courier_testing::InMemoryTestStore;
///
/// let store = InMemoryTestStore::new();
/// store.add(7_u32);
/// store.add("seven");
///
/// assert_eq!(store.query_for::<u32>(), vec![7]);
/// assert_eq!(store.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryTestStore {
    entries: Arc<RwLock<Vec<Entry>>>,
}

impl InMemoryTestStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value
    pub fn add<T: Any + Send + Sync>(&self, value: T) {
        self.entries.write().unwrap().push(Arc::new(value));
    }

    /// Every stored value of type `T`, in insertion order
    #[must_use]
    pub fn query_for<T: Any + Clone>(&self) -> Vec<T> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter_map(|entry| entry.downcast_ref::<T>())
            .cloned()
            .collect()
    }

    /// The last stored value of type `T` matching `predicate`
    #[must_use]
    pub fn find<T, P>(&self, predicate: P) -> Option<T>
    where
        T: Any + Clone,
        P: Fn(&T) -> bool,
    {
        self.entries
            .read()
            .unwrap()
            .iter()
            .rev()
            .filter_map(|entry| entry.downcast_ref::<T>())
            .find(|value| predicate(value))
            .cloned()
    }

    /// Number of stored values of every type
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether nothing was stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Remove everything (for test isolation)
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}

impl fmt::Debug for InMemoryTestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTestStore")
            .field("len", &self.len())
            .finish()
    }
}
