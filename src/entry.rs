//! Immutable key-value records shared between the map, its views, and callers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// An immutable key-value record.
///
/// Both halves live behind `Rc`, so the live map, snapshot views, and values
/// handed back to callers all share one allocation. A value update never
/// mutates a record in place; the map allocates a fresh record and swaps the
/// slot, which keeps records held by older views valid forever.
pub struct RecordEntry<K, V> {
    key: Rc<K>,
    value: Rc<V>,
}

impl<K, V> RecordEntry<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self {
            key: Rc::new(key),
            value: Rc::new(value),
        }
    }

    /// Build a record around already-shared halves. Used on value updates to
    /// reuse the stored key allocation.
    pub(crate) fn from_shared(key: Rc<K>, value: Rc<V>) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Shared handle to the key half.
    pub fn shared_key(&self) -> Rc<K> {
        Rc::clone(&self.key)
    }

    /// Shared handle to the value half.
    pub fn shared_value(&self) -> Rc<V> {
        Rc::clone(&self.value)
    }
}

// Manual impl: cloning a record is two `Rc` bumps, so no `K: Clone`/`V: Clone`
// bounds (a derive would add them).
impl<K, V> Clone for RecordEntry<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: Rc::clone(&self.key),
            value: Rc::clone(&self.value),
        }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for RecordEntry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key() && self.value() == other.value()
    }
}

impl<K: Eq, V: Eq> Eq for RecordEntry<K, V> {}

impl<K: Hash, V: Hash> Hash for RecordEntry<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.value.hash(state);
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for RecordEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RecordEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}={:?}", self.key, self.value)
    }
}
