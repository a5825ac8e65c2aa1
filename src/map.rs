//! RecordMap: the insertion-ordered map built on the dual-array core.

use std::borrow::Borrow;
use std::cell::Cell;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;

use crate::entry::RecordEntry;
use crate::table::{self, EntrySlot, Probe, Snapshot};
use crate::views::{EntryIter, EntrySet, KeySet, Values};

/// Returned by both `remove` forms: deletion is categorically unsupported.
///
/// The offset index has no tombstones, so removing a record would break every
/// probe sequence passing over its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveError {
    Unsupported,
}

impl fmt::Display for RemoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RecordMap does not support removal")
    }
}

impl std::error::Error for RemoveError {}

// A fresh map has room for exactly one record; `clear` resets to a mid-size
// table instead. Long-standing asymmetry, kept as-is.
const NEW_INDEX_SLOTS: usize = 2;
const NEW_ENTRY_SLOTS: usize = 1;
const CLEARED_INDEX_SLOTS: usize = 16;
const CLEARED_ENTRY_SLOTS: usize = 8;

/// An insertion-ordered map of immutable key-value records.
///
/// Two coupled arrays: a dense entry store holding `Rc<RecordEntry<K, V>>`
/// in first-insertion order, and a power-of-two offset index probed linearly
/// from `hash(key)`. Both grow together; the index is rebuilt from scratch on
/// growth. There is no deletion.
///
/// Lookups hand back shared `Rc` handles rather than borrows, so results,
/// views, and iterators are not lifetime-tied to the map and follow the
/// snapshot aliasing rules documented on [`crate::views`].
pub struct RecordMap<K, V, S = RandomState> {
    size: usize,
    offsets: Rc<[Cell<usize>]>,
    entries: Rc<[EntrySlot<K, V>]>,
    hasher: S,
}

impl<K, V> RecordMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V> Default for RecordMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> RecordMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            size: 0,
            offsets: table::new_offsets(NEW_INDEX_SLOTS),
            entries: table::new_entries(NEW_ENTRY_SLOTS),
            hasher,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn hash_key<Q>(&self, key: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(key)
    }

    fn probe_key<Q>(&self, key: &Q) -> Probe
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        table::probe(&self.offsets, &self.entries, self.hash_key(key), key)
    }

    fn entry_at(&self, offset: usize) -> Rc<RecordEntry<K, V>> {
        table::live_entry(&self.entries[offset])
    }

    /// Overwrite the record at `offset`. The previous record stays alive
    /// through any snapshot still holding it.
    fn store(&self, offset: usize, entry: RecordEntry<K, V>) {
        *self.entries[offset].borrow_mut() = Some(Rc::new(entry));
    }

    /// Append a record at the end of the entry store and publish its offset
    /// in the claimed index slot. The caller has checked capacity.
    fn append(&mut self, index: usize, entry: RecordEntry<K, V>) {
        self.store(self.size, entry);
        self.offsets[index].set(self.size + 1);
        self.size += 1;
    }

    fn is_full(&self) -> bool {
        self.size == self.entries.len()
    }

    /// Double both arrays and rebuild the offset index from scratch,
    /// relocating records in stored order. Callers restart their probe
    /// afterwards; no pre-growth probe state survives a rehash.
    fn grow(&mut self) {
        let offsets = table::new_offsets(self.offsets.len() << 1);
        let mask = offsets.len() - 1;
        for offset in 0..self.size {
            let entry = self.entry_at(offset);
            let mut index = (self.hash_key(entry.key()) as usize) & mask;
            while offsets[index].get() != table::EMPTY {
                index = (index + 1) & mask;
            }
            offsets[index].set(offset + 1);
        }
        let entries = table::new_entries(self.entries.len() << 1);
        for (fresh, old) in entries.iter().zip(self.entries.iter()) {
            *fresh.borrow_mut() = old.borrow().clone();
        }
        self.offsets = offsets;
        self.entries = entries;
    }

    fn snapshot(&self) -> Snapshot<K, V, S> {
        Snapshot {
            size: self.size,
            offsets: Rc::clone(&self.offsets),
            entries: Rc::clone(&self.entries),
            hasher: self.hasher.clone(),
        }
    }

    /// Insert or update, returning the previous value when the key was
    /// already present.
    pub fn put(&mut self, key: K, value: V) -> Option<Rc<V>> {
        loop {
            match self.probe_key(&key) {
                Probe::Occupied(offset) => {
                    let previous = self.entry_at(offset).shared_value();
                    self.store(offset, RecordEntry::new(key, value));
                    return Some(previous);
                }
                Probe::Vacant(index) => {
                    if self.is_full() {
                        self.grow();
                        continue;
                    }
                    self.append(index, RecordEntry::new(key, value));
                    return None;
                }
            }
        }
    }

    /// Insert only when the key is absent; returns the current value when it
    /// is not.
    pub fn put_if_absent(&mut self, key: K, value: V) -> Option<Rc<V>> {
        loop {
            match self.probe_key(&key) {
                Probe::Occupied(offset) => {
                    return Some(self.entry_at(offset).shared_value());
                }
                Probe::Vacant(index) => {
                    if self.is_full() {
                        self.grow();
                        continue;
                    }
                    self.append(index, RecordEntry::new(key, value));
                    return None;
                }
            }
        }
    }

    /// Return the current value for `key`, producing and inserting one only
    /// when the key is absent. On a hit `produce` is not invoked.
    pub fn compute_if_absent<F>(&mut self, key: K, produce: F) -> Rc<V>
    where
        F: FnOnce(&K) -> V,
    {
        loop {
            match self.probe_key(&key) {
                Probe::Occupied(offset) => {
                    return self.entry_at(offset).shared_value();
                }
                Probe::Vacant(index) => {
                    if self.is_full() {
                        self.grow();
                        continue;
                    }
                    let value = produce(&key);
                    let entry = RecordEntry::new(key, value);
                    let fresh = entry.shared_value();
                    self.append(index, entry);
                    return fresh;
                }
            }
        }
    }

    /// Remap the value for `key`, inserting when absent. `remap` receives the
    /// current value, or `None` when the key is absent, and its result
    /// becomes the stored value.
    pub fn compute<F>(&mut self, key: K, remap: F) -> Rc<V>
    where
        F: FnOnce(&K, Option<&V>) -> V,
    {
        loop {
            match self.probe_key(&key) {
                Probe::Occupied(offset) => {
                    let current = self.entry_at(offset);
                    let value = remap(&key, Some(current.value()));
                    let entry = RecordEntry::new(key, value);
                    let fresh = entry.shared_value();
                    self.store(offset, entry);
                    return fresh;
                }
                Probe::Vacant(index) => {
                    if self.is_full() {
                        self.grow();
                        continue;
                    }
                    let value = remap(&key, None);
                    let entry = RecordEntry::new(key, value);
                    let fresh = entry.shared_value();
                    self.append(index, entry);
                    return fresh;
                }
            }
        }
    }

    /// Remap the value for `key` only when present; absence is a no-op.
    pub fn compute_if_present<Q, F>(&mut self, key: &Q, remap: F) -> Option<Rc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&K, &V) -> V,
    {
        match self.probe_key(key) {
            Probe::Vacant(_) => None,
            Probe::Occupied(offset) => {
                let current = self.entry_at(offset);
                let value = remap(current.key(), current.value());
                let entry = RecordEntry::from_shared(current.shared_key(), Rc::new(value));
                let fresh = entry.shared_value();
                self.store(offset, entry);
                Some(fresh)
            }
        }
    }

    /// Insert `value` when the key is absent; otherwise store
    /// `combine(current, value)`. Returns the stored value either way.
    pub fn merge<F>(&mut self, key: K, value: V, combine: F) -> Rc<V>
    where
        F: FnOnce(&V, &V) -> V,
    {
        loop {
            match self.probe_key(&key) {
                Probe::Occupied(offset) => {
                    let current = self.entry_at(offset);
                    let merged = combine(current.value(), &value);
                    let entry = RecordEntry::new(key, merged);
                    let fresh = entry.shared_value();
                    self.store(offset, entry);
                    return fresh;
                }
                Probe::Vacant(index) => {
                    if self.is_full() {
                        self.grow();
                        continue;
                    }
                    let entry = RecordEntry::new(key, value);
                    let fresh = entry.shared_value();
                    self.append(index, entry);
                    return fresh;
                }
            }
        }
    }

    /// Replace unconditionally when present, returning the previous value;
    /// absence is a no-op.
    pub fn replace<Q>(&mut self, key: &Q, value: V) -> Option<Rc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.probe_key(key) {
            Probe::Vacant(_) => None,
            Probe::Occupied(offset) => {
                let current = self.entry_at(offset);
                self.store(
                    offset,
                    RecordEntry::from_shared(current.shared_key(), Rc::new(value)),
                );
                Some(current.shared_value())
            }
        }
    }

    /// Replace only when the current value equals `expected`; reports whether
    /// a replacement happened.
    pub fn replace_exact<Q>(&mut self, key: &Q, expected: &V, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        match self.probe_key(key) {
            Probe::Vacant(_) => false,
            Probe::Occupied(offset) => {
                let current = self.entry_at(offset);
                if current.value() != expected {
                    return false;
                }
                self.store(
                    offset,
                    RecordEntry::from_shared(current.shared_key(), Rc::new(value)),
                );
                true
            }
        }
    }

    /// Replace every record's value with `transform(key, value)`, in
    /// insertion order.
    pub fn replace_all<F>(&mut self, mut transform: F)
    where
        F: FnMut(&K, &V) -> V,
    {
        for offset in 0..self.size {
            let current = self.entry_at(offset);
            let value = transform(current.key(), current.value());
            self.store(
                offset,
                RecordEntry::from_shared(current.shared_key(), Rc::new(value)),
            );
        }
    }

    /// Apply `put` once per pair, in the source's iteration order.
    pub fn put_all<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in pairs {
            self.put(key, value);
        }
    }

    /// Discard both arrays and reset to the fixed post-clear capacity.
    /// Outstanding views and iterators keep the old arrays alive and are
    /// unaffected.
    pub fn clear(&mut self) {
        self.size = 0;
        self.offsets = table::new_offsets(CLEARED_INDEX_SLOTS);
        self.entries = table::new_entries(CLEARED_ENTRY_SLOTS);
    }

    pub fn get<Q>(&self, key: &Q) -> Option<Rc<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.probe_key(key) {
            Probe::Occupied(offset) => Some(self.entry_at(offset).shared_value()),
            Probe::Vacant(_) => None,
        }
    }

    /// The stored value for `key`, or `default` (freshly shared) when absent.
    pub fn get_or_default<Q>(&self, key: &Q, default: V) -> Rc<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(key).unwrap_or_else(|| Rc::new(default))
    }

    /// The whole record for `key`.
    pub fn get_entry<Q>(&self, key: &Q) -> Option<Rc<RecordEntry<K, V>>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.probe_key(key) {
            Probe::Occupied(offset) => Some(self.entry_at(offset)),
            Probe::Vacant(_) => None,
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        matches!(self.probe_key(key), Probe::Occupied(_))
    }

    /// Linear scan of the live records; the index has no value support, so
    /// this is O(size).
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        (0..self.size).any(|offset| *self.entry_at(offset).value() == *value)
    }

    /// Always fails: see [`RemoveError`]. State is never touched.
    pub fn remove<Q>(&mut self, _key: &Q) -> Result<Option<Rc<V>>, RemoveError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        Err(RemoveError::Unsupported)
    }

    /// Always fails: see [`RemoveError`]. State is never touched.
    pub fn remove_exact<Q>(&mut self, _key: &Q, _value: &V) -> Result<bool, RemoveError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        Err(RemoveError::Unsupported)
    }

    /// Visit `(key, value)` pairs in insertion order.
    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(&K, &V),
    {
        for offset in 0..self.size {
            let entry = self.entry_at(offset);
            action(entry.key(), entry.value());
        }
    }

    /// Visit whole records in insertion order.
    pub fn for_each_entry<F>(&self, mut action: F)
    where
        F: FnMut(&Rc<RecordEntry<K, V>>),
    {
        for offset in 0..self.size {
            action(&self.entry_at(offset));
        }
    }

    /// Iterator over the records present right now; later growth of the map
    /// does not affect it.
    pub fn iter(&self) -> EntryIter<K, V> {
        EntryIter::new(self.size, Rc::clone(&self.entries))
    }

    /// Snapshot view of the keys.
    pub fn key_set(&self) -> KeySet<K, V, S> {
        KeySet::new(self.snapshot())
    }

    /// Snapshot view of the values, with positional access.
    pub fn values(&self) -> Values<K, V, S> {
        Values::new(self.snapshot())
    }

    /// Snapshot view of the records.
    pub fn entry_set(&self) -> EntrySet<K, V, S> {
        EntrySet::new(self.snapshot())
    }

    /// Order-independent digest of the associations: the wrapping sum of
    /// `hash(key) ^ hash(value)` over all records, under this map's hasher.
    ///
    /// Two maps agree iff they hold the same associations and were built
    /// over equal hashers (share one via `with_hasher`); the default
    /// `RandomState` is randomized per instance.
    pub fn map_hash(&self) -> u64
    where
        V: Hash,
    {
        (0..self.size).fold(0u64, |acc, offset| {
            let entry = self.entry_at(offset);
            acc.wrapping_add(self.hash_key(entry.key()) ^ self.hasher.hash_one(entry.value()))
        })
    }
}

impl<'a, K, V, S> IntoIterator for &'a RecordMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    type Item = Rc<RecordEntry<K, V>>;
    type IntoIter = EntryIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> Extend<(K, V)> for RecordMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, pairs: I) {
        self.put_all(pairs);
    }
}

impl<K, V, S> FromIterator<(K, V)> for RecordMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.put_all(pairs);
        map
    }
}

/// Structural equality: same key-to-value associations, order ignored.
impl<K, V, S, S2> PartialEq<RecordMap<K, V, S2>> for RecordMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher + Clone + Default,
    S2: BuildHasher + Clone + Default,
{
    fn eq(&self, other: &RecordMap<K, V, S2>) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|entry| other.get(entry.key()).is_some_and(|v| *v == *entry.value()))
    }
}

impl<K, V, S> Eq for RecordMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher + Clone + Default,
{
}

impl<K, V, S, S2> PartialEq<HashMap<K, V, S2>> for RecordMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher + Clone + Default,
    S2: BuildHasher,
{
    fn eq(&self, other: &HashMap<K, V, S2>) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|entry| other.get(entry.key()).is_some_and(|v| v == entry.value()))
    }
}

impl<K, V, S, S2> PartialEq<RecordMap<K, V, S2>> for HashMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
    S2: BuildHasher + Clone + Default,
{
    fn eq(&self, other: &RecordMap<K, V, S2>) -> bool {
        other == self
    }
}

/// Renders `{k1=v1, k2=v2, ...}` in insertion order.
impl<K, V, S> fmt::Display for RecordMap<K, V, S>
where
    K: Eq + Hash + fmt::Display,
    V: fmt::Display,
    S: BuildHasher + Clone + Default,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, entry) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{entry}")?;
        }
        f.write_str("}")
    }
}

impl<K, V, S> fmt::Debug for RecordMap<K, V, S>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher + Clone + Default,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|e| (e.shared_key(), e.shared_value())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: a fresh map has room for exactly one record, while `clear`
    /// resets to the larger fixed capacity. The asymmetry is intentional.
    #[test]
    fn initial_and_cleared_capacities_differ() {
        let mut m: RecordMap<String, i32> = RecordMap::new();
        assert_eq!(m.entries.len(), 1);
        assert_eq!(m.offsets.len(), 2);

        m.put("a".to_string(), 1);
        m.clear();
        assert_eq!(m.len(), 0);
        assert_eq!(m.entries.len(), 8);
        assert_eq!(m.offsets.len(), 16);
    }

    /// Invariant: the index is always a power of two, strictly larger than
    /// the live size, and exactly double the entry-store capacity.
    #[test]
    fn index_stays_half_empty_across_growth() {
        let mut m: RecordMap<u32, u32> = RecordMap::new();
        for i in 0..100 {
            m.put(i, i);
            assert!(m.offsets.len().is_power_of_two());
            assert!(m.offsets.len() > m.len());
            assert_eq!(m.offsets.len(), m.entries.len() * 2);
        }
    }

    /// Invariant: every live record is reachable through exactly one index
    /// slot, and that slot stores its entry-store offset plus one.
    #[test]
    fn index_slots_link_to_unique_offsets() {
        let mut m: RecordMap<u32, u32> = RecordMap::new();
        for i in 0..50 {
            m.put(i, i * 10);
        }
        let mut linked: Vec<usize> = m
            .offsets
            .iter()
            .map(Cell::get)
            .filter(|&stored| stored != table::EMPTY)
            .map(|stored| stored - 1)
            .collect();
        linked.sort_unstable();
        let expected: Vec<usize> = (0..50).collect();
        assert_eq!(linked, expected);
    }

    /// Invariant: growth allocates new arrays; pre-growth snapshots keep the
    /// old pair alive and untouched.
    #[test]
    fn growth_swaps_arrays() {
        let mut m: RecordMap<u32, u32> = RecordMap::new();
        m.put(1, 1);
        let old_entries = Rc::clone(&m.entries);
        let old_offsets = Rc::clone(&m.offsets);
        m.put(2, 2); // forces a rehash
        assert!(!Rc::ptr_eq(&old_entries, &m.entries));
        assert!(!Rc::ptr_eq(&old_offsets, &m.offsets));
        assert_eq!(table::live_entry(&old_entries[0]).value(), &1);
    }

    /// Invariant: an update reuses the stored key allocation when the
    /// operation has no owned key to store.
    #[test]
    fn replace_reuses_stored_key() {
        let mut m: RecordMap<String, i32> = RecordMap::new();
        m.put("k".to_string(), 1);
        let before = m.get_entry("k").unwrap().shared_key();
        m.replace("k", 2);
        let after = m.get_entry("k").unwrap().shared_key();
        assert!(Rc::ptr_eq(&before, &after));
    }
}
