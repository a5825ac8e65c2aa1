//! Dual-array core: the dense entry store, the power-of-two offset index,
//! and the snapshot handle that views and iterators are built on.
//!
//! The two arrays are only ever allocated and rebuilt together; nothing
//! outside this module and `map` writes to them. Slots use `Cell`/`RefCell`
//! because snapshots alias the live arrays by `Rc`: an in-place value
//! replacement must stay visible through a previously captured snapshot,
//! while a rehash swaps in fresh arrays and leaves old snapshots untouched.

use std::borrow::Borrow;
use std::cell::{Cell, RefCell};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;

use crate::entry::RecordEntry;
use crate::views::EntryIter;

/// One entry-store slot. `None` is reserved capacity; slots below the live
/// size always hold a record.
pub(crate) type EntrySlot<K, V> = RefCell<Option<Rc<RecordEntry<K, V>>>>;

/// Empty marker in the offset index; occupied slots store `offset + 1`.
pub(crate) const EMPTY: usize = 0;

pub(crate) fn new_offsets(len: usize) -> Rc<[Cell<usize>]> {
    debug_assert!(len.is_power_of_two());
    std::iter::repeat_with(|| Cell::new(EMPTY)).take(len).collect()
}

pub(crate) fn new_entries<K, V>(len: usize) -> Rc<[EntrySlot<K, V>]> {
    std::iter::repeat_with(|| RefCell::new(None)).take(len).collect()
}

/// Read the record at a slot known to be live. The borrow is transient; the
/// returned `Rc` stays valid even if the slot is overwritten afterwards.
pub(crate) fn live_entry<K, V>(slot: &EntrySlot<K, V>) -> Rc<RecordEntry<K, V>> {
    slot.borrow().clone().expect("live slot holds a record")
}

/// Outcome of walking a probe sequence for one key.
pub(crate) enum Probe {
    /// First empty index slot on the sequence; the key is absent and this
    /// slot is where an insertion would publish its offset.
    Vacant(usize),
    /// Entry-store offset of the record whose key matched.
    Occupied(usize),
}

/// Linear probe over `offsets` for `key`, reading records out of `entries`.
///
/// Colliding initial indices form contiguous runs (clustering); that is a
/// known property of this scheme and left as-is. Termination holds because
/// the index is never more than half full: the entry store's capacity is
/// always half the index length, and there is no deletion, so every probe
/// sequence ends at a matching record or an empty slot.
pub(crate) fn probe<K, V, Q>(
    offsets: &[Cell<usize>],
    entries: &[EntrySlot<K, V>],
    hash: u64,
    key: &Q,
) -> Probe
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
{
    let mask = offsets.len() - 1;
    let mut index = (hash as usize) & mask;
    loop {
        let stored = offsets[index].get();
        if stored == EMPTY {
            return Probe::Vacant(index);
        }
        let entry = live_entry(&entries[stored - 1]);
        if entry.key().borrow() == key {
            return Probe::Occupied(stored - 1);
        }
        index = (index + 1) & mask;
    }
}

/// Captured `(size, arrays, hasher)` backing views and iterators.
///
/// Holding `Rc` clones keeps a pre-growth array pair alive independently of
/// the map, so a snapshot never dangles and never observes a rehash. Slot
/// contents remain shared: an update that did not grow the map is visible
/// through any earlier snapshot, and records appended later sit above the
/// captured size where iteration never reaches them.
pub(crate) struct Snapshot<K, V, S> {
    pub(crate) size: usize,
    pub(crate) offsets: Rc<[Cell<usize>]>,
    pub(crate) entries: Rc<[EntrySlot<K, V>]>,
    pub(crate) hasher: S,
}

impl<K, V, S: Clone> Clone for Snapshot<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            size: self.size,
            offsets: Rc::clone(&self.offsets),
            entries: Rc::clone(&self.entries),
            hasher: self.hasher.clone(),
        }
    }
}

impl<K, V, S> Snapshot<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Record at `index`, bounded by the captured size.
    pub(crate) fn entry_at(&self, index: usize) -> Option<Rc<RecordEntry<K, V>>> {
        if index < self.size {
            Some(live_entry(&self.entries[index]))
        } else {
            None
        }
    }

    /// Probe the captured arrays for `key`.
    pub(crate) fn find<Q>(&self, key: &Q) -> Option<Rc<RecordEntry<K, V>>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match probe(&self.offsets, &self.entries, self.hasher.hash_one(key), key) {
            Probe::Occupied(offset) => Some(live_entry(&self.entries[offset])),
            Probe::Vacant(_) => None,
        }
    }

    /// Linear scan of the captured live slots for `value`. The index has no
    /// value support, so this is O(size) by design.
    pub(crate) fn scan_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        (0..self.size).any(|index| *live_entry(&self.entries[index]).value() == *value)
    }

    pub(crate) fn entry_iter(&self) -> EntryIter<K, V> {
        EntryIter::new(self.size, Rc::clone(&self.entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::RandomState;

    fn put_raw<K: Eq + Hash, V>(
        offsets: &[Cell<usize>],
        entries: &[EntrySlot<K, V>],
        hasher: &RandomState,
        size: &mut usize,
        key: K,
        value: V,
    ) {
        match probe(offsets, entries, hasher.hash_one(&key), &key) {
            Probe::Vacant(index) => {
                *entries[*size].borrow_mut() = Some(Rc::new(RecordEntry::new(key, value)));
                offsets[index].set(*size + 1);
                *size += 1;
            }
            Probe::Occupied(_) => panic!("distinct keys expected"),
        }
    }

    /// Invariant: a vacant probe result names an index slot, an occupied one
    /// names the unique entry-store offset of the matching record.
    #[test]
    fn probe_resolves_present_and_absent_keys() {
        let offsets = new_offsets(8);
        let entries = new_entries::<String, i32>(4);
        let hasher = RandomState::new();
        let mut size = 0;

        for (i, k) in ["a", "b", "c"].into_iter().enumerate() {
            put_raw(&offsets, &entries, &hasher, &mut size, k.to_string(), i as i32);
        }

        for (i, k) in ["a", "b", "c"].into_iter().enumerate() {
            match probe(&offsets, &entries, hasher.hash_one(k), k) {
                Probe::Occupied(offset) => assert_eq!(offset, i),
                Probe::Vacant(_) => panic!("{k} must be present"),
            }
        }
        assert!(matches!(
            probe(&offsets, &entries, hasher.hash_one("z"), "z"),
            Probe::Vacant(_)
        ));
    }

    /// Invariant: a snapshot bounds reads by its captured size even when the
    /// shared arrays hold records above it.
    #[test]
    fn snapshot_is_bounded_by_captured_size() {
        let offsets = new_offsets(8);
        let entries = new_entries::<String, i32>(4);
        let hasher = RandomState::new();
        let mut size = 0;
        put_raw(&offsets, &entries, &hasher, &mut size, "a".to_string(), 1);
        put_raw(&offsets, &entries, &hasher, &mut size, "b".to_string(), 2);

        let snap = Snapshot {
            size,
            offsets: Rc::clone(&offsets),
            entries: Rc::clone(&entries),
            hasher: hasher.clone(),
        };
        put_raw(&offsets, &entries, &hasher, &mut size, "c".to_string(), 3);

        assert_eq!(snap.size, 2);
        assert!(snap.entry_at(2).is_none());
        assert_eq!(snap.entry_iter().count(), 2);
        // The probe path still walks the shared index, so the later record is
        // reachable by key through the same arrays.
        assert!(snap.find("c").is_some());
    }
}
