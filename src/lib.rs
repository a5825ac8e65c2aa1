//! record-map: a single-threaded, insertion-ordered map with immutable
//! key-value records, snapshot views, and no deletion.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: reproduce the ordered-map contract (lookups, the full put/compute/
//!   merge/replace family, bulk iteration, derived key/value/entry views) on
//!   top of two coupled arrays, in safe, verifiable layers.
//! - Layers:
//!   - `RecordEntry<K, V>`: an immutable record; both halves behind `Rc` so
//!     the map, views, and callers share one allocation. Updates allocate a
//!     fresh record and swap the slot, never mutate in place.
//!   - `table`: the dual-array core. A dense entry store (insertion order,
//!     indices `0..size`) plus a power-of-two offset index (`0` = empty,
//!     otherwise `offset + 1`) probed linearly from `hash(key)`. Bundled in
//!     one structure with no partial-mutation API, so the two arrays can only
//!     grow and rebuild together.
//!   - `RecordMap<K, V, S>`: the public map. Every mutating operation shares
//!     one probe-then-act shape; growth doubles both arrays, rebuilds the
//!     index from scratch, and restarts the interrupted probe.
//!   - Views (`KeySet`, `Values`, `EntrySet`) and iterators: lightweight
//!     handles over a captured `(size, arrays, hasher)` snapshot; read-only,
//!     never trigger growth.
//!
//! Constraints
//! - Single-threaded: `Rc`/`Cell`/`RefCell` make everything `!Send`/`!Sync`,
//!   so cross-thread misuse is a compile error rather than undefined results.
//! - No deletion: both `remove` forms return `RemoveError::Unsupported`. The
//!   index has no tombstones and probing relies on that.
//! - Linear probing with no collision-resilience tweaks: colliding keys form
//!   contiguous runs. Accepted property, not optimized away.
//! - Probes terminate because the entry store's capacity is always half the
//!   index length, so the index is never more than half full.
//!
//! Aliasing rules (the subtle part)
//! - Views and iterators hold `Rc` clones of the arrays captured at creation
//!   plus the size at that moment. Records appended later are invisible to
//!   iteration; an in-place value replacement with no intervening growth is
//!   visible, because slots are shared, not copied.
//! - A rehash swaps in fresh arrays; earlier captures keep the old pair
//!   alive and stop observing the map entirely. No capture ever dangles.
//!
//! Notes and non-goals
//! - No thread-safety, no load-factor tuning, no persistence.
//! - `len`/`is_empty` are O(1); `contains_value` is a linear scan (the index
//!   only covers keys).
//! - Hashing is pluggable through `S: BuildHasher` (default `RandomState`);
//!   the `fxhash`/`ahash` features expose fast deterministic alternatives.
//! - The `serde` feature serializes the map in insertion order and rebuilds
//!   it by replaying `put` in source order.

mod entry;
mod map;
mod record_map_proptest;
#[cfg(feature = "serde")]
mod serde_impls;
mod table;
mod views;

// Public surface
pub use entry::RecordEntry;
pub use map::{RecordMap, RemoveError};
pub use views::{EntryIter, EntrySet, KeyIter, KeySet, ValueIter, Values};

/// `RecordMap` over the rustc-hash hasher: deterministic and fast on small
/// keys.
#[cfg(feature = "fxhash")]
pub type FxRecordMap<K, V> = RecordMap<K, V, rustc_hash::FxBuildHasher>;

/// `RecordMap` over ahash's `RandomState`.
#[cfg(feature = "ahash")]
pub type AHashRecordMap<K, V> = RecordMap<K, V, ahash::RandomState>;
