use proptest::prelude::*;
use record_map::RecordMap;
use std::collections::HashMap;

// Replay random put sequences and assert the ordered-map contract: iteration
// follows first insertion, last value wins, and the result equals a std
// HashMap built from the same pairs.
proptest! {
    #[test]
    fn prop_put_sequences_keep_first_insertion_order(
        pairs in proptest::collection::vec((0u8..50, any::<i32>()), 1..200)
    ) {
        let mut map: RecordMap<u8, i32> = RecordMap::new();
        let mut model: HashMap<u8, i32> = HashMap::new();
        let mut order: Vec<u8> = Vec::new();

        for &(k, v) in &pairs {
            let prev = map.put(k, v);
            let expected = model.insert(k, v);
            prop_assert_eq!(prev.as_deref(), expected.as_ref());
            if expected.is_none() {
                order.push(k);
            }
        }

        prop_assert_eq!(map.len(), model.len());
        let keys: Vec<u8> = map.iter().map(|e| *e.key()).collect();
        prop_assert_eq!(keys, order);
        prop_assert!(map == model);
        prop_assert!(model == map);
    }
}

// Views obtained mid-sequence stay frozen at their captured size while the
// map keeps growing.
proptest! {
    #[test]
    fn prop_views_freeze_their_size(
        before in proptest::collection::vec(any::<u16>(), 1..50),
        after in proptest::collection::vec(any::<u16>(), 1..50),
    ) {
        let mut map: RecordMap<u16, u16> = RecordMap::new();
        for &k in &before {
            map.put(k, k);
        }
        let frozen = map.len();
        let keys = map.key_set();
        let entries = map.entry_set();

        for &k in &after {
            map.put(k, k);
        }

        prop_assert_eq!(keys.len(), frozen);
        prop_assert_eq!(entries.len(), frozen);
        prop_assert_eq!(keys.iter().count(), frozen);
    }
}
