#![cfg(test)]

// State-machine property tests kept inside the crate, next to the code they
// exercise. The model is a std HashMap for associations plus a Vec of keys
// for first-insertion order.

use crate::{RecordMap, RemoveError};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    PutIfAbsent(usize, i32),
    ComputeAdd(usize, i32),
    ComputeIfPresent(usize, i32),
    Merge(usize, i32),
    Replace(usize, i32),
    ReplaceExact(usize, i32, i32),
    Get(usize),
    GetOrDefault(usize, i32),
    Contains(String),
    ContainsValue(i32),
    Remove(usize),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let mutating = prop_oneof![
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::PutIfAbsent(i, v)),
            (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::ComputeAdd(i, d)),
            (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::ComputeIfPresent(i, d)),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Merge(i, v)),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Replace(i, v)),
            (idx.clone(), any::<i32>(), any::<i32>())
                .prop_map(|(i, old, new)| OpI::ReplaceExact(i, old, new)),
        ];
        let reading = prop_oneof![
            idx.clone().prop_map(OpI::Get),
            (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::GetOrDefault(i, d)),
            prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            any::<i32>().prop_map(OpI::ContainsValue),
            idx.clone().prop_map(OpI::Remove),
            Just(OpI::Iterate),
        ];
        let op = prop_oneof![mutating, reading];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_scenario<S>(hasher: S, pool: &[String], ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    S: BuildHasher + Clone + Default,
{
    let mut sut: RecordMap<String, i32, S> = RecordMap::with_hasher(hasher);
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = pool[i].clone();
                let prev = sut.put(k.clone(), v);
                let expected = model.insert(k.clone(), v);
                if expected.is_none() {
                    order.push(k);
                }
                prop_assert_eq!(prev.as_deref(), expected.as_ref());
            }
            OpI::PutIfAbsent(i, v) => {
                let k = pool[i].clone();
                let current = sut.put_if_absent(k.clone(), v);
                match model.get(&k) {
                    Some(&existing) => {
                        prop_assert_eq!(current.as_deref(), Some(&existing));
                    }
                    None => {
                        prop_assert!(current.is_none());
                        model.insert(k.clone(), v);
                        order.push(k);
                    }
                }
            }
            OpI::ComputeAdd(i, d) => {
                let k = pool[i].clone();
                let stored = sut.compute(k.clone(), |_, current| {
                    current.copied().unwrap_or(0).wrapping_add(d)
                });
                let expected = model.get(&k).copied().unwrap_or(0).wrapping_add(d);
                if model.insert(k.clone(), expected).is_none() {
                    order.push(k);
                }
                prop_assert_eq!(*stored, expected);
            }
            OpI::ComputeIfPresent(i, d) => {
                let k = pool[i].clone();
                let stored = sut.compute_if_present(k.as_str(), |_, current| {
                    current.wrapping_add(d)
                });
                match model.get(&k).copied() {
                    Some(current) => {
                        let expected = current.wrapping_add(d);
                        model.insert(k, expected);
                        prop_assert_eq!(stored.as_deref(), Some(&expected));
                    }
                    None => prop_assert!(stored.is_none()),
                }
            }
            OpI::Merge(i, v) => {
                let k = pool[i].clone();
                let stored = sut.merge(k.clone(), v, |a, b| a.wrapping_add(*b));
                let expected = match model.get(&k).copied() {
                    Some(current) => current.wrapping_add(v),
                    None => v,
                };
                if model.insert(k.clone(), expected).is_none() {
                    order.push(k);
                }
                prop_assert_eq!(*stored, expected);
            }
            OpI::Replace(i, v) => {
                let k = pool[i].clone();
                let prev = sut.replace(k.as_str(), v);
                match model.get(&k).copied() {
                    Some(current) => {
                        model.insert(k, v);
                        prop_assert_eq!(prev.as_deref(), Some(&current));
                    }
                    None => prop_assert!(prev.is_none()),
                }
            }
            OpI::ReplaceExact(i, old, new) => {
                let k = pool[i].clone();
                let replaced = sut.replace_exact(k.as_str(), &old, new);
                let expected = model.get(&k) == Some(&old);
                prop_assert_eq!(replaced, expected);
                if replaced {
                    model.insert(k, new);
                }
            }
            OpI::Get(i) => {
                let k = &pool[i];
                let got = sut.get(k.as_str());
                prop_assert_eq!(got.as_deref(), model.get(k));
            }
            OpI::GetOrDefault(i, d) => {
                let k = &pool[i];
                let got = sut.get_or_default(k.as_str(), d);
                prop_assert_eq!(*got, model.get(k).copied().unwrap_or(d));
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains_key(s.as_str()), model.contains_key(&s));
            }
            OpI::ContainsValue(v) => {
                prop_assert_eq!(sut.contains_value(&v), model.values().any(|x| *x == v));
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove(k.as_str()), Err(RemoveError::Unsupported));
                prop_assert_eq!(sut.remove_exact(k.as_str(), &0), Err(RemoveError::Unsupported));
            }
            OpI::Iterate => {
                let seen: Vec<String> = sut.iter().map(|e| e.key().clone()).collect();
                prop_assert_eq!(&seen, &order);
                for entry in sut.iter() {
                    prop_assert_eq!(Some(entry.value()), model.get(entry.key()));
                }
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }

    // Final check: insertion order and associations both survived.
    let seen: Vec<String> = sut.iter().map(|e| e.key().clone()).collect();
    prop_assert_eq!(&seen, &order);
    prop_assert!(sut == model);
    Ok(())
}

// Property: state-machine equivalence against std HashMap plus an
// insertion-order list. Invariants exercised across random op sequences:
// - `put`/`put_if_absent`/`compute*`/`merge`/`replace*` return values and
//   mutations match the model's, with first-insertion order preserved.
// - `get`/`get_or_default`/`contains_key`/`contains_value` parity.
// - Both `remove` forms always fail and never change the size.
// - `len`/`is_empty` parity with the model after every op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(RandomState::default(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution
// along clustered probe runs.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl std::hash::BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same state-machine invariants under worst-case collisions, where
// every key shares one probe run.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(ConstBuildHasher, &pool, ops)?;
    }
}
