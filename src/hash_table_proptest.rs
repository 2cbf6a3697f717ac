#![cfg(test)]

// Property tests for HashTable kept inside the crate so they can check
// bucket-level structure that the public API does not expose.

use crate::codec::BlobInput;
use crate::error::BlobError;
use crate::hash_table::{EntryId, HashTable};
use crate::types::{TypeDescriptor, I32, STRING_CI};
use crate::value::Value;
use core::any::Any;
use core::cmp::Ordering;
use proptest::prelude::*;
use std::collections::{BTreeMap, VecDeque};

// Pool-indexed operations: indices shrink toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Add(usize, i32),
    Remove(usize),
    RemoveHead,
    Get(usize),
    Iterate,
}

fn arb_scenario(max_key: i32) -> impl Strategy<Value = (Vec<i32>, Vec<Op>)> {
    proptest::collection::vec(0..max_key, 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Add(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            1 => Just(Op::RemoveHead),
            1 => idx.clone().prop_map(Op::Get),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn key_of(t: &HashTable, id: EntryId) -> i32 {
    *t.entry(id).unwrap().key().downcast_ref::<i32>().unwrap()
}

fn value_of(v: &Value) -> i32 {
    *v.downcast_ref::<i32>().unwrap()
}

// Runs `ops` against `sut` and a multimap model (values per key in
// insertion order), checking structure after every step.
fn run_scenario(mut sut: HashTable, pool: &[i32], ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mut model: BTreeMap<i32, VecDeque<i32>> = BTreeMap::new();
    for op in ops {
        match op {
            Op::Add(i, v) => {
                let k = pool[i];
                sut.add_entry(k, v, I32).unwrap();
                model.entry(k).or_default().push_back(v);
            }
            Op::Remove(i) => {
                let k = pool[i];
                let removed = sut.remove_entry(&k).map(|e| value_of(&e.value));
                let expected = model.get_mut(&k).and_then(VecDeque::pop_front);
                prop_assert_eq!(removed, expected);
            }
            Op::RemoveHead => {
                if let Some(id) = sut.head() {
                    let k = key_of(&sut, id);
                    let removed = sut.remove_by_id(id).map(|e| value_of(&e.value));
                    // The head is the oldest entry for its key.
                    let expected = model.get_mut(&k).and_then(VecDeque::pop_front);
                    prop_assert_eq!(removed, expected);
                } else {
                    prop_assert!(model.values().all(VecDeque::is_empty));
                }
            }
            Op::Get(i) => {
                let k = pool[i];
                let got = sut.get_value(&k).map(value_of);
                let expected = model.get(&k).and_then(|vs| vs.front().copied());
                prop_assert_eq!(got, expected);
            }
            Op::Iterate => {
                let fwd: Vec<EntryId> = sut.iter().map(|e| e.id()).collect();
                let mut bwd: Vec<EntryId> = sut.iter().rev().map(|e| e.id()).collect();
                bwd.reverse();
                prop_assert_eq!(fwd, bwd);
            }
        }

        sut.assert_invariants();
        let model_len: usize = model.values().map(VecDeque::len).sum();
        prop_assert_eq!(sut.len(), model_len);
        prop_assert_eq!(sut.is_empty(), model_len == 0);
    }
    Ok(())
}

// Property: State-machine equivalence against a multimap model.
// Invariants exercised across random operation sequences:
// - Duplicate keys are kept; lookups and removals act on the oldest.
// - Each bucket is sorted and holds only keys hashing to it; empty
//   buckets are dropped.
// - The global list visits buckets in index order, each in key order,
//   and the backward walk mirrors it.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(512)) {
        run_scenario(HashTable::new(I32), &pool, ops)?;
    }
}

// i32 keys whose hash is constant, forcing every key into bucket 0.
struct Colliding {
    name: &'static str,
}

impl TypeDescriptor for Colliding {
    fn name(&self) -> &'static str {
        self.name
    }
    fn data_is_pointer(&self) -> bool {
        false
    }
    fn accepts(&self, v: &dyn Any) -> bool {
        I32.accepts(v)
    }
    fn create(&self) -> Value {
        I32.create()
    }
    fn copy(&self, v: &dyn Any) -> Option<Value> {
        I32.copy(v)
    }
    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Ordering {
        I32.compare(a, b)
    }
    fn size(&self, v: &dyn Any) -> usize {
        I32.size(v)
    }
    fn format_value(&self, v: &dyn Any) -> String {
        I32.format_value(v)
    }
    fn to_blob(&self, v: &dyn Any, out: &mut Vec<u8>) -> Result<(), BlobError> {
        I32.to_blob(v, out)
    }
    fn from_blob(&self, input: BlobInput<'_>) -> Result<(Value, usize), BlobError> {
        I32.from_blob(input)
    }
    fn clear(&self, v: &mut Value) {
        I32.clear(v)
    }
    fn to_xml(&self, v: &dyn Any, element: &str, out: &mut String) {
        I32.to_xml(v, element, out)
    }
    #[cfg(feature = "json")]
    fn to_json(&self, v: &dyn Any) -> serde_json::Value {
        I32.to_json(v)
    }
    fn hash(&self, _v: &dyn Any) -> Option<u64> {
        Some(0)
    }
}

static COLLIDING: Colliding = Colliding { name: "colliding_i32" };

// Property: Same state-machine invariants as above with every key in one
// bucket, stressing in-bucket ordering and head/tail maintenance.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario(16)) {
        run_scenario(HashTable::new(&COLLIDING), &pool, ops)?;
    }
}

// Property: Case-insensitive keys land in the same bucket and find each other.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_case_insensitive_hash(key in "[a-zA-Z]{1,12}") {
        let t = HashTable::new(STRING_CI);
        let upper = key.to_ascii_uppercase();
        let lower = key.to_ascii_lowercase();
        prop_assert_eq!(t.hash_key(&upper), t.hash_key(&lower));

        let mut t = t;
        t.add_entry(upper.as_str(), 1i32, I32).unwrap();
        prop_assert!(t.contains_key(&lower));
        t.assert_invariants();
    }
}
