// HashTable property tests (public API).
//
// Property 1: binary round trip.
//  - Tables of up to 64 entries with mixed integer and text values,
//    duplicate keys included.
//  - Invariant: decoding the blob (copy or in place) consumes it fully and
//    yields a table that compares equal and walks the same keys in order.
//
// Property 2: copy independence.
//  - Invariant: after removing any subset of keys from a copy, the
//    original keeps every entry and the copy holds exactly the rest.
use bucket_table::types::{I64, STRING, U16};
use bucket_table::HashTable;
use proptest::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Clone, Debug)]
enum Payload {
    Int(i64),
    Text(String),
}

fn arb_entries() -> impl Strategy<Value = Vec<(u16, Payload)>> {
    let payload = prop_oneof![
        any::<i64>().prop_map(Payload::Int),
        "[a-z]{0,8}".prop_map(Payload::Text),
    ];
    proptest::collection::vec((0u16..200, payload), 0..=64)
}

fn build(entries: &[(u16, Payload)]) -> HashTable {
    let mut t = HashTable::new(U16);
    for (k, p) in entries {
        match p {
            Payload::Int(v) => t.add_entry(*k, *v, I64).unwrap(),
            Payload::Text(s) => t.add_entry(*k, s.as_str(), STRING).unwrap(),
        };
    }
    t
}

fn keys(t: &HashTable) -> Vec<u16> {
    t.iter()
        .map(|e| *e.key().downcast_ref::<u16>().unwrap())
        .collect()
}

// Property 1: encode/decode preserves the table.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_blob_round_trip(entries in arb_entries()) {
        let t = build(&entries);
        let blob = t.to_blob().unwrap();

        let copied = HashTable::from_blob(&blob).unwrap();
        prop_assert!(copied.is_complete());
        prop_assert_eq!(copied.consumed, blob.len());
        prop_assert_eq!(t.compare(&copied.value), Ordering::Equal);
        prop_assert_eq!(keys(&t), keys(&copied.value));

        let shared: Arc<[u8]> = blob.into();
        let in_place = HashTable::from_blob_in_place(shared).unwrap().into_result().unwrap();
        prop_assert_eq!(t.compare(&in_place), Ordering::Equal);
        prop_assert_eq!(keys(&t), keys(&in_place));
    }
}

// Property 2: a copy diverges without touching the original.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_copy_independent(
        entries in arb_entries(),
        drop_mask in proptest::collection::vec(any::<bool>(), 64),
    ) {
        let t = build(&entries);
        let mut c = t.copy();
        prop_assert_eq!(t.compare(&c), Ordering::Equal);

        let mut kept = 0;
        for (i, (k, _)) in entries.iter().enumerate() {
            if drop_mask[i] {
                prop_assert!(c.remove_entry(k).is_some());
            } else {
                kept += 1;
            }
        }
        prop_assert_eq!(t.len(), entries.len());
        prop_assert_eq!(c.len(), kept);
        for (k, _) in &entries {
            prop_assert!(t.contains_key(k));
        }
        prop_assert_eq!(keys(&t), keys(&build(&entries)));
    }
}
