//! Property-based tests: random command sequences applied both to a
//! `TtlMap` (permanent entries, no scheduler) and to a plain hash map used
//! as the reference model.

use std::sync::Arc;

use hashbrown::HashMap;
use proptest::prelude::*;

use kestrel_core::{NoopScheduler, TtlMap};

#[derive(Debug, Clone)]
enum MapCommand {
    Insert(u8, u16),
    InsertIfAbsent(u8, u16),
    Replace(u8, u16),
    ReplaceIfEqual(u8, u16, u16),
    Remove(u8),
    RemoveIfEqual(u8, u16),
    Get(u8),
    ContainsKey(u8),
}

// Narrow key space so commands actually collide.
fn arb_key() -> impl Strategy<Value = u8> {
    0..16u8
}

fn arb_command() -> impl Strategy<Value = MapCommand> {
    prop_oneof![
        (arb_key(), any::<u16>()).prop_map(|(k, v)| MapCommand::Insert(k, v)),
        (arb_key(), any::<u16>()).prop_map(|(k, v)| MapCommand::InsertIfAbsent(k, v)),
        (arb_key(), any::<u16>()).prop_map(|(k, v)| MapCommand::Replace(k, v)),
        (arb_key(), any::<u16>(), any::<u16>())
            .prop_map(|(k, old, new)| MapCommand::ReplaceIfEqual(k, old, new)),
        arb_key().prop_map(MapCommand::Remove),
        (arb_key(), any::<u16>()).prop_map(|(k, v)| MapCommand::RemoveIfEqual(k, v)),
        arb_key().prop_map(MapCommand::Get),
        arb_key().prop_map(MapCommand::ContainsKey),
    ]
}

proptest! {
    #[test]
    fn prop_matches_reference_model(
        commands in prop::collection::vec(arb_command(), 1..256)
    ) {
        let map: TtlMap<u8, u16> = TtlMap::with_scheduler(Arc::new(NoopScheduler));
        let mut model: HashMap<u8, u16> = HashMap::new();

        for command in commands {
            match command {
                MapCommand::Insert(k, v) => {
                    prop_assert_eq!(map.insert(k, v), model.insert(k, v));
                }
                MapCommand::InsertIfAbsent(k, v) => {
                    let expected = model.get(&k).copied();
                    if expected.is_none() {
                        model.insert(k, v);
                    }
                    prop_assert_eq!(map.insert_if_absent(k, v), expected);
                }
                MapCommand::Replace(k, v) => {
                    let expected = model.get(&k).copied();
                    if expected.is_some() {
                        model.insert(k, v);
                    }
                    prop_assert_eq!(map.replace(&k, v), expected);
                }
                MapCommand::ReplaceIfEqual(k, old, new) => {
                    let expected = model.get(&k) == Some(&old);
                    if expected {
                        model.insert(k, new);
                    }
                    prop_assert_eq!(map.replace_if_equal(&k, &old, new), expected);
                }
                MapCommand::Remove(k) => {
                    prop_assert_eq!(map.remove(&k), model.remove(&k));
                }
                MapCommand::RemoveIfEqual(k, v) => {
                    let expected = model.get(&k) == Some(&v);
                    if expected {
                        model.remove(&k);
                    }
                    prop_assert_eq!(map.remove_if_equal(&k, &v), expected);
                }
                MapCommand::Get(k) => {
                    prop_assert_eq!(map.get(&k), model.get(&k).copied());
                }
                MapCommand::ContainsKey(k) => {
                    prop_assert_eq!(map.contains_key(&k), model.contains_key(&k));
                }
            }
        }

        prop_assert_eq!(map.len(), model.len());
        for (k, v) in &model {
            prop_assert_eq!(map.get(k), Some(*v));
        }
    }

    #[test]
    fn prop_iter_matches_model(
        pairs in prop::collection::vec((0..32u8, any::<u16>()), 1..64)
    ) {
        let map: TtlMap<u8, u16> = TtlMap::with_scheduler(Arc::new(NoopScheduler));
        let mut model: HashMap<u8, u16> = HashMap::new();
        for (k, v) in pairs {
            map.insert(k, v);
            model.insert(k, v);
        }
        let mut snapshot: Vec<_> = map.iter().collect();
        snapshot.sort_unstable();
        let mut expected: Vec<_> = model.into_iter().collect();
        expected.sort_unstable();
        prop_assert_eq!(snapshot, expected);
    }
}
