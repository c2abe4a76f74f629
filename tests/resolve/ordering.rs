//! Integration tests for slot dependency ordering

use proptest::prelude::*;
use quarry_resolve::{ActionDefinition, TargetSlot, order};

fn slot(name: &str, from: Option<&str>) -> TargetSlot {
    match from {
        Some(from) => TargetSlot::new(name, "actor").with_context_from(from),
        None => TargetSlot::new(name, "actor"),
    }
}

#[test]
fn diamond_orders_sources_first() {
    let slots = vec![
        slot("reward", Some("quest")),
        slot("giver", None),
        slot("quest", Some("giver")),
        slot("witness", Some("giver")),
    ];
    assert_eq!(order(&slots).unwrap(), vec!["giver", "quest", "reward", "witness"]);
}

#[test]
fn definition_allows_cycles_but_ordering_rejects_them() {
    let action = ActionDefinition::new(
        "core:paradox",
        vec![slot("free", None), slot("egg", Some("hen")), slot("hen", Some("egg"))],
    )
    .unwrap();
    let err = order(&action.slots).unwrap_err();
    assert_eq!(err.slots, vec!["egg", "hen"]);
    assert!(err.to_string().contains("egg, hen"));
}

/// Any set of slots where each depends on at most one strictly earlier slot,
/// then shuffled by a permutation seed.
fn forest() -> impl Strategy<Value = Vec<TargetSlot>> {
    (1usize..12)
        .prop_flat_map(|n| {
            (
                prop::collection::vec(prop::option::of(any::<prop::sample::Index>()), n),
                Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
            )
        })
        .prop_map(|(parents, permutation)| {
            let named: Vec<TargetSlot> = parents
                .iter()
                .enumerate()
                .map(|(i, parent)| match parent {
                    Some(index) if i > 0 => slot(&format!("s{i}"), Some(&format!("s{}", index.index(i)))),
                    _ => slot(&format!("s{i}"), None),
                })
                .collect();
            permutation.into_iter().map(|i| named[i].clone()).collect()
        })
}

proptest! {
    #[test]
    fn ordering_is_a_dependency_respecting_permutation(slots in forest()) {
        let ordered = order(&slots).unwrap();

        let mut sorted = ordered.clone();
        sorted.sort();
        let mut names: Vec<String> = slots.iter().map(|s| s.name.clone()).collect();
        names.sort();
        prop_assert_eq!(sorted, names);

        for s in &slots {
            if let Some(from) = &s.context_from {
                let a = ordered.iter().position(|n| n == from);
                let b = ordered.iter().position(|n| *n == s.name);
                prop_assert!(a < b);
            }
        }
    }

    #[test]
    fn independent_slots_keep_declaration_order(n in 1usize..12) {
        let slots: Vec<TargetSlot> = (0..n).map(|i| slot(&format!("s{i}"), None)).collect();
        let expected: Vec<String> = slots.iter().map(|s| s.name.clone()).collect();
        prop_assert_eq!(order(&slots).unwrap(), expected);
    }
}
