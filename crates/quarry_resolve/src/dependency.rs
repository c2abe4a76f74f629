//! Slot dependency ordering.
//!
//! Slots form a graph with an edge `contextFrom -> slot`. Ordering is Kahn's
//! algorithm with a min-heap of declaration indices as the ready queue, so
//! independent slots keep their declaration order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use thiserror::Error;

use crate::action::TargetSlot;

/// Slots whose `contextFrom` references form a cycle.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("cyclic contextFrom dependency between slots: {}", .slots.join(", "))]
pub struct CyclicDependencyError {
    /// Every slot on a cycle, in declaration order.
    pub slots: Vec<String>,
}

/// Orders slot names so that every slot follows the slot it takes context from.
///
/// `contextFrom` names that are not declared slots are ignored.
///
/// # Errors
///
/// Returns [`CyclicDependencyError`] naming every slot on a cycle. Slots that
/// merely depend on a cycle are not named.
pub fn order(slots: &[TargetSlot]) -> Result<Vec<String>, CyclicDependencyError> {
    order_indices(slots).map(|indices| indices.into_iter().map(|i| slots[i].name.clone()).collect())
}

/// Like [`order`], returning declaration indices.
///
/// # Errors
///
/// See [`order`].
pub fn order_indices(slots: &[TargetSlot]) -> Result<Vec<usize>, CyclicDependencyError> {
    let parents = parents(slots);

    let mut in_degree = vec![0usize; slots.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    for (child, parent) in parents.iter().enumerate() {
        if let Some(parent) = *parent {
            in_degree[child] += 1;
            children[parent].push(child);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut ordered = Vec::with_capacity(slots.len());
    while let Some(Reverse(next)) = ready.pop() {
        ordered.push(next);
        for &child in &children[next] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.push(Reverse(child));
            }
        }
    }

    if ordered.len() == slots.len() {
        return Ok(ordered);
    }

    let mut processed = vec![false; slots.len()];
    for &i in &ordered {
        processed[i] = true;
    }
    let on_cycle = cycle_members(&parents, &processed);
    Err(CyclicDependencyError {
        slots: slots
            .iter()
            .zip(on_cycle)
            .filter(|(_, member)| *member)
            .map(|(slot, _)| slot.name.clone())
            .collect(),
    })
}

/// Declaration index of each slot's `contextFrom`, if it names a declared slot.
fn parents(slots: &[TargetSlot]) -> Vec<Option<usize>> {
    slots
        .iter()
        .map(|slot| {
            slot.context_from
                .as_deref()
                .and_then(|from| slots.iter().position(|s| s.name == from))
        })
        .collect()
}

/// Marks the slots that lie on a cycle.
///
/// Every unprocessed slot has an unprocessed parent, so following parents from
/// any of them must revisit a slot; the revisited stretch is a cycle.
fn cycle_members(parents: &[Option<usize>], processed: &[bool]) -> Vec<bool> {
    let mut on_cycle = vec![false; parents.len()];
    let mut visited = vec![false; parents.len()];

    for start in 0..parents.len() {
        if processed[start] || visited[start] {
            continue;
        }
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(node) = current {
            if processed[node] {
                break;
            }
            if let Some(pos) = path.iter().position(|&n| n == node) {
                for &member in &path[pos..] {
                    on_cycle[member] = true;
                }
                break;
            }
            if visited[node] {
                break;
            }
            path.push(node);
            current = parents[node];
        }
        for node in path {
            visited[node] = true;
        }
    }
    on_cycle
}
