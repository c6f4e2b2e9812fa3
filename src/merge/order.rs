//! ORDER step: emit classes after the classes they depend on.
//!
//! Kahn's algorithm over the dependency edges. Ties between classes that are
//! ready at the same time break alphabetically, so the order depends only on
//! the set of names and edges, never on input order.
//!
//! Classes caught in a cycle (or depending on one) can never become ready.
//! They are appended after everything else in alphabetical order and
//! reported in [`TopoOrder::cyclic`].

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use super::deps::DependencyEdge;
use crate::model::TypeDeclaration;

/// Result of ordering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopoOrder {
    /// Every name exactly once, dependencies first.
    pub names: Vec<String>,
    /// Names that could not be ordered because of a cycle, alphabetical.
    /// These are also the tail of `names`.
    pub cyclic: Vec<String>,
}

impl TopoOrder {
    /// Returns `true` if the alphabetical fallback was needed.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        !self.cyclic.is_empty()
    }
}

/// Order the merged classes.
#[must_use]
pub fn order(types: &IndexMap<String, TypeDeclaration>, edges: &[DependencyEdge]) -> TopoOrder {
    order_names(types.keys().map(String::as_str), edges)
}

/// Order a set of names. Edges naming unknown nodes, and self-edges, are
/// ignored.
#[must_use]
pub fn order_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
    edges: &[DependencyEdge],
) -> TopoOrder {
    let mut pending: BTreeMap<&str, usize> = names.into_iter().map(|n| (n, 0)).collect();
    let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for edge in edges {
        let (from, to) = (edge.from.as_str(), edge.to.as_str());
        if from == to || !pending.contains_key(from) || !pending.contains_key(to) {
            continue;
        }
        if dependents.entry(to).or_default().insert(from)
            && let Some(count) = pending.get_mut(from)
        {
            *count += 1;
        }
    }

    let mut ready: BTreeSet<&str> = pending
        .iter()
        .filter(|&(_, &count)| count == 0)
        .map(|(&name, _)| name)
        .collect();
    let mut ordered = Vec::with_capacity(pending.len());

    while let Some(name) = ready.pop_first() {
        pending.remove(name);
        ordered.push(name.to_owned());
        for &dependent in dependents.get(name).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    // BTreeMap keys: already alphabetical.
    let cyclic: Vec<String> = pending.keys().map(|&n| n.to_owned()).collect();
    ordered.extend(cyclic.iter().cloned());
    TopoOrder {
        names: ordered,
        cyclic,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
