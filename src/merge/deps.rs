//! DEPENDENCY step: which merged classes refer to which.
//!
//! A class depends on another merged class when that class's name appears in
//! one of its base-class arguments, field annotations, or method signatures.
//! Quoted forward references count the same as bare names. Method bodies are
//! never inspected.
//!
//! Dotted references resolve by their first segment, so `models.User` counts
//! as a use of `models` and never of `User`. Names that are not merged classes
//! (builtins, imported names) are ignored.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::model::type_ref::root_segment;
use crate::model::TypeDeclaration;

// ---------------------------------------------------------------------------
// DependencyEdge
// ---------------------------------------------------------------------------

/// `from` must be emitted after `to`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyEdge {
    /// The dependent class.
    pub from: String,
    /// The class it refers to.
    pub to: String,
}

impl DependencyEdge {
    /// Build an edge.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Names in `known` that `decl` refers to, excluding itself.
#[must_use]
pub fn dependencies(decl: &TypeDeclaration, known: &BTreeSet<String>) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut visit = |name: &str| {
        let root = root_segment(name);
        if root != decl.name && known.contains(root) {
            found.insert(root.to_owned());
        }
    };

    let references = decl
        .base_types
        .iter()
        .chain(decl.annotated_fields().map(|(_, ty)| ty))
        .chain(decl.methods().flat_map(|m| m.signature_types()));
    for ty in references {
        ty.for_each_name(&mut visit);
    }
    found
}

/// Every dependency edge among `types`, sorted by `(from, to)`.
#[must_use]
pub fn dependency_edges(types: &IndexMap<String, TypeDeclaration>) -> Vec<DependencyEdge> {
    let known: BTreeSet<String> = types.keys().cloned().collect();
    let mut edges: Vec<DependencyEdge> = types
        .values()
        .flat_map(|decl| {
            dependencies(decl, &known)
                .into_iter()
                .map(|to| DependencyEdge::new(decl.name.clone(), to))
        })
        .collect();
    edges.sort();
    edges
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
