//! DEDUP step: collapse repeated imports.
//!
//! - Whole-module references are unique by `(module, alias)`.
//! - Grouped references from the same source (`module` + relative level)
//!   collapse into one, holding the union of their imported names.
//!
//! Both lists keep first-seen order of their keys. The imported names inside a
//! grouped reference are sorted, so the output is the same no matter how many
//! times the same reference was seen or in which fragment.

use indexmap::{IndexMap, IndexSet};

use crate::model::ReferenceDeclaration;

/// Deduplicated references, split by form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DedupedReferences {
    /// `import x` / `import x as y`, first-seen order.
    pub modules: Vec<ReferenceDeclaration>,
    /// `from x import ...`, one per source, first-seen order.
    pub grouped: Vec<ReferenceDeclaration>,
}

impl DedupedReferences {
    /// Total number of references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len() + self.grouped.len()
    }

    /// Returns `true` if there are no references.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.grouped.is_empty()
    }

    /// Module references, then grouped references.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceDeclaration> {
        self.modules.iter().chain(&self.grouped)
    }
}

/// Collapse `refs` into their minimal form.
#[must_use]
pub fn deduplicate<'a>(refs: impl IntoIterator<Item = &'a ReferenceDeclaration>) -> DedupedReferences {
    let mut modules: IndexSet<(&str, Option<&str>)> = IndexSet::new();
    let mut grouped: IndexMap<(&str, usize), ReferenceDeclaration> = IndexMap::new();

    for reference in refs {
        match reference {
            ReferenceDeclaration::Module { module, alias } => {
                modules.insert((module.as_str(), alias.as_deref()));
            }
            ReferenceDeclaration::Grouped {
                module,
                level,
                names,
            } => {
                let slot = grouped
                    .entry((module.as_str(), *level))
                    .or_insert_with(|| ReferenceDeclaration::grouped(module.as_str(), *level, []));
                if let ReferenceDeclaration::Grouped { names: merged, .. } = slot {
                    merged.extend(names.iter().cloned());
                }
            }
        }
    }

    DedupedReferences {
        modules: modules
            .into_iter()
            .map(|(module, alias)| ReferenceDeclaration::module(module, alias.map(str::to_owned)))
            .collect(),
        grouped: grouped.into_values().collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
