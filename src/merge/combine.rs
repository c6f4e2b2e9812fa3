//! COMBINE step: fold parsed fragments into one merged model.
//!
//! Every collision resolves the same way: the declaration seen first wins,
//! the later one contributes only what the first lacks, and each discarded
//! piece is recorded as a warning. Nothing is dropped silently.
//!
//! | Collision | Outcome |
//! |---|---|
//! | class / class | bodies merged member by member ([`merge_types`]) |
//! | member / member (same key) | existing kept, `Duplicate member` warning |
//! | function / function | existing kept, `Duplicate function` warning |
//! | constant / constant | existing kept, warning only if the text differs |
//! | identical conditional or unclassified text | kept once |

use std::collections::BTreeSet;

use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::debug;

use crate::model::{
    CallableDeclaration, Constant, Declaration, MemberKind, ParsedFragment, ReferenceDeclaration,
    TypeDeclaration,
};

// ---------------------------------------------------------------------------
// Type merge
// ---------------------------------------------------------------------------

/// Merge `incoming` into a copy of `existing`.
///
/// The existing header (decorators, bases, keywords) is authoritative. Keyed
/// incoming members are appended only when the key is new. A docstring is
/// adopted only when the existing body has none, `pass` never survives next to
/// real members, and other unkeyed statements are appended unless an identical
/// one is already present.
///
/// Returns the merged declaration and the warnings produced.
#[must_use]
pub fn merge_types(
    existing: &TypeDeclaration,
    incoming: &TypeDeclaration,
) -> (TypeDeclaration, Vec<String>) {
    let mut merged = existing.clone();
    let mut warnings = Vec::new();
    let mut changed = false;

    if incoming.bases != existing.bases || incoming.attached_modifiers != existing.attached_modifiers
    {
        warnings.push(format!(
            "Conflicting header for '{}' — keeping existing",
            existing.name
        ));
    }

    for member in &incoming.members {
        match (&member.key, &member.kind) {
            (Some(key), _) => {
                if merged.member(key).is_some() {
                    warnings.push(format!(
                        "Duplicate member '{}.{key}' — keeping existing",
                        existing.name
                    ));
                } else {
                    merged.members.push(member.clone());
                    changed = true;
                }
            }
            (None, MemberKind::Docstring) => {
                if !merged
                    .members
                    .iter()
                    .any(|m| matches!(m.kind, MemberKind::Docstring))
                {
                    merged.members.insert(0, member.clone());
                    changed = true;
                }
            }
            (None, MemberKind::Pass) => {}
            (None, _) => {
                if !merged.members.iter().any(|m| m.text == member.text) {
                    merged.members.push(member.clone());
                    changed = true;
                }
            }
        }
    }

    if changed {
        if merged
            .members
            .iter()
            .any(|m| !matches!(m.kind, MemberKind::Pass))
        {
            merged.members.retain(|m| !matches!(m.kind, MemberKind::Pass));
        }
        merged.source = None;
    }

    (merged, warnings)
}

// ---------------------------------------------------------------------------
// MergedModel
// ---------------------------------------------------------------------------

/// Everything collected from the fragments absorbed so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergedModel {
    /// Preamble comments of the first fragment that had any.
    pub preamble: Vec<String>,
    /// Docstring of the first fragment that had one.
    pub documentation: Option<String>,
    /// Environment declarations, not yet deduplicated.
    pub environment: Vec<ReferenceDeclaration>,
    /// Ordinary references, not yet deduplicated.
    pub references: Vec<ReferenceDeclaration>,
    /// Guarded blocks, each distinct text once.
    pub conditional_blocks: Vec<String>,
    /// Constants, first definition of each name.
    pub constants: Vec<Constant>,
    /// Classes in first-seen order.
    pub type_declarations: IndexMap<String, TypeDeclaration>,
    /// Functions in first-seen order.
    pub callable_declarations: IndexMap<String, CallableDeclaration>,
    /// Unclassified statements, each distinct text once.
    pub unclassified: Vec<String>,
    /// Union of every explicit `__all__`.
    pub exports: BTreeSet<String>,
    /// Conflicts recorded while absorbing.
    pub warnings: Vec<String>,
}

impl MergedModel {
    /// An empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment into the model.
    pub fn absorb(&mut self, fragment: &ParsedFragment) {
        debug!(
            origin = fragment.origin(),
            types = fragment.type_declarations.len(),
            callables = fragment.callable_declarations.len(),
            "absorbing fragment"
        );

        if self.preamble.is_empty() {
            self.preamble.clone_from(&fragment.preamble);
        }
        if self.documentation.is_none() {
            self.documentation.clone_from(&fragment.documentation);
        }
        self.environment
            .extend(fragment.environment_declarations.iter().cloned());
        self.references.extend(fragment.references.iter().cloned());
        for block in &fragment.conditional_blocks {
            push_distinct(&mut self.conditional_blocks, block);
        }
        for constant in &fragment.constants {
            self.absorb_constant(constant);
        }
        for decl in fragment.type_declarations.values() {
            self.absorb_type(decl);
        }
        for decl in fragment.callable_declarations.values() {
            self.absorb_callable(decl);
        }
        if let Some(exports) = &fragment.export_list {
            self.exports.extend(exports.iter().cloned());
        }
        for text in &fragment.unclassified {
            push_distinct(&mut self.unclassified, text);
        }
        for redefinition in &fragment.redefinitions {
            match redefinition {
                Declaration::Type(decl) => self.absorb_type(decl),
                Declaration::Callable(decl) => self.absorb_callable(decl),
                _ => {}
            }
        }
    }

    fn absorb_type(&mut self, decl: &TypeDeclaration) {
        match self.type_declarations.entry(decl.name.clone()) {
            Entry::Occupied(mut slot) => {
                let (merged, warnings) = merge_types(slot.get(), decl);
                debug!(name = %decl.name, members = merged.members.len(), "merged class");
                slot.insert(merged);
                self.warnings.extend(warnings);
            }
            Entry::Vacant(slot) => {
                slot.insert(decl.clone());
            }
        }
    }

    fn absorb_callable(&mut self, decl: &CallableDeclaration) {
        match self.callable_declarations.entry(decl.name.clone()) {
            Entry::Occupied(_) => self.warnings.push(format!(
                "Duplicate function '{}' — keeping existing",
                decl.name
            )),
            Entry::Vacant(slot) => {
                slot.insert(decl.clone());
            }
        }
    }

    fn absorb_constant(&mut self, constant: &Constant) {
        let existing = self.constants.iter().find(|c| match (&c.name, &constant.name) {
            (Some(a), Some(b)) => a == b,
            (None, None) => c.text == constant.text,
            _ => false,
        });
        match (existing, &constant.name) {
            (None, _) => self.constants.push(constant.clone()),
            (Some(c), Some(name)) if c.text != constant.text => self.warnings.push(format!(
                "Duplicate constant '{name}' — keeping existing"
            )),
            (Some(_), _) => {}
        }
    }
}

fn push_distinct(list: &mut Vec<String>, text: &str) {
    if !list.iter().any(|t| t == text) {
        list.push(text.to_owned());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::parse::parse_fragment;

    fn fragment(src: &str) -> ParsedFragment {
        parse_fragment(src, "t.py").unwrap()
    }

    fn class(src: &str) -> TypeDeclaration {
        fragment(src).type_declarations.swap_remove_index(0).unwrap().1
    }

    fn model(sources: &[&str]) -> MergedModel {
        let mut m = MergedModel::new();
        for src in sources {
            m.absorb(&fragment(src));
        }
        m
    }

    #[test]
    fn new_members_are_appended() {
        let a = class("class Foo:\n    x: int = 0\n");
        let b = class("class Foo:\n    y: str = ''\n\n    def run(self) -> None:\n        pass\n");
        let (merged, warnings) = merge_types(&a, &b);
        assert!(warnings.is_empty());
        let keys: Vec<_> = merged.members.iter().filter_map(|m| m.key.clone()).collect();
        assert_eq!(keys, vec!["x", "y", "run"]);
        assert!(merged.source.is_none());
        assert_eq!(
            merged.render(),
            "class Foo:\n    x: int = 0\n    y: str = ''\n\n    def run(self) -> None:\n        pass"
        );
    }

    #[test]
    fn colliding_member_keeps_existing_and_warns_once() {
        let a = class("class Foo:\n    def bar(self):\n        return 1\n");
        let b = class("class Foo:\n    def bar(self):\n        return 2\n");
        let (merged, warnings) = merge_types(&a, &b);
        assert_eq!(warnings, vec!["Duplicate member 'Foo.bar' — keeping existing"]);
        assert_eq!(merged, a);
        assert!(merged.render().contains("return 1"));
    }

    #[test]
    fn existing_is_not_mutated() {
        let a = class("class Foo:\n    x: int = 0\n");
        let before = a.clone();
        let _ = merge_types(&a, &class("class Foo:\n    y: int = 1\n"));
        assert_eq!(a, before);
    }

    #[test]
    fn header_conflict_keeps_existing_decorators() {
        let a = class("@dataclass\nclass Foo(Base):\n    x: int = 0\n");
        let b = class("class Foo(Other):\n    y: int = 0\n");
        let (merged, warnings) = merge_types(&a, &b);
        assert_eq!(warnings, vec!["Conflicting header for 'Foo' — keeping existing"]);
        assert_eq!(merged.attached_modifiers, vec!["@dataclass"]);
        assert!(merged.render().starts_with("@dataclass\nclass Foo(Base):\n"));
    }

    #[test]
    fn pass_is_dropped_once_body_has_members() {
        let a = class("class Foo:\n    pass\n");
        let b = class("class Foo:\n    x: int = 0\n");
        let (merged, _) = merge_types(&a, &b);
        assert_eq!(merged.render(), "class Foo:\n    x: int = 0");
    }

    #[test]
    fn docstring_adopted_only_when_missing() {
        let a = class("class Foo:\n    x: int = 0\n");
        let b = class("class Foo:\n    \"\"\"Docs.\"\"\"\n");
        let (merged, _) = merge_types(&a, &b);
        assert_eq!(merged.render(), "class Foo:\n    \"\"\"Docs.\"\"\"\n\n    x: int = 0");

        let c = class("class Foo:\n    \"\"\"Other.\"\"\"\n");
        let (again, warnings) = merge_types(&merged, &c);
        assert!(warnings.is_empty());
        assert_eq!(again.render(), merged.render());
    }

    #[test]
    fn identical_class_merges_to_verbatim_source() {
        let src = "class Foo:\n    x: int = 0\n";
        let (merged, warnings) = merge_types(&class(src), &class(src));
        assert_eq!(warnings, vec!["Duplicate member 'Foo.x' — keeping existing"]);
        assert_eq!(merged.source.as_deref(), Some("class Foo:\n    x: int = 0"));
    }

    #[test]
    fn duplicate_function_first_wins() {
        let m = model(&["def run():\n    return 1\n", "def run():\n    return 2\n"]);
        assert_eq!(m.callable_declarations.len(), 1);
        assert!(m.callable_declarations["run"].source.contains("return 1"));
        assert_eq!(m.warnings, vec!["Duplicate function 'run' — keeping existing"]);
    }

    #[test]
    fn constants_first_wins_and_warn_only_on_difference() {
        let m = model(&["A = 1\nB = 2\n", "A = 1\nB = 3\nC = 4\n"]);
        let texts: Vec<_> = m.constants.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A = 1", "B = 2", "C = 4"]);
        assert_eq!(m.warnings, vec!["Duplicate constant 'B' — keeping existing"]);
    }

    #[test]
    fn identical_blocks_are_kept_once() {
        let guard = "if TYPE_CHECKING:\n    from .a import A\n";
        let m = model(&[guard, guard, "print(1)\n", "print(1)\n"]);
        assert_eq!(m.conditional_blocks.len(), 1);
        assert_eq!(m.unclassified, vec!["print(1)"]);
    }

    #[test]
    fn first_documentation_and_preamble_win() {
        let m = model(&["\"\"\"First.\"\"\"\n", "# header\n\n\"\"\"Second.\"\"\"\n"]);
        assert_eq!(m.documentation.as_deref(), Some("\"\"\"First.\"\"\""));
        assert_eq!(m.preamble, vec!["# header"]);
    }

    #[test]
    fn redefinition_within_fragment_is_merged() {
        let m = model(&["class A:\n    x: int = 0\n\nclass A:\n    y: int = 0\n"]);
        let a = &m.type_declarations["A"];
        assert!(a.member("x").is_some());
        assert!(a.member("y").is_some());
    }

    #[test]
    fn exports_union() {
        let m = model(&["__all__ = ['b']\n", "__all__ = ['a']\n"]);
        let exports: Vec<_> = m.exports.iter().cloned().collect();
        assert_eq!(exports, vec!["a", "b"]);
    }
}
