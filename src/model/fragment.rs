//! The categorized decomposition of one input source.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use indexmap::map::Entry;

use super::decl::{CallableDeclaration, Constant, TypeDeclaration};
use super::reference::ReferenceDeclaration;

// ---------------------------------------------------------------------------
// Declaration
// ---------------------------------------------------------------------------

/// One classified top-level statement.
///
/// The parser produces exactly one `Declaration` per statement (a multi-name
/// `import a, b` produces one per name) and files it with
/// [`ParsedFragment::push`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Declaration {
    /// The module docstring literal, quotes included.
    Documentation(String),
    /// A compatibility pragma (`from __future__ import ...`).
    Environment(ReferenceDeclaration),
    /// An ordinary `import` / `from ... import`.
    Reference(ReferenceDeclaration),
    /// A guarded block (`if TYPE_CHECKING:`), verbatim.
    Conditional(String),
    /// A class.
    Type(TypeDeclaration),
    /// A function.
    Callable(CallableDeclaration),
    /// A module-level binding.
    Constant(Constant),
    /// Names listed in `__all__`.
    Exports(BTreeSet<String>),
    /// Anything else, verbatim.
    Unclassified(String),
}

// ---------------------------------------------------------------------------
// ParsedFragment
// ---------------------------------------------------------------------------

/// A parsed fragment, bucketed by declaration category.
///
/// Immutable once the parser hands it out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedFragment {
    origin: String,
    /// Comment lines above the first statement (shebang, license header).
    pub preamble: Vec<String>,
    /// Module docstring.
    pub documentation: Option<String>,
    /// `from __future__` pragmas.
    pub environment_declarations: Vec<ReferenceDeclaration>,
    /// Ordinary imports in source order.
    pub references: Vec<ReferenceDeclaration>,
    /// Guarded blocks, verbatim.
    pub conditional_blocks: Vec<String>,
    /// Classes by name (first definition in this fragment).
    pub type_declarations: IndexMap<String, TypeDeclaration>,
    /// Functions by name (first definition in this fragment).
    pub callable_declarations: IndexMap<String, CallableDeclaration>,
    /// Module-level bindings in source order.
    pub constants: Vec<Constant>,
    /// Union of every `__all__` in the fragment.
    pub export_list: Option<BTreeSet<String>>,
    /// Everything else, in source order.
    pub unclassified: Vec<String>,
    /// Later definitions of a class or function name already defined in this
    /// fragment. The merger folds them in after the first definitions.
    pub redefinitions: Vec<Declaration>,
}

impl ParsedFragment {
    /// An empty fragment labelled `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }

    /// The label used in diagnostics.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// File a classified statement into its bucket.
    pub fn push(&mut self, declaration: Declaration) {
        match declaration {
            Declaration::Documentation(doc) => {
                if self.documentation.is_none() {
                    self.documentation = Some(doc);
                } else {
                    self.unclassified.push(doc);
                }
            }
            Declaration::Environment(r) => self.environment_declarations.push(r),
            Declaration::Reference(r) => self.references.push(r),
            Declaration::Conditional(block) => self.conditional_blocks.push(block),
            Declaration::Type(decl) => match self.type_declarations.entry(decl.name.clone()) {
                Entry::Occupied(_) => self.redefinitions.push(Declaration::Type(decl)),
                Entry::Vacant(slot) => {
                    slot.insert(decl);
                }
            },
            Declaration::Callable(decl) => {
                match self.callable_declarations.entry(decl.name.clone()) {
                    Entry::Occupied(_) => self.redefinitions.push(Declaration::Callable(decl)),
                    Entry::Vacant(slot) => {
                        slot.insert(decl);
                    }
                }
            }
            Declaration::Constant(c) => self.constants.push(c),
            Declaration::Exports(names) => {
                self.export_list.get_or_insert_with(BTreeSet::new).extend(names);
            }
            Declaration::Unclassified(text) => self.unclassified.push(text),
        }
    }

    /// Returns `true` when the fragment holds no statements at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.preamble.is_empty()
            && self.documentation.is_none()
            && self.environment_declarations.is_empty()
            && self.references.is_empty()
            && self.conditional_blocks.is_empty()
            && self.type_declarations.is_empty()
            && self.callable_declarations.is_empty()
            && self.constants.is_empty()
            && self.export_list.is_none()
            && self.unclassified.is_empty()
            && self.redefinitions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
