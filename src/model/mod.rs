//! Declaration model: what a parsed fragment is made of.
//!
//! A fragment decomposes into a closed set of [`Declaration`] variants, filed
//! into the typed buckets of a [`ParsedFragment`]. Every later stage (dependency
//! analysis, ordering, deduplication, merging, assembly) works over these
//! types and never goes back to the syntax tree.

pub mod decl;
pub mod fragment;
pub mod reference;
pub mod type_ref;

pub use decl::{CallableDeclaration, Constant, Member, MemberKind, TypeDeclaration};
pub use fragment::{Declaration, ParsedFragment};
pub use reference::{ImportedName, ReferenceDeclaration};
pub use type_ref::TypeRef;
