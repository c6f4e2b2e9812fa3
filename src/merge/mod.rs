//! Deterministic N-way structural merge of Python fragments.
//!
//! Implements the parse → combine → dedup → order → assemble pipeline. Each
//! step is a separate module:
//!
//! - **parse**: decompose each fragment into categorized declarations.
//! - **combine**: fold fragments together, first definition wins.
//! - **dedup**: collapse repeated imports.
//! - **deps** / **order**: emit classes after the classes they refer to.
//! - **assemble**: serialize in a fixed section order.
//! - **pipeline**: run the steps and collect warnings ([`Merger`]).
//!
//! # Determinism guarantee
//!
//! The same ordered list of inputs always produces byte-identical output:
//!
//! - Every map keeps first-seen order; nothing iterates a hash map.
//! - Ties in the class ordering break alphabetically.
//! - Functions, imported names, and `__all__` entries are sorted.

pub mod assemble;
pub mod combine;
pub mod dedup;
pub mod deps;
pub mod order;
pub mod parse;
pub mod pipeline;

pub use pipeline::{FragmentSource, MergeResult, Merger, merge};
