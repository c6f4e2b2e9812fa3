//! weld: structural merge of independently written Python source fragments.
//!
//! Fragments (typically generated one class or function at a time) are
//! decomposed into declarations and recombined into one coherent module:
//! imports deduplicated, classes merged member by member and emitted after
//! the classes they depend on, decorators kept on their declarations, and an
//! `__all__` generated. Conflicts never abort a merge; they become warnings.
//!
//! ```no_run
//! use weld::{FragmentSource, merge};
//!
//! let fragments = [
//!     FragmentSource::text("class Role:\n    name: str\n", "role.py"),
//!     FragmentSource::text("class Message:\n    role: Role\n", "message.py"),
//! ];
//! let result = merge(None, &fragments, false);
//! assert_eq!(result.merged_type_names, ["Role", "Message"]);
//! ```

pub mod config;
pub mod error;
pub mod merge;
pub mod model;

pub use config::WeldConfig;
pub use error::MergeError;
pub use merge::{FragmentSource, MergeResult, Merger, merge};
