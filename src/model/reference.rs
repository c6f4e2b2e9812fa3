//! External-reference declarations (`import` statements).

use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Write as _;

// ---------------------------------------------------------------------------
// ImportedName
// ---------------------------------------------------------------------------

/// One name imported by a grouped reference, with its optional alias.
///
/// Ordering is `(name, alias)` so grouped references render sorted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImportedName {
    /// The imported name (`"*"` for a wildcard).
    pub name: String,
    /// The local alias, if any.
    pub alias: Option<String>,
}

impl ImportedName {
    /// A name imported without an alias.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// A name imported under an alias.
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Returns `true` for `from m import *`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.name == "*"
    }
}

impl fmt::Display for ImportedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} as {alias}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// ReferenceDeclaration
// ---------------------------------------------------------------------------

/// An external-reference declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReferenceDeclaration {
    /// `import module` / `import module as alias`.
    Module {
        /// Dotted module path.
        module: String,
        /// Local alias, if any.
        alias: Option<String>,
    },
    /// `from module import a, b as c`, possibly relative (`from ..pkg import x`).
    Grouped {
        /// Dotted module path without the leading dots (may be empty for
        /// `from . import x`).
        module: String,
        /// Number of leading dots.
        level: usize,
        /// Imported names.
        names: BTreeSet<ImportedName>,
    },
}

impl ReferenceDeclaration {
    /// Build a whole-module reference.
    pub fn module(module: impl Into<String>, alias: Option<String>) -> Self {
        Self::Module {
            module: module.into(),
            alias,
        }
    }

    /// Build a grouped reference.
    pub fn grouped(
        module: impl Into<String>,
        level: usize,
        names: impl IntoIterator<Item = ImportedName>,
    ) -> Self {
        Self::Grouped {
            module: module.into(),
            level,
            names: names.into_iter().collect(),
        }
    }

    /// The module path as written after `from`, including leading dots.
    #[must_use]
    pub fn source_path(&self) -> String {
        match self {
            Self::Module { module, .. } => module.clone(),
            Self::Grouped { module, level, .. } => format!("{}{module}", ".".repeat(*level)),
        }
    }

    /// Render as source text, wrapping grouped imports longer than
    /// `line_width` into a parenthesized one-name-per-line form.
    ///
    /// A wildcard cannot share a statement with named imports, so it is
    /// emitted on its own line first.
    #[must_use]
    pub fn render(&self, line_width: usize) -> String {
        match self {
            Self::Module {
                module,
                alias: None,
            } => format!("import {module}"),
            Self::Module {
                module,
                alias: Some(alias),
            } => format!("import {module} as {alias}"),
            Self::Grouped { names, .. } => {
                let source = self.source_path();
                let (wildcards, named): (Vec<&ImportedName>, Vec<&ImportedName>) =
                    names.iter().partition(|n| n.is_wildcard());

                let mut lines = Vec::new();
                if !wildcards.is_empty() {
                    lines.push(format!("from {source} import *"));
                }
                if !named.is_empty() {
                    let joined = named
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    let single = format!("from {source} import {joined}");
                    if single.len() <= line_width {
                        lines.push(single);
                    } else {
                        let mut wrapped = format!("from {source} import (\n");
                        for name in &named {
                            let _ = writeln!(wrapped, "    {name},");
                        }
                        wrapped.push(')');
                        lines.push(wrapped);
                    }
                }
                lines.join("\n")
            }
        }
    }
}

impl fmt::Display for ReferenceDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(usize::MAX))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_whole_module_references() {
        assert_eq!(ReferenceDeclaration::module("os", None).to_string(), "import os");
        assert_eq!(
            ReferenceDeclaration::module("numpy", Some("np".to_owned())).to_string(),
            "import numpy as np"
        );
    }

    #[test]
    fn renders_grouped_reference_sorted() {
        let r = ReferenceDeclaration::grouped(
            "typing",
            0,
            [ImportedName::plain("Optional"), ImportedName::plain("List")],
        );
        assert_eq!(r.to_string(), "from typing import List, Optional");
    }

    #[test]
    fn renders_relative_reference() {
        let r = ReferenceDeclaration::grouped("", 1, [ImportedName::aliased("models", "m")]);
        assert_eq!(r.to_string(), "from . import models as m");
        let r = ReferenceDeclaration::grouped("pkg.sub", 2, [ImportedName::plain("x")]);
        assert_eq!(r.to_string(), "from ..pkg.sub import x");
    }

    #[test]
    fn wildcard_gets_its_own_statement() {
        let r = ReferenceDeclaration::grouped(
            "m",
            0,
            [ImportedName::plain("*"), ImportedName::plain("a")],
        );
        assert_eq!(r.to_string(), "from m import *\nfrom m import a");
    }

    #[test]
    fn long_grouped_reference_wraps() {
        let r = ReferenceDeclaration::grouped(
            "pkg",
            0,
            ["alpha", "beta", "gamma"].map(ImportedName::plain),
        );
        assert_eq!(
            r.render(20),
            "from pkg import (\n    alpha,\n    beta,\n    gamma,\n)"
        );
    }
}
