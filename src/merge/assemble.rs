//! ASSEMBLE step: serialize the merged model as one source file.
//!
//! Sections are emitted in a fixed order:
//!
//! 1. preamble comments and module docstring
//! 2. environment declarations, whole-module imports, grouped imports
//! 3. conditional blocks
//! 4. constants
//! 5. classes, in dependency order
//! 6. functions, sorted by name
//! 7. unclassified statements
//! 8. `__all__`
//!
//! Classes and functions are separated from their neighbours by two blank
//! lines, every other pair of sections by one. Decorators are part of a
//! declaration's own text, so they can never drift away from it.

use std::collections::BTreeSet;

use super::combine::MergedModel;
use super::dedup::DedupedReferences;
use crate::config::AssembleConfig;

/// Everything the assembler needs: the merged model plus the results of the
/// dedup and order steps.
#[derive(Clone, Copy, Debug)]
pub struct Layout<'a> {
    /// The merged declarations.
    pub model: &'a MergedModel,
    /// Deduplicated environment declarations.
    pub environment: &'a DedupedReferences,
    /// Deduplicated ordinary references.
    pub references: &'a DedupedReferences,
    /// Class names in emission order.
    pub type_order: &'a [String],
}

/// One block of output and whether it is a class or function.
struct Section {
    text: String,
    definition: bool,
}

impl Section {
    const fn plain(text: String) -> Self {
        Self {
            text,
            definition: false,
        }
    }

    const fn definition(text: String) -> Self {
        Self {
            text,
            definition: true,
        }
    }
}

/// Names listed in the generated `__all__`.
#[must_use]
pub fn export_names(model: &MergedModel, config: &AssembleConfig) -> BTreeSet<String> {
    let mut names = model.exports.clone();
    if config.generate_exports {
        names.extend(model.type_declarations.keys().cloned());
        names.extend(model.callable_declarations.keys().cloned());
    }
    names
}

/// Render the merged file. Returns an empty string when there is nothing to
/// emit; otherwise the text ends with exactly one newline.
#[must_use]
pub fn assemble(layout: &Layout<'_>, config: &AssembleConfig) -> String {
    let model = layout.model;
    let mut sections: Vec<Section> = Vec::new();

    let head: Vec<&str> = model
        .preamble
        .iter()
        .map(String::as_str)
        .chain(model.documentation.as_deref())
        .collect();
    if !head.is_empty() {
        sections.push(Section::plain(head.join("\n")));
    }

    let imports: Vec<String> = layout
        .environment
        .iter()
        .chain(layout.references.iter())
        .map(|r| r.render(config.line_width))
        .collect();
    if !imports.is_empty() {
        sections.push(Section::plain(imports.join("\n")));
    }

    for block in &model.conditional_blocks {
        sections.push(Section::plain(block.clone()));
    }

    if !model.constants.is_empty() {
        let constants: Vec<&str> = model.constants.iter().map(|c| c.text.as_str()).collect();
        sections.push(Section::plain(constants.join("\n")));
    }

    for name in layout.type_order {
        if let Some(decl) = model.type_declarations.get(name) {
            sections.push(Section::definition(decl.render()));
        }
    }

    let mut callables: Vec<_> = model.callable_declarations.values().collect();
    callables.sort_by(|a, b| a.name.cmp(&b.name));
    for callable in callables {
        sections.push(Section::definition(callable.source.clone()));
    }

    if !model.unclassified.is_empty() {
        sections.push(Section::plain(model.unclassified.join("\n")));
    }

    let exports = export_names(model, config);
    if !exports.is_empty() {
        let mut all = String::from("__all__ = [\n");
        for name in &exports {
            all.push_str("    \"");
            all.push_str(name);
            all.push_str("\",\n");
        }
        all.push(']');
        sections.push(Section::plain(all));
    }

    join_sections(&sections)
}

fn join_sections(sections: &[Section]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Section> = None;
    for section in sections {
        if let Some(p) = prev {
            out.push_str(if p.definition || section.definition {
                "\n\n\n"
            } else {
                "\n\n"
            });
        }
        out.push_str(section.text.trim_end());
        prev = Some(section);
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
