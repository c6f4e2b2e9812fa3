//! The merge pipeline: parse → combine → dedup → order → assemble.
//!
//! [`Merger::merge`] is the only entry point most callers need. It never
//! fails: every input that cannot be read or parsed is skipped with a warning,
//! and every conflict is resolved "first wins" with a warning. The worst case
//! is an empty `content` with the warning `No valid files to merge`.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::assemble::{Layout, assemble};
use super::combine::MergedModel;
use super::dedup::deduplicate;
use super::deps::dependency_edges;
use super::order::order;
use super::parse::parse_fragment_with_config;
use crate::config::WeldConfig;
use crate::error::MergeError;
use crate::model::ParsedFragment;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Where one input comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FragmentSource {
    /// In-memory text with a diagnostic label.
    Text {
        /// Python source, optionally wrapped in a code fence.
        text: String,
        /// Label used in warnings.
        origin: String,
    },
    /// A file read when the merge runs. Its display form is the label.
    Path(PathBuf),
}

impl FragmentSource {
    /// In-memory text.
    pub fn text(text: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            origin: origin.into(),
        }
    }

    /// A file on disk.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// The label used in warnings.
    #[must_use]
    pub fn origin(&self) -> String {
        match self {
            Self::Text { origin, .. } => origin.clone(),
            Self::Path(path) => path.display().to_string(),
        }
    }

    /// Load the source text.
    ///
    /// # Errors
    /// Returns [`MergeError::Read`] if a path cannot be read.
    pub fn load(&self) -> Result<String, MergeError> {
        match self {
            Self::Text { text, .. } => Ok(text.clone()),
            Self::Path(path) => std::fs::read_to_string(path).map_err(|source| MergeError::Read {
                origin: self.origin(),
                source,
            }),
        }
    }
}

/// The outcome of a merge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeResult {
    /// The merged file, empty when nothing could be merged.
    pub content: String,
    /// Skipped inputs and resolved conflicts, in the order they occurred.
    pub warnings: Vec<String>,
    /// Classes in the order they appear in `content`.
    pub merged_type_names: Vec<String>,
    /// Functions in the order they appear in `content`.
    pub merged_callable_names: Vec<String>,
    /// Number of distinct references after deduplication, excluding
    /// environment declarations. A grouped source counts once even when a
    /// wildcard gives it a second `from ... import` line.
    pub deduplicated_reference_count: usize,
}

// ---------------------------------------------------------------------------
// Merger
// ---------------------------------------------------------------------------

/// Runs merges with a fixed configuration.
#[derive(Clone, Debug, Default)]
pub struct Merger {
    config: WeldConfig,
}

impl Merger {
    /// A merger using `config`.
    #[must_use]
    pub const fn new(config: WeldConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &WeldConfig {
        &self.config
    }

    /// Merge `fragments` (and optionally an existing `target`) into one file.
    ///
    /// With `include_target_first` the target is absorbed before the
    /// fragments, so its declarations win every collision. Otherwise it is
    /// absorbed after them.
    #[must_use]
    #[instrument(name = "merge", skip_all, fields(fragments = fragments.len(), target = target.is_some()))]
    pub fn merge(
        &self,
        target: Option<&FragmentSource>,
        fragments: &[FragmentSource],
        include_target_first: bool,
    ) -> MergeResult {
        let mut warnings = Vec::new();
        let mut parsed = Vec::with_capacity(fragments.len() + 1);

        let inputs = target
            .filter(|_| include_target_first)
            .into_iter()
            .chain(fragments)
            .chain(target.filter(|_| !include_target_first));
        for source in inputs {
            match self.parse_source(source) {
                Ok(fragment) => parsed.push(fragment),
                Err(err) => warnings.push(err.skip_notice(&source.origin())),
            }
        }

        if parsed.is_empty() {
            warnings.push("No valid files to merge".to_owned());
            return finish(MergeResult {
                warnings,
                ..MergeResult::default()
            });
        }

        let mut model = MergedModel::new();
        for fragment in &parsed {
            model.absorb(fragment);
        }
        warnings.append(&mut model.warnings);

        let environment = deduplicate(&model.environment);
        let references = deduplicate(&model.references);

        let edges = dependency_edges(&model.type_declarations);
        let topo = order(&model.type_declarations, &edges);
        debug!(edges = edges.len(), "ordered classes");
        if topo.has_cycle() && self.config.diagnostics.warn_on_cycles {
            warnings.push(format!(
                "Dependency cycle among [{}] — ordered alphabetically",
                topo.cyclic.join(", ")
            ));
        }

        let layout = Layout {
            model: &model,
            environment: &environment,
            references: &references,
            type_order: &topo.names,
        };
        let content = assemble(&layout, &self.config.assemble);

        if self.config.diagnostics.verify_output
            && !content.is_empty()
            && let Err(err) = parse_fragment_with_config(&content, "<merged>", &self.config.parse)
        {
            warnings.push(format!("Merged output is not valid source: {err}"));
        }

        let mut merged_callable_names: Vec<String> =
            model.callable_declarations.keys().cloned().collect();
        merged_callable_names.sort();

        finish(MergeResult {
            content,
            warnings,
            merged_type_names: topo.names,
            merged_callable_names,
            deduplicated_reference_count: references.len(),
        })
    }

    fn parse_source(&self, source: &FragmentSource) -> Result<ParsedFragment, MergeError> {
        let origin = source.origin();
        let text = source.load()?;
        let fragment = parse_fragment_with_config(&text, &origin, &self.config.parse)?;
        debug!(
            origin = %origin,
            types = fragment.type_declarations.len(),
            callables = fragment.callable_declarations.len(),
            references = fragment.references.len(),
            "parsed fragment"
        );
        Ok(fragment)
    }
}

/// Log the outcome and hand it back.
fn finish(result: MergeResult) -> MergeResult {
    for warning in &result.warnings {
        warn!("{warning}");
    }
    info!(
        types = result.merged_type_names.len(),
        callables = result.merged_callable_names.len(),
        references = result.deduplicated_reference_count,
        warnings = result.warnings.len(),
        bytes = result.content.len(),
        "merge complete"
    );
    result
}

/// Merge with the default configuration.
#[must_use]
pub fn merge(
    target: Option<&FragmentSource>,
    fragments: &[FragmentSource],
    include_target_first: bool,
) -> MergeResult {
    Merger::default().merge(target, fragments, include_target_first)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
