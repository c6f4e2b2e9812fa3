//! Error types for the merge engine.
//!
//! Defines [`MergeError`], raised by the parser and by fragment loading. The
//! pipeline never lets one escape: each becomes a skip notice in the merge
//! warnings, worded so an operator can tell which input was dropped and why.

use std::fmt;

// ---------------------------------------------------------------------------
// MergeError
// ---------------------------------------------------------------------------

/// Errors from parsing or loading a single input.
#[derive(Debug)]
pub enum MergeError {
    /// The input is not valid Python.
    Syntax {
        /// Diagnostic label of the input.
        origin: String,
        /// Where the parser gave up.
        message: String,
    },

    /// The input was given as a path that could not be read.
    Read {
        /// Diagnostic label of the input (the path).
        origin: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The tree-sitter grammar could not be loaded.
    ParserSetup(String),
}

impl MergeError {
    /// The warning recorded when the pipeline skips the offending input.
    #[must_use]
    pub fn skip_notice(&self, origin: &str) -> String {
        match self {
            Self::Syntax { message, .. } => {
                format!("Skipping {origin} due to syntax error: {message}")
            }
            Self::Read { source, .. } => {
                format!("Skipping {origin}: could not read file: {source}")
            }
            Self::ParserSetup(msg) => format!("Skipping {origin}: parser unavailable: {msg}"),
        }
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { origin, message } => write!(f, "syntax error in {origin}: {message}"),
            Self::Read { origin, source } => write!(f, "could not read {origin}: {source}"),
            Self::ParserSetup(msg) => write!(f, "parser setup failed: {msg}"),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Syntax { .. } | Self::ParserSetup(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
