//! Merge engine configuration (`weld.toml`).
//!
//! Every field has a default, so a missing file or an empty table behaves the
//! same as [`WeldConfig::default`].
//!
//! ```toml
//! [parse]
//! strip_code_fences = true
//! guard_names = ["TYPE_CHECKING"]
//! environment_module = "__future__"
//!
//! [assemble]
//! generate_exports = true
//! line_width = 88
//!
//! [diagnostics]
//! warn_on_cycles = true
//! verify_output = true
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level merge configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeldConfig {
    /// Parser settings.
    #[serde(default)]
    pub parse: ParseConfig,

    /// Output layout settings.
    #[serde(default)]
    pub assemble: AssembleConfig,

    /// Which anomalies are reported as warnings.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

// ---------------------------------------------------------------------------
// ParseConfig
// ---------------------------------------------------------------------------

/// How fragments are decomposed.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParseConfig {
    /// Remove a surrounding ```` ``` ```` fence before parsing.
    #[serde(default = "default_true")]
    pub strip_code_fences: bool,

    /// Identifiers whose `if` blocks are kept verbatim as conditional blocks.
    /// Matched against the last segment of the condition (`typing.TYPE_CHECKING`
    /// matches `TYPE_CHECKING`).
    #[serde(default = "default_guard_names")]
    pub guard_names: Vec<String>,

    /// Module whose imports are environment declarations, always emitted first.
    #[serde(default = "default_environment_module")]
    pub environment_module: String,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            strip_code_fences: true,
            guard_names: default_guard_names(),
            environment_module: default_environment_module(),
        }
    }
}

impl ParseConfig {
    /// Returns `true` if `condition` (source text of an `if` test) is a guard.
    #[must_use]
    pub fn is_guard(&self, condition: &str) -> bool {
        let last = condition.rsplit('.').next().unwrap_or(condition).trim();
        self.guard_names.iter().any(|g| g == last)
    }
}

fn default_guard_names() -> Vec<String> {
    vec!["TYPE_CHECKING".to_owned()]
}

fn default_environment_module() -> String {
    "__future__".to_owned()
}

const fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// AssembleConfig
// ---------------------------------------------------------------------------

/// How the merged file is laid out.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssembleConfig {
    /// Emit a generated `__all__` listing every merged class and function.
    /// When off, only names from explicit `__all__` lists are emitted.
    #[serde(default = "default_true")]
    pub generate_exports: bool,

    /// Grouped imports longer than this are wrapped in parentheses.
    #[serde(default = "default_line_width")]
    pub line_width: usize,
}

impl Default for AssembleConfig {
    fn default() -> Self {
        Self {
            generate_exports: true,
            line_width: default_line_width(),
        }
    }
}

const fn default_line_width() -> usize {
    88
}

// ---------------------------------------------------------------------------
// DiagnosticsConfig
// ---------------------------------------------------------------------------

/// Optional warnings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Warn when cyclic class dependencies force the alphabetical fallback.
    #[serde(default = "default_true")]
    pub warn_on_cycles: bool,

    /// Reparse the merged output and warn if it is not valid source.
    #[serde(default = "default_true")]
    pub verify_output: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            warn_on_cycles: true,
            verify_output: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// A `weld.toml` that could not be read or did not deserialize.
#[derive(Debug)]
pub struct ConfigError {
    /// File the settings came from; `None` for [`WeldConfig::parse`].
    pub path: Option<PathBuf>,
    /// 1-based line of the offending key, when TOML reports a span.
    pub line: Option<usize>,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}", path.display())?,
            None => f.write_str("weld config")?,
        }
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl WeldConfig {
    /// Read merge settings from `path`.
    ///
    /// An absent file means "use the defaults": a project only needs a
    /// `weld.toml` to change something.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file exists but cannot be read, or if its
    /// contents are rejected by [`WeldConfig::parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    line: None,
                    message: e.to_string(),
                });
            }
        };
        Self::parse(&contents).map_err(|e| ConfigError {
            path: Some(path.to_owned()),
            ..e
        })
    }

    /// Deserialize merge settings from TOML text. Omitted sections and keys
    /// keep their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for malformed TOML, a value of the wrong type,
    /// or a key no section defines.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e: toml::de::Error| ConfigError {
            path: None,
            line: e
                .span()
                .map(|span| text[..span.start].matches('\n').count() + 1),
            message: e.message().to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
