//! Documents and their structural checks.
//!
//! A `Document` is the LaTeX source of a resume. The only structure the service
//! cares about are the bookend markers; everything between them is passed through
//! untouched and any deeper problem surfaces later as a rendering failure.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker every well-formed document must contain before its body.
pub const START_MARKER: &str = r"\documentclass";
/// Marker every well-formed document must contain after its body.
pub const END_MARKER: &str = r"\end{document}";

/// Immutable markup text. Cloning is cheap; the text is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document(Arc<str>);

impl Document {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("missing-start-marker")]
    MissingStartMarker,
    #[error("missing-end-marker")]
    MissingEndMarker,
}

/// Checks that both bookend markers are present. The start marker is checked first.
pub fn validate(doc: &Document) -> Result<(), StructuralError> {
    if !doc.as_str().contains(START_MARKER) {
        return Err(StructuralError::MissingStartMarker);
    }
    if !doc.as_str().contains(END_MARKER) {
        return Err(StructuralError::MissingEndMarker);
    }
    Ok(())
}

/// Whether a structural failure stops the request or is only logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Blocking,
    Advisory,
}

impl std::str::FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocking" => Ok(ValidationMode::Blocking),
            "advisory" => Ok(ValidationMode::Advisory),
            other => Err(format!(
                "unknown validation mode '{other}' (expected 'blocking' or 'advisory')"
            )),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Advisory lint
// ────────────────────────────────────────────────────────────────────────────

/// A non-blocking finding about a document that will probably still render badly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintWarning {
    pub rule: &'static str,
    pub excerpt: String,
}

/// `\resumeProjectHeading{...}{ }` or `{...} {}`: the model split the empty second
/// argument, which the template macro chokes on.
static SPLIT_PROJECT_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\resumeProjectHeading(?s:.*?)\}(\s+\{\s*\}|\{\s+\})")
        .expect("static regex is valid")
});

const EXCERPT_CHARS: usize = 80;

/// Reports known malformed patterns. Never fails.
pub fn lint(doc: &Document) -> Vec<LintWarning> {
    SPLIT_PROJECT_HEADING
        .find_iter(doc.as_str())
        .map(|m| LintWarning {
            rule: "split-project-heading",
            excerpt: m.as_str().chars().take(EXCERPT_CHARS).collect(),
        })
        .collect()
}
