//! Diagnostic records produced during validation
//!
//! Validation collects as many independent findings as possible before
//! reporting, so every phase appends to a shared [`Diagnostics`] accumulator
//! instead of failing on the first problem. Each record carries a severity,
//! a stable machine-readable kind tag, a dotted path from the document root,
//! and a human-readable message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Stable error-kind tag for a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A field's value could not be coerced to any of its allowed shapes
    Shape,
    /// Unknown `extends` reference or an `extends` cycle
    Extends,
    /// Circular `include` chain
    IncludeCycle,
    /// The caller's include resolver failed to produce a fragment
    IncludeResolution,
    /// Unknown `needs` reference, stage-order violation, or `needs` cycle
    Dependency,
    /// Malformed rule or condition structure
    RuleSyntax,
    /// Degenerate or colliding `parallel`/`matrix` expansion
    Matrix,
    /// Duplicate job or stage name
    Uniqueness,
}

impl DiagnosticKind {
    /// Stable tag string, suitable for machine consumption
    pub fn tag(&self) -> &'static str {
        match self {
            DiagnosticKind::Shape => "shape",
            DiagnosticKind::Extends => "extends",
            DiagnosticKind::IncludeCycle => "include-cycle",
            DiagnosticKind::IncludeResolution => "include-resolution",
            DiagnosticKind::Dependency => "dependency",
            DiagnosticKind::RuleSyntax => "rule-syntax",
            DiagnosticKind::Matrix => "matrix",
            DiagnosticKind::Uniqueness => "uniqueness",
        }
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Error or warning
    pub severity: Severity,

    /// Stable error-kind tag
    pub kind: DiagnosticKind,

    /// Dotted path from the document root (e.g. `jobs.build.script`)
    pub path: String,

    /// Human-readable message
    pub message: String,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(kind: DiagnosticKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a warning diagnostic
    pub fn warning(
        kind: DiagnosticKind,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sev = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{} [{}] at {}: {}",
            sev,
            self.kind.tag(),
            self.path,
            self.message
        )
    }
}

/// Ordered accumulator of diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Diagnostics { items: Vec::new() }
    }

    /// Append a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Warning {
            log::warn!("{}", diagnostic);
        } else {
            log::debug!("{}", diagnostic);
        }
        self.items.push(diagnostic);
    }

    /// Append an error diagnostic
    pub fn error(&mut self, kind: DiagnosticKind, path: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::error(kind, path, message));
    }

    /// Append a warning diagnostic
    pub fn warning(
        &mut self,
        kind: DiagnosticKind,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::warning(kind, path, message));
    }

    /// True if any error-severity diagnostic has been recorded
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    /// Number of recorded diagnostics
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over recorded diagnostics in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Consume the accumulator, yielding the ordered diagnostic list
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    /// Move all diagnostics out of `other` into `self`
    pub fn absorb(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Serialize the recorded diagnostics as a JSON array
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(DiagnosticKind::Shape.tag(), "shape");
        assert_eq!(DiagnosticKind::IncludeCycle.tag(), "include-cycle");
        assert_eq!(DiagnosticKind::Uniqueness.tag(), "uniqueness");
    }

    #[test]
    fn test_has_errors_ignores_warnings() {
        let mut diags = Diagnostics::new();
        diags.warning(DiagnosticKind::Shape, "jobs.build", "no script");
        assert!(!diags.has_errors());

        diags.error(DiagnosticKind::Dependency, "jobs.test.needs", "unknown job");
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::error(DiagnosticKind::Extends, "jobs.deploy.extends", "cycle");
        assert_eq!(
            d.to_string(),
            "error [extends] at jobs.deploy.extends: cycle"
        );
    }

    #[test]
    fn test_json_uses_stable_tags() {
        let mut diags = Diagnostics::new();
        diags.error(DiagnosticKind::IncludeCycle, "include", "cycle");
        let json = diags.to_json().unwrap();
        assert!(json.contains("\"include-cycle\""), "{json}");
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut diags = Diagnostics::new();
        diags.error(DiagnosticKind::Dependency, "a", "first");
        diags.error(DiagnosticKind::Dependency, "b", "second");
        let items = diags.into_vec();
        assert_eq!(items[0].path, "a");
        assert_eq!(items[1].path, "b");
    }
}
