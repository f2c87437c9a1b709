//! Error reporting and diagnostics for Weka.
//!
//! This crate provides structured diagnostics with source range tracking.
//! The key invariant: no internal solver state (node ids, ranks, pools) in
//! user-facing output — error payloads carry decoded types only.
//!
//! Diagnostics are created by `weka-solve` and rendered here for display.

use std::fmt;

use weka_types::Range;

// ---------------------------------------------------------------------------
// Diagnostic severity and categories
// ---------------------------------------------------------------------------

/// How severe a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Broad category for diagnostics. Used for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Two incompatible type constructors were asked to unify.
    TypeMismatch,
    /// A unification would make a type contain itself.
    CyclicType,
    /// An identifier has no binding in the typing environment.
    UndefinedName,
}

impl Category {
    pub fn code(self) -> &'static str {
        match self {
            Category::TypeMismatch => "E0001",
            Category::CyclicType => "E0002",
            Category::UndefinedName => "E0003",
        }
    }

    /// Generic suggestion for resolving diagnostics of this category.
    pub fn example_fix(self) -> &'static str {
        match self {
            Category::TypeMismatch => {
                "Adjust the expression so both sides build the same constructor."
            }
            Category::CyclicType => {
                "Break the self-reference, or enable recursive types if the client supports them."
            }
            Category::UndefinedName => "Bind the identifier with a let or definition, or fix the spelling.",
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured diagnostic message.
///
/// Every diagnostic carries enough context to produce an actionable error
/// message without exposing solver internals.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Stable diagnostic code (e.g. E0001).
    pub code: Option<String>,
    pub severity: Severity,
    pub category: Category,
    /// Primary message: what went wrong.
    pub message: String,
    /// Where it went wrong.
    pub range: Option<Range>,
    /// Additional labeled ranges (e.g., "the conflicting side is here").
    pub labels: Vec<DiagLabel>,
    /// Suggested fix, if any.
    pub help: Option<String>,
}

/// A labeled source range within a diagnostic.
#[derive(Debug, Clone)]
pub struct DiagLabel {
    pub range: Range,
    pub message: String,
}

impl Diagnostic {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            severity: Severity::Error,
            category,
            message: message.into(),
            range: None,
            labels: Vec::new(),
            help: None,
        }
    }

    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            severity: Severity::Warning,
            category,
            message: message.into(),
            range: None,
            labels: Vec::new(),
            help: None,
        }
    }

    pub fn at(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_label(mut self, range: Range, message: impl Into<String>) -> Self {
        self.labels.push(DiagLabel {
            range,
            message: message.into(),
        });
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        if let Some(code) = &self.code {
            write!(f, "{prefix}[{code}]: {}", self.message)?;
        } else {
            write!(f, "{prefix}: {}", self.message)?;
        }
        if let Some(range) = self.range {
            write!(f, "\n  at {range}")?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error type for crates that produce diagnostics
// ---------------------------------------------------------------------------

/// Error type wrapping one or more diagnostics.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .0.first().map(|d| d.to_string()).unwrap_or_default())]
pub struct DiagnosticError(pub Vec<Diagnostic>);

impl DiagnosticError {
    pub fn single(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }
}
