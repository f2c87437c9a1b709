//! Constraint-based Hindley–Milner type inference with let-generalization.
//!
//! This crate implements:
//! - An applicative combinator layer that builds a constraint and its
//!   decoding continuation as one value
//! - A destructive first-order unifier over a union-find arena
//! - Rank-based generalization: each `let` scope owns a pool of variables,
//!   and leaving the scope decides which of them become scheme quantifiers
//! - Acyclic and cyclic decoding of solved graphs into client types
//!
//! The client supplies its type constructors through
//! [`TypeForm`](weka_types::TypeForm) and receives decoded types through
//! [`Output`](weka_types::Output); the solver itself never interprets
//! either. A typical client builds a constraint with [`exist`], [`def`],
//! [`let1`] and friends, wraps it in [`let0`], and calls [`solve`].

use std::fmt;

use weka_diag::{Category, Diagnostic};
use weka_types::Range;

mod co;
mod decode;
mod generalize;
mod slot;
mod solver;
pub mod trace;
mod unify;
mod unionfind;

pub use co::{
    Co, build, construct, def, equal, exist, exist_, has_structure, instance, instance_, let0,
    let1, letn, pure, solve, solve_with,
};
pub use decode::Decoder;
pub use slot::Slot;
pub use trace::{UnifyAction, UnifyStep};

// ---------------------------------------------------------------------------
// Solve options and outcome
// ---------------------------------------------------------------------------

/// Options for a single solve call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveOptions {
    /// Admit recursive types: the occurs check is skipped and cycles decode
    /// to `mu` types.
    pub rectypes: bool,
    /// Record a step-by-step unification trace.
    pub trace: bool,
}

/// A successful solve: the continuation's result plus any recorded trace.
#[derive(Debug, Clone)]
pub struct Solved<T> {
    pub value: T,
    pub trace: Vec<UnifyStep>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a solve failed. The first conflict aborts; nothing is retried.
///
/// Type payloads are always produced by the cyclic decoder, since the types
/// involved in a failure may be cyclic even when the occurs check is on.
/// `expected` and `actual` are the two sides of the failed equation, in the
/// order the client wrote them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError<X, T> {
    /// An instantiation referenced a name with no binding in scope.
    #[error("undefined name `{name}`")]
    UndefinedName { range: Range, name: X },
    /// Two sides of an equation build incompatible constructors.
    #[error("type mismatch: expected `{expected}`, got `{actual}`")]
    TypeMismatch { range: Range, expected: T, actual: T },
    /// Solving would require a type to contain itself.
    #[error("cyclic type `{ty}`")]
    CyclicType { range: Range, ty: T },
}

impl<X, T> SolveError<X, T> {
    /// The innermost range attached to the failing constraint.
    pub fn range(&self) -> Range {
        match self {
            SolveError::UndefinedName { range, .. }
            | SolveError::TypeMismatch { range, .. }
            | SolveError::CyclicType { range, .. } => *range,
        }
    }
}

impl<X: fmt::Display, T: fmt::Display> SolveError<X, T> {
    /// Render this error as a structured diagnostic. The help text is the
    /// category's generic suggested fix.
    pub fn diagnostic(&self) -> Diagnostic {
        let diag = match self {
            SolveError::UndefinedName { range, name } => {
                Diagnostic::error(Category::UndefinedName, format!("undefined name `{name}`"))
                    .at(*range)
            }
            SolveError::TypeMismatch {
                range,
                expected,
                actual,
            } => Diagnostic::error(
                Category::TypeMismatch,
                format!("type mismatch: expected `{expected}`, got `{actual}`"),
            )
            .at(*range),
            SolveError::CyclicType { range, ty } => Diagnostic::error(
                Category::CyclicType,
                format!("cyclic type `{ty}` has no finite solution"),
            )
            .at(*range),
        };
        let help = diag.category.example_fix();
        diag.with_help(help)
    }
}

#[cfg(test)]
mod testutil;

#[cfg(test)]
mod prop_tests;
