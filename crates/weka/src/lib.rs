//! Weka: constraint-based Hindley–Milner type inference with
//! let-generalization.
//!
//! This crate re-exports the full public surface of the workspace: the
//! data-model seam from `weka-types`, the solver and combinator layer from
//! `weka-solve`, and the diagnostics from `weka-diag`.

pub use weka_diag::{Category, DiagLabel, Diagnostic, DiagnosticError, Severity};
pub use weka_solve::{
    Co, Decoder, Slot, SolveError, SolveOptions, Solved, UnifyAction, UnifyStep, build, construct,
    def, equal, exist, exist_, has_structure, instance, instance_, let0, let1, letn, pure, solve,
    solve_with,
};
pub use weka_types::{DecodedScheme, DeepTy, Output, Range, TypeForm, Var};
