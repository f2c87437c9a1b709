//! Tracing types for solver observability.
//!
//! These types capture a step-by-step record of what the unifier did while
//! solving, for debugging clients and for tooling that wants to expose the
//! solver's reasoning. Tracing is opt-in via [`SolveOptions`] — zero
//! overhead when disabled.
//!
//! [`SolveOptions`]: crate::SolveOptions

use serde::Serialize;

/// A single step in a unification trace.
///
/// `left` and `right` are the canonical ids of the two equivalence classes
/// the step operated on; ids are the ones decoded types report through
/// `Output::tyvar`, so a trace can be lined up with decoded output.
#[derive(Debug, Clone, Serialize)]
pub struct UnifyStep {
    pub step: usize,
    pub action: UnifyAction,
    pub left: u32,
    pub right: u32,
    pub detail: String,
}

/// What action was taken during a unification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifyAction {
    /// The two sides were already the same class — no-op.
    Identity,
    /// Two classes linked; at most one side had structure, which survives.
    Link,
    /// Both sides had structure: decomposed into child equations.
    Decompose,
    /// Occurs check fired — a type would have contained itself.
    OccursCheck,
    /// Head constructors disagree — unification failed.
    Clash,
}
