//! Core data-model interfaces for the Weka constraint solver.
//!
//! This crate defines the seam between the solver engine and its client:
//! the structure functor ([`TypeForm`]) that describes the client's type
//! constructors, the factory for decoded types ([`Output`]), constraint-level
//! type variables ([`Var`]), source ranges ([`Range`]), and deep type trees
//! ([`DeepTy`]). These are distinct from the solver's internal graph
//! representation (which lives in `weka-solve`).

use std::fmt;

// ---------------------------------------------------------------------------
// Source ranges
// ---------------------------------------------------------------------------

/// A byte offset range within client source text.
///
/// The solver threads ranges through constraints and attaches the innermost
/// one to errors; it never interprets them. Clients that track multiple
/// files wrap `Range` in their own location type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Range {
    pub start: u32,
    pub end: u32,
}

impl Range {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create a range that covers both `self` and `other`.
    pub fn merge(self, other: Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// A synthetic range for constraints with no source counterpart.
    pub fn synthetic() -> Self {
        Self {
            start: 0,
            end: 0,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Constraint-level type variables
// ---------------------------------------------------------------------------

/// A type variable named in constraints.
///
/// Minted by the combinator layer (`exist` and friends) from a process-wide
/// counter, so no two constraints ever name the same variable. The solver
/// binds each `Var` to an internal graph node when it meets the `Exist` or
/// `Let` that introduces it; using a `Var` outside the solve that introduced
/// it is a programmer error and panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(pub u64);

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// The structure functor
// ---------------------------------------------------------------------------

/// A family of shallow type shapes, supplied by the client.
///
/// `Shape<C>` is the one-layer shape of a type constructor whose children
/// have type `C` — for example `Arrow(C, C)` or `Pair(C, C)`. The solver
/// instantiates `C` with its internal node ids while solving and with
/// decoded types while decoding; [`map`](TypeForm::map) converts between
/// the two worlds.
///
/// `map`, `visit`, and `merge` must agree on a single fixed child order;
/// the solver relies on it when rebuilding shapes child by child.
///
/// Implementors are marker types (shapes live in `Shape<C>`), hence the
/// `'static` supertrait: it lets the combinator layer store shapes inside
/// boxed decoding continuations.
pub trait TypeForm: 'static {
    /// The shape of one type constructor with children of type `C`.
    type Shape<C: Clone + 'static>: Clone + 'static;

    /// Apply `f` to every child, preserving the constructor.
    fn map<A: Clone + 'static, B: Clone + 'static>(
        shape: &Self::Shape<A>,
        f: impl FnMut(&A) -> B,
    ) -> Self::Shape<B>;

    /// Visit every child in order.
    fn visit<A: Clone + 'static>(shape: &Self::Shape<A>, f: impl FnMut(&A));

    /// Merge two shapes of the same head constructor into one, handing every
    /// pair of corresponding children to `unify`.
    ///
    /// Returns `None` when the head constructors (or their arities) disagree;
    /// the solver reports that as a type mismatch. The callback enqueues the
    /// child equation rather than solving it on the spot, so it cannot fail.
    /// Implementations must compare heads before invoking `unify`.
    fn merge<C: Clone + 'static>(
        left: &Self::Shape<C>,
        right: &Self::Shape<C>,
        unify: impl FnMut(C, C),
    ) -> Option<Self::Shape<C>>;
}

// ---------------------------------------------------------------------------
// Decoded types
// ---------------------------------------------------------------------------

/// Factory for the client's decoded types.
///
/// After a solve succeeds, the decoder rebuilds user-facing types bottom-up
/// through these constructors. The solver never inspects a `Ty` or `TyVar`
/// it has built.
pub trait Output<F: TypeForm>: 'static {
    /// A decoded type variable.
    type TyVar: Clone + 'static;
    /// A decoded type.
    type Ty: Clone + 'static;

    /// Mint the decoded variable for an internal solver variable id.
    ///
    /// The decoder calls this with the same id every time the same
    /// equivalence class is decoded, so equal ids must yield
    /// interchangeable variables.
    fn tyvar(id: u32) -> Self::TyVar;

    /// A type consisting of a single variable.
    fn variable(v: Self::TyVar) -> Self::Ty;

    /// A type built from one constructor layer of decoded children.
    fn structure(shape: F::Shape<Self::Ty>) -> Self::Ty;

    /// A recursive type `mu v. body`, produced by the cyclic decoder when a
    /// class participates in its own structure.
    fn mu(v: Self::TyVar, body: Self::Ty) -> Self::Ty;
}

/// A decoded type scheme: quantified variables plus body.
pub type DecodedScheme<F, O> =
    (Vec<<O as Output<F>>::TyVar>, <O as Output<F>>::Ty);

// ---------------------------------------------------------------------------
// Deep types
// ---------------------------------------------------------------------------

/// A finite type tree used to state complex constraints in one piece.
///
/// `build` in the combinator layer flattens a deep type into a bundle of
/// existentially quantified variables chained by shallow shape equations,
/// one per `Shape` layer.
pub enum DeepTy<F: TypeForm> {
    /// A reference to an already-introduced constraint variable.
    Var(Var),
    /// One constructor layer whose children are deep types.
    Shape(F::Shape<Box<DeepTy<F>>>),
}

impl<F: TypeForm> Clone for DeepTy<F> {
    fn clone(&self) -> Self {
        match self {
            DeepTy::Var(v) => DeepTy::Var(*v),
            DeepTy::Shape(shape) => DeepTy::Shape(shape.clone()),
        }
    }
}

impl<F: TypeForm> fmt::Debug for DeepTy<F>
where
    F::Shape<Box<DeepTy<F>>>: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeepTy::Var(v) => f.debug_tuple("Var").field(v).finish(),
            DeepTy::Shape(shape) => f.debug_tuple("Shape").field(shape).finish(),
        }
    }
}

impl<F: TypeForm> DeepTy<F> {
    /// Wrap a shape whose children are already-built deep types.
    pub fn shape(shape: F::Shape<Box<DeepTy<F>>>) -> Self {
        DeepTy::Shape(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_merge_covers_both() {
        let a = Range::new(4, 10);
        let b = Range::new(7, 25);
        assert_eq!(a.merge(b), Range::new(4, 25));
        assert_eq!(b.merge(a), Range::new(4, 25));
    }

    #[test]
    fn range_display() {
        assert_eq!(Range::new(3, 9).to_string(), "3..9");
    }

    #[test]
    fn var_ordering_follows_id() {
        assert!(Var(1) < Var(2));
        assert_eq!(Var(7).to_string(), "?7");
    }
}
