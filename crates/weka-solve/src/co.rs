//! The applicative combinator layer.
//!
//! A [`Co`] value pairs a constraint with the continuation that decodes its
//! results once solving is done. Combinators compose both halves at the
//! same time, so a client writes inference in one pass and stays oblivious
//! to the two-phase evaluation underneath.
//!
//! The interface is applicative on purpose: there is no bind, because the
//! full shape of the constraint must be known before solving starts, and a
//! bind would let continuations observe solved values while the constraint
//! is still being built. Closures handed to `exist`, `construct`, `build`,
//! and `letn` therefore run at construction time; only the decoding
//! continuations are deferred.

use std::sync::atomic::{AtomicU64, Ordering};

use weka_types::{DecodedScheme, DeepTy, Output, Range, TypeForm, Var};

use crate::decode::Decoder;
use crate::generalize::Scheme;
use crate::slot::Slot;
use crate::solver::{Fault, LetBinding, RawCo, Solver};
use crate::{SolveError, SolveOptions, Solved};

/// Process-wide variable counter, so no two constraints ever name the same
/// variable and cross-solve reuse is caught instead of silently aliasing.
static NEXT_VAR: AtomicU64 = AtomicU64::new(0);

fn fresh_var() -> Var {
    Var(NEXT_VAR.fetch_add(1, Ordering::Relaxed))
}

type Cont<F, O, T> = Box<dyn for<'a> FnOnce(&mut Decoder<'a, F, O>) -> T>;

/// A constraint paired with its decoding continuation.
///
/// `X` is the client's term-variable type, `F` its structure functor, `O`
/// its decoded-type factory, and `T` what the continuation produces.
pub struct Co<X, F: TypeForm, O: Output<F>, T> {
    raw: RawCo<X, F>,
    cont: Cont<F, O, T>,
}

impl<X, F, O, T> Co<X, F, O, T>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    fn new(
        raw: RawCo<X, F>,
        cont: impl for<'a> FnOnce(&mut Decoder<'a, F, O>) -> T + 'static,
    ) -> Self {
        Self {
            raw,
            cont: Box::new(cont),
        }
    }

    /// Post-compose the continuation.
    pub fn map<U: 'static>(self, f: impl FnOnce(T) -> U + 'static) -> Co<X, F, O, U> {
        let Co { raw, cont } = self;
        Co::new(raw, move |decoder| f(cont(decoder)))
    }

    /// Conjunction: both constraints must hold, solved left to right; the
    /// continuations pair up.
    pub fn and<U: 'static>(self, other: Co<X, F, O, U>) -> Co<X, F, O, (T, U)> {
        let Co { raw, cont } = self;
        let Co {
            raw: other_raw,
            cont: other_cont,
        } = other;
        Co::new(
            RawCo::Conj(Box::new(raw), Box::new(other_raw)),
            move |decoder| {
                let left = cont(decoder);
                let right = other_cont(decoder);
                (left, right)
            },
        )
    }

    /// Attach a source range to errors raised while solving this constraint.
    pub fn at(self, range: Range) -> Co<X, F, O, T> {
        let Co { raw, cont } = self;
        Co {
            raw: RawCo::At(range, Box::new(raw)),
            cont,
        }
    }
}

/// The trivially satisfied constraint.
pub fn pure<X, F, O, T>(value: T) -> Co<X, F, O, T>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    Co::new(RawCo::True, move |_| value)
}

fn exist_with<X, F, O, T>(
    shape: Option<F::Shape<Var>>,
    f: impl FnOnce(Var) -> Co<X, F, O, T>,
) -> (Var, Co<X, F, O, T>)
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    let var = fresh_var();
    let Co { raw, cont } = f(var);
    let co = Co {
        raw: RawCo::Exist {
            var,
            shape,
            body: Box::new(raw),
        },
        cont,
    };
    (var, co)
}

/// Introduce a fresh variable; the continuation pairs its decoded type with
/// the body's result.
pub fn exist<X, F, O, T>(f: impl FnOnce(Var) -> Co<X, F, O, T>) -> Co<X, F, O, (O::Ty, T)>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    let (var, co) = exist_with(None, f);
    let Co { raw, cont } = co;
    Co::new(raw, move |decoder| {
        let ty = decoder.decode(var);
        let value = cont(decoder);
        (ty, value)
    })
}

/// Like [`exist`], but does not decode the variable.
pub fn exist_<X, F, O, T>(f: impl FnOnce(Var) -> Co<X, F, O, T>) -> Co<X, F, O, T>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    exist_with(None, f).1
}

/// Introduce a fresh variable that carries a known shallow structure.
pub fn construct<X, F, O, T>(
    shape: F::Shape<Var>,
    f: impl FnOnce(Var) -> Co<X, F, O, T>,
) -> Co<X, F, O, (O::Ty, T)>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    let (var, co) = exist_with(Some(shape), f);
    let Co { raw, cont } = co;
    Co::new(raw, move |decoder| {
        let ty = decoder.decode(var);
        let value = cont(decoder);
        (ty, value)
    })
}

/// The two variables stand for the same type.
pub fn equal<X, F, O>(v: Var, w: Var) -> Co<X, F, O, ()>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
{
    Co::new(RawCo::Eq(v, w), |_| ())
}

/// `v` has the given shallow structure.
pub fn has_structure<X, F, O>(v: Var, shape: F::Shape<Var>) -> Co<X, F, O, ()>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
{
    exist_with(Some(shape), |w| equal(v, w)).1
}

type VarCont<X, F, O, T> = Box<dyn FnOnce(Var) -> Co<X, F, O, T>>;

/// State a constraint against a deep type: the tree is flattened into a
/// bundle of existentials chained by shallow structure, innermost first,
/// and `f` receives the variable standing for the root.
pub fn build<X, F, O, T>(
    deep: DeepTy<F>,
    f: impl FnOnce(Var) -> Co<X, F, O, T> + 'static,
) -> Co<X, F, O, T>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    build_boxed(deep, Box::new(f))
}

fn build_boxed<X, F, O, T>(deep: DeepTy<F>, f: VarCont<X, F, O, T>) -> Co<X, F, O, T>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    match deep {
        DeepTy::Var(v) => f(v),
        DeepTy::Shape(shape) => {
            let mut children = Vec::new();
            F::visit(&shape, |child: &Box<DeepTy<F>>| {
                children.push((**child).clone());
            });
            build_children(
                children.into_iter(),
                Vec::new(),
                Box::new(move |vars: Vec<Var>| {
                    let mut vars = vars.into_iter();
                    let shallow = F::map(&shape, |_| {
                        vars.next().expect("one variable per deep child")
                    });
                    exist_with(Some(shallow), |root| f(root)).1
                }),
            )
        }
    }
}

fn build_children<X, F, O, T>(
    mut rest: std::vec::IntoIter<DeepTy<F>>,
    mut done: Vec<Var>,
    k: Box<dyn FnOnce(Vec<Var>) -> Co<X, F, O, T>>,
) -> Co<X, F, O, T>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    match rest.next() {
        None => k(done),
        Some(child) => build_boxed(
            child,
            Box::new(move |v| {
                done.push(v);
                build_children(rest, done, k)
            }),
        ),
    }
}

/// Instantiate the scheme bound to `name` and unify the copy with `v`.
/// The continuation yields the decoded witness: one type per quantifier of
/// the scheme, in quantifier order.
pub fn instance<X, F, O>(name: X, v: Var) -> Co<X, F, O, Vec<O::Ty>>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
{
    let witnesses = Slot::new();
    let reader = witnesses.clone();
    Co::new(
        RawCo::Instance {
            name,
            var: v,
            witnesses,
        },
        move |decoder| {
            reader
                .take()
                .into_iter()
                .map(|node| decoder.decode_node(node))
                .collect()
        },
    )
}

/// Like [`instance`], but drops the witness.
pub fn instance_<X, F, O>(name: X, v: Var) -> Co<X, F, O, ()>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
{
    Co::new(
        RawCo::Instance {
            name,
            var: v,
            witnesses: Slot::new(),
        },
        |_| (),
    )
}

/// Bind `name` to the monomorphic type `v` while solving `body`.
pub fn def<X, F, O, T>(name: X, v: Var, body: Co<X, F, O, T>) -> Co<X, F, O, T>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    let Co { raw, cont } = body;
    Co {
        raw: RawCo::Def {
            name,
            var: v,
            body: Box::new(raw),
        },
        cont,
    }
}

/// Generalizing `let` over any number of simultaneous bindings.
///
/// Enters a new rank, solves `f`'s constraint under one fresh variable per
/// name, generalizes, then solves `tail` with the names bound to their
/// schemes. The continuation yields the decoded schemes (one per name, in
/// order), the variables found generalizable at this scope, and both
/// sub-results.
#[allow(clippy::type_complexity)]
pub fn letn<X, F, O, T1, T2>(
    names: Vec<X>,
    f: impl FnOnce(&[Var]) -> Co<X, F, O, T1>,
    tail: Co<X, F, O, T2>,
) -> Co<X, F, O, (Vec<DecodedScheme<F, O>>, Vec<O::TyVar>, T1, T2)>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T1: 'static,
    T2: 'static,
{
    let vars: Vec<Var> = names.iter().map(|_| fresh_var()).collect();
    let body = f(&vars);
    let bindings: Vec<LetBinding<X>> = names
        .into_iter()
        .zip(&vars)
        .map(|(name, &var)| LetBinding {
            name,
            var,
            scheme: Slot::new(),
        })
        .collect();
    let scheme_readers: Vec<Slot<Scheme>> =
        bindings.iter().map(|binding| binding.scheme.clone()).collect();
    let generalizable = Slot::new();
    let generalizable_reader = generalizable.clone();
    let body_cont = body.cont;
    let tail_cont = tail.cont;
    Co::new(
        RawCo::Let {
            bindings,
            body: Box::new(body.raw),
            tail: Box::new(tail.raw),
            generalizable,
        },
        move |decoder| {
            let schemes = scheme_readers
                .iter()
                .map(|slot| {
                    let scheme = slot.take();
                    decoder.decode_scheme(&scheme)
                })
                .collect();
            let generalized = generalizable_reader
                .take()
                .into_iter()
                .map(|node| decoder.tyvar(node))
                .collect();
            let left = body_cont(decoder);
            let right = tail_cont(decoder);
            (schemes, generalized, left, right)
        },
    )
}

/// Generalizing `let` over a single binding.
#[allow(clippy::type_complexity)]
pub fn let1<X, F, O, T1, T2>(
    name: X,
    f: impl FnOnce(Var) -> Co<X, F, O, T1>,
    tail: Co<X, F, O, T2>,
) -> Co<X, F, O, (DecodedScheme<F, O>, Vec<O::TyVar>, T1, T2)>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T1: 'static,
    T2: 'static,
{
    letn(vec![name], |vars| f(vars[0]), tail).map(|(mut schemes, generalized, left, right)| {
        let scheme = schemes.pop().expect("one scheme per binding");
        (scheme, generalized, left, right)
    })
}

/// The toplevel scope. Every constraint handed to [`solve`] must be wrapped
/// in `let0`: it opens the outermost rank, so fresh variables always have a
/// pool to live in. The continuation yields the scope's generalizable list
/// alongside the body's result; the list is the union of the quantifiers of
/// the scope's bindings, so for `let0` (which binds nothing) it is empty.
pub fn let0<X, F, O, T>(body: Co<X, F, O, T>) -> Co<X, F, O, (Vec<O::TyVar>, T)>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    letn(Vec::new(), move |_| body, pure(()))
        .map(|(_, generalized, value, ())| (generalized, value))
}

/// Solve a constraint and run its decoding continuation.
///
/// With `rectypes` unset, equations whose least solution is cyclic fail
/// with [`SolveError::CyclicType`]; with it set, such cycles are admitted
/// and decode to `mu` types.
pub fn solve<X, F, O, T>(rectypes: bool, co: Co<X, F, O, T>) -> Result<T, SolveError<X, O::Ty>>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    solve_with(
        SolveOptions {
            rectypes,
            trace: false,
        },
        co,
    )
    .map(|solved| solved.value)
}

/// [`solve`] with explicit options, returning any recorded trace.
pub fn solve_with<X, F, O, T>(
    options: SolveOptions,
    co: Co<X, F, O, T>,
) -> Result<Solved<T>, SolveError<X, O::Ty>>
where
    X: Clone + Ord + 'static,
    F: TypeForm,
    O: Output<F>,
    T: 'static,
{
    let Co { raw, cont } = co;
    // Specifically the shape let0 builds: a Let with no bindings and a
    // trivial tail. Any other toplevel (including a bare let1/letn) is
    // protocol misuse.
    assert!(
        matches!(
            &raw,
            RawCo::Let { bindings, tail, .. }
                if bindings.is_empty() && matches!(&**tail, RawCo::True)
        ),
        "solve requires a toplevel let0 constraint"
    );
    let mut solver: Solver<X, F> = Solver::new(options.rectypes);
    if options.trace {
        solver.enable_tracing();
    }
    match solver.run(raw) {
        Ok(()) => {
            let trace = solver.graph.take_trace();
            let mut decoder: Decoder<'_, F, O> =
                Decoder::new(&mut solver.graph, &solver.bindings, options.rectypes);
            let value = cont(&mut decoder);
            Ok(Solved { value, trace })
        }
        Err(fault) => {
            // Error payloads may be cyclic even when the occurs check is on
            // (the offending type is exactly the one that failed it).
            let mut decoder: Decoder<'_, F, O> =
                Decoder::new(&mut solver.graph, &solver.bindings, true);
            Err(match fault {
                Fault::Unbound(range, name) => SolveError::UndefinedName { range, name },
                Fault::Clash(range, left, right) => SolveError::TypeMismatch {
                    range,
                    expected: decoder.decode_node(left),
                    actual: decoder.decode_node(right),
                },
                Fault::Cycle(range, node) => SolveError::CyclicType {
                    range,
                    ty: decoder.decode_node(node),
                },
            })
        }
    }
}
