//! End-to-end inference scenarios over a small λ-calculus client.
//!
//! The client is deliberately minimal: arrows, pairs, int and bool
//! constructors, and a constraint generator walking hand-built terms. It
//! exists only to drive the solver the way a real front end would.

use weka::{
    Co, Output, Range, SolveError, TypeForm, Var, def, exist, exist_, has_structure, instance_,
    let0, let1, solve,
};

// ---------------------------------------------------------------------------
// The client's type structure and decoded types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape<C> {
    Arrow(C, C),
    Pair(C, C),
    Int,
    Bool,
}

struct Form;

impl TypeForm for Form {
    type Shape<C: Clone + 'static> = Shape<C>;

    fn map<A: Clone + 'static, B: Clone + 'static>(
        shape: &Shape<A>,
        mut f: impl FnMut(&A) -> B,
    ) -> Shape<B> {
        match shape {
            Shape::Arrow(a, b) => Shape::Arrow(f(a), f(b)),
            Shape::Pair(a, b) => Shape::Pair(f(a), f(b)),
            Shape::Int => Shape::Int,
            Shape::Bool => Shape::Bool,
        }
    }

    fn visit<A: Clone + 'static>(shape: &Shape<A>, mut f: impl FnMut(&A)) {
        match shape {
            Shape::Arrow(a, b) | Shape::Pair(a, b) => {
                f(a);
                f(b);
            }
            Shape::Int | Shape::Bool => {}
        }
    }

    fn merge<C: Clone + 'static>(
        left: &Shape<C>,
        right: &Shape<C>,
        mut unify: impl FnMut(C, C),
    ) -> Option<Shape<C>> {
        match (left, right) {
            (Shape::Arrow(a1, b1), Shape::Arrow(a2, b2)) => {
                unify(a1.clone(), a2.clone());
                unify(b1.clone(), b2.clone());
                Some(Shape::Arrow(a1.clone(), b1.clone()))
            }
            (Shape::Pair(a1, b1), Shape::Pair(a2, b2)) => {
                unify(a1.clone(), a2.clone());
                unify(b1.clone(), b2.clone());
                Some(Shape::Pair(a1.clone(), b1.clone()))
            }
            (Shape::Int, Shape::Int) => Some(Shape::Int),
            (Shape::Bool, Shape::Bool) => Some(Shape::Bool),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Ty {
    Var(u32),
    Arrow(Box<Ty>, Box<Ty>),
    Pair(Box<Ty>, Box<Ty>),
    Int,
    Bool,
    Mu(u32, Box<Ty>),
}

impl Ty {
    fn contains_mu(&self) -> bool {
        match self {
            Ty::Mu(_, _) => true,
            Ty::Arrow(a, b) | Ty::Pair(a, b) => a.contains_mu() || b.contains_mu(),
            Ty::Var(_) | Ty::Int | Ty::Bool => false,
        }
    }

    fn head_is_pairish(&self) -> bool {
        matches!(self, Ty::Pair(_, _))
    }
}

fn arrow(a: Ty, b: Ty) -> Ty {
    Ty::Arrow(Box::new(a), Box::new(b))
}

fn pair_ty(a: Ty, b: Ty) -> Ty {
    Ty::Pair(Box::new(a), Box::new(b))
}

struct Types;

impl Output<Form> for Types {
    type TyVar = u32;
    type Ty = Ty;

    fn tyvar(id: u32) -> u32 {
        id
    }

    fn variable(v: u32) -> Ty {
        Ty::Var(v)
    }

    fn structure(shape: Shape<Ty>) -> Ty {
        match shape {
            Shape::Arrow(a, b) => arrow(a, b),
            Shape::Pair(a, b) => pair_ty(a, b),
            Shape::Int => Ty::Int,
            Shape::Bool => Ty::Bool,
        }
    }

    fn mu(v: u32, body: Ty) -> Ty {
        Ty::Mu(v, Box::new(body))
    }
}

// ---------------------------------------------------------------------------
// Terms and constraint generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Term {
    Var(&'static str),
    IntLit(i64),
    BoolLit(bool),
    Abs(&'static str, Box<Term>),
    App(Box<Term>, Box<Term>),
    Let(&'static str, Box<Term>, Box<Term>),
    Pair(Box<Term>, Box<Term>),
}

fn var(name: &'static str) -> Term {
    Term::Var(name)
}

fn int(value: i64) -> Term {
    Term::IntLit(value)
}

fn bool_(value: bool) -> Term {
    Term::BoolLit(value)
}

fn lam(param: &'static str, body: Term) -> Term {
    Term::Abs(param, Box::new(body))
}

fn app(fun: Term, arg: Term) -> Term {
    Term::App(Box::new(fun), Box::new(arg))
}

fn let_in(name: &'static str, bound: Term, body: Term) -> Term {
    Term::Let(name, Box::new(bound), Box::new(body))
}

fn pair(first: Term, second: Term) -> Term {
    Term::Pair(Box::new(first), Box::new(second))
}

type C<T> = Co<&'static str, Form, Types, T>;

/// `term` has type `w`. The standard constraint generator for a λ-calculus
/// with abstractions bound monomorphically and `let` bound polymorphically.
fn hastype(term: &Term, w: Var) -> C<()> {
    match term {
        Term::Var(x) => instance_(*x, w),
        Term::IntLit(_) => has_structure(w, Shape::Int),
        Term::BoolLit(_) => has_structure(w, Shape::Bool),
        Term::Abs(param, body) => exist_(|domain| {
            exist_(|codomain| {
                def(*param, domain, hastype(body, codomain))
                    .and(has_structure(w, Shape::Arrow(domain, codomain)))
                    .map(|_| ())
            })
        }),
        Term::App(fun, arg) => exist_(|domain| {
            exist_(|callee| {
                hastype(fun, callee)
                    .and(has_structure(callee, Shape::Arrow(domain, w)))
                    .and(hastype(arg, domain))
                    .map(|_| ())
            })
        }),
        Term::Let(name, bound, body) => {
            let1(*name, |v| hastype(bound, v), hastype(body, w)).map(|_| ())
        }
        Term::Pair(first, second) => exist_(|a| {
            exist_(|b| {
                hastype(first, a)
                    .and(hastype(second, b))
                    .and(has_structure(w, Shape::Pair(a, b)))
                    .map(|_| ())
            })
        }),
    }
}

/// Infer the type of a closed term.
fn infer(term: &Term, rectypes: bool) -> Result<Ty, SolveError<&'static str, Ty>> {
    let co: C<(Ty, ())> = exist(|root| hastype(term, root));
    solve(rectypes, let0(co)).map(|(_, (ty, ()))| ty)
}

/// Infer `let name = bound in body`, also returning the binding's scheme.
#[allow(clippy::type_complexity)]
fn infer_let(
    name: &'static str,
    bound: &Term,
    body: &Term,
    rectypes: bool,
) -> Result<((Vec<u32>, Ty), Ty), SolveError<&'static str, Ty>> {
    let co: C<((Vec<u32>, Ty), Vec<u32>, (), (Ty, ()))> = let1(
        name,
        |v| hastype(bound, v),
        exist(|w| hastype(body, w)),
    );
    solve(rectypes, let0(co)).map(|(_, (scheme, _, (), (ty, ())))| (scheme, ty))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn identity_applied_to_itself() {
    // let x = λy.y in x x
    let bound = lam("y", var("y"));
    let body = app(var("x"), var("x"));
    let (scheme, ty) = infer_let("x", &bound, &body, false).unwrap();

    let (quantifiers, scheme_body) = scheme;
    assert_eq!(quantifiers.len(), 1);
    let q = quantifiers[0];
    assert_eq!(scheme_body, arrow(Ty::Var(q), Ty::Var(q)));

    match ty {
        Ty::Arrow(domain, codomain) => {
            assert_eq!(domain, codomain);
            assert!(matches!(*domain, Ty::Var(_)));
        }
        other => panic!("expected an arrow type for `x x`, got {other:?}"),
    }
}

#[test]
fn self_application_is_cyclic_without_rectypes() {
    // λx. x x
    let term = lam("x", app(var("x"), var("x")));
    let err = infer(&term, false).unwrap_err();
    match err {
        SolveError::CyclicType { ty, .. } => assert!(ty.contains_mu()),
        other => panic!("expected a cyclic type error, got {other:?}"),
    }
}

#[test]
fn self_application_types_as_a_mu_arrow_with_rectypes() {
    let term = lam("x", app(var("x"), var("x")));
    let ty = infer(&term, true).unwrap();
    match &ty {
        Ty::Arrow(domain, _) => {
            assert!(domain.contains_mu(), "domain should be recursive: {ty:?}")
        }
        other => panic!("expected an arrow type, got {other:?}"),
    }
}

#[test]
fn k_combinator_instantiated_twice() {
    // let k = λx.λy.x in (k (λz.z)) (λz.z)
    let k = lam("x", lam("y", var("x")));
    let body = app(app(var("k"), lam("z", var("z"))), lam("z", var("z")));
    let (scheme, ty) = infer_let("k", &k, &body, false).unwrap();

    // k : ∀a b. a → b → a
    assert_eq!(scheme.0.len(), 2);

    // The two instantiations stay independent; the result is α → α.
    match ty {
        Ty::Arrow(domain, codomain) => {
            assert_eq!(domain, codomain);
            assert!(matches!(*domain, Ty::Var(_)));
        }
        other => panic!("expected an arrow type, got {other:?}"),
    }
}

#[test]
fn unbound_identifier_is_reported() {
    let err = infer(&var("x"), false).unwrap_err();
    assert!(matches!(err, SolveError::UndefinedName { name: "x", .. }));
}

#[test]
fn let_bound_identity_is_used_polymorphically() {
    // let id = λx.x in pair (id true) (id 0)
    let bound = lam("x", var("x"));
    let body = pair(app(var("id"), bool_(true)), app(var("id"), int(0)));
    let (scheme, ty) = infer_let("id", &bound, &body, false).unwrap();

    let (quantifiers, scheme_body) = scheme;
    assert_eq!(quantifiers.len(), 1);
    let q = quantifiers[0];
    assert_eq!(scheme_body, arrow(Ty::Var(q), Ty::Var(q)));

    assert_eq!(ty, pair_ty(Ty::Bool, Ty::Int));
}

#[test]
fn arrow_against_pair_is_a_mismatch() {
    // let id = λz.z in (λx. x x) (pair id id), with recursive types on so
    // the self-application itself is fine and only the heads clash.
    let bound = lam("z", var("z"));
    let body = app(
        lam("x", app(var("x"), var("x"))),
        pair(var("id"), var("id")),
    );
    let err = infer_let("id", &bound, &body, true).unwrap_err();
    match err {
        SolveError::TypeMismatch {
            expected, actual, ..
        } => {
            assert_ne!(
                expected.head_is_pairish(),
                actual.head_is_pairish(),
                "exactly one side should be a pair: {expected:?} vs {actual:?}"
            );
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Beyond the basic scenarios
// ---------------------------------------------------------------------------

#[test]
fn lambda_parameters_stay_monomorphic() {
    // λf. pair (f 1) (f true) — f is λ-bound, so its two uses must agree.
    let term = lam(
        "f",
        pair(app(var("f"), int(1)), app(var("f"), bool_(true))),
    );
    let err = infer(&term, false).unwrap_err();
    assert!(matches!(err, SolveError::TypeMismatch { .. }));
}

#[test]
fn nested_lets_generalize_through_inner_scopes() {
    // let f = (let g = λx.x in λy. g y) in pair (f 1) (f true)
    let inner = let_in("g", lam("x", var("x")), lam("y", app(var("g"), var("y"))));
    let term = let_in(
        "f",
        inner,
        pair(app(var("f"), int(1)), app(var("f"), bool_(true))),
    );
    let ty = infer(&term, false).unwrap();
    assert_eq!(ty, pair_ty(Ty::Int, Ty::Bool));
}

#[test]
fn nested_let_keeps_its_own_scheme() {
    // The inner binding generalizes at its own scope even though the outer
    // expression constrains the inner body's result.
    let term = let_in(
        "g",
        lam("x", var("x")),
        pair(app(var("g"), int(1)), app(var("g"), var("g"))),
    );
    let ty = infer(&term, false).unwrap();
    match ty {
        Ty::Pair(first, second) => {
            assert_eq!(*first, Ty::Int);
            assert!(matches!(*second, Ty::Arrow(_, _)));
        }
        other => panic!("expected a pair, got {other:?}"),
    }
}

#[test]
fn shadowing_restores_the_outer_binding() {
    // let id = λx.x in pair (let id = λy. pair y y in id 1) (id true)
    let term = let_in(
        "id",
        lam("x", var("x")),
        pair(
            let_in("id", lam("y", pair(var("y"), var("y"))), app(var("id"), int(1))),
            app(var("id"), bool_(true)),
        ),
    );
    let ty = infer(&term, false).unwrap();
    assert_eq!(
        ty,
        pair_ty(pair_ty(Ty::Int, Ty::Int), Ty::Bool)
    );
}

#[test]
fn errors_carry_the_range_attached_to_the_term() {
    let here = Range::new(12, 13);
    let co: C<()> = exist_(|w| hastype(&var("missing"), w).at(here));
    let err = solve(false, let0(co)).unwrap_err();
    match err {
        SolveError::UndefinedName { range, name } => {
            assert_eq!(range, here);
            assert_eq!(name, "missing");
        }
        other => panic!("expected an undefined name, got {other:?}"),
    }
}
