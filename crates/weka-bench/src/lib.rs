//! Benchmark support: a compact solver client and constraint generators
//! sized by a single scale parameter.
//!
//! Kept as a library so the benches and any future profiling binaries share
//! one definition of the workload.

use weka::{
    Co, DeepTy, Output, TypeForm, Var, build, equal, exist, exist_, has_structure, instance_,
    let0, let1, pure, solve,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape<C> {
    Arrow(C, C),
    Int,
}

pub struct Form;

impl TypeForm for Form {
    type Shape<C: Clone + 'static> = Shape<C>;

    fn map<A: Clone + 'static, B: Clone + 'static>(
        shape: &Shape<A>,
        mut f: impl FnMut(&A) -> B,
    ) -> Shape<B> {
        match shape {
            Shape::Arrow(a, b) => Shape::Arrow(f(a), f(b)),
            Shape::Int => Shape::Int,
        }
    }

    fn visit<A: Clone + 'static>(shape: &Shape<A>, mut f: impl FnMut(&A)) {
        match shape {
            Shape::Arrow(a, b) => {
                f(a);
                f(b);
            }
            Shape::Int => {}
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
            (Shape::Int, Shape::Int) => Some(Shape::Int),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Var(u32),
    Arrow(Box<Ty>, Box<Ty>),
    Int,
    Mu(u32, Box<Ty>),
}

pub struct Types;

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
            Shape::Arrow(a, b) => Ty::Arrow(Box::new(a), Box::new(b)),
            Shape::Int => Ty::Int,
        }
    }

    fn mu(v: u32, body: Ty) -> Ty {
        Ty::Mu(v, Box::new(body))
    }
}

/// Constraints use numeric binder names so the chain depth is unbounded.
pub type BenchCo<T> = Co<usize, Form, Types, T>;

/// A chain of `depth` nested generalizing lets, each binding an
/// arrow whose body instantiates the previous binding, finished by one
/// instantiation of the last binding.
pub fn let_chain(depth: usize) -> BenchCo<()> {
    assert!(depth > 0, "a chain needs at least one binding");
    chain(0, depth)
}

fn chain(i: usize, depth: usize) -> BenchCo<()> {
    if i == depth {
        exist_(move |u| instance_(depth - 1, u))
    } else {
        let1(
            i,
            move |v| {
                if i == 0 {
                    exist_(move |a| has_structure(v, Shape::Arrow(a, a)))
                } else {
                    exist_(move |a| {
                        exist_(move |b| {
                            exist_(move |g| {
                                instance_(i - 1, g)
                                    .and(has_structure(g, Shape::Arrow(a, b)))
                                    .and(has_structure(v, Shape::Arrow(a, b)))
                                    .map(|_| ())
                            })
                        })
                    })
                }
            },
            chain(i + 1, depth),
        )
        .map(|_| ())
    }
}

/// `width` independent variables, each constrained to a ground shape.
pub fn wide_conjunction(width: usize) -> BenchCo<()> {
    (0..width).fold(pure(()), |acc, _| {
        acc.and(exist_(|v| has_structure(v, Shape::Int)))
            .map(|_| ())
    })
}

/// A full binary arrow tree of the given depth, stated through `build`.
pub fn deep_tree(depth: usize) -> DeepTy<Form> {
    if depth == 0 {
        DeepTy::shape(Shape::Int)
    } else {
        DeepTy::shape(Shape::Arrow(
            Box::new(deep_tree(depth - 1)),
            Box::new(deep_tree(depth - 1)),
        ))
    }
}

/// Flatten and solve a deep tree against a fresh variable.
pub fn deep_tree_constraint(depth: usize) -> BenchCo<(Ty, ())> {
    let tree = deep_tree(depth);
    exist(move |v| build(tree, move |root| equal(v, root)))
}

/// Run a constraint to completion, panicking on type errors. Benchmarks
/// only build well-typed workloads.
pub fn run<T: 'static>(co: BenchCo<T>) -> T {
    let (_, value) = solve(false, let0(co)).expect("benchmark workload is well-typed");
    value
}
