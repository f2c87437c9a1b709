//! Property tests for the solver using proptest.
//!
//! These tests stress invariants that must hold for ANY input constraint,
//! not just hand-picked examples:
//!
//! 1. A deep type decodes back to the tree it was built from
//! 2. Unification is reflexive over ground types
//! 3. Ground types unify exactly when they are structurally equal
//! 4. Self-referential shapes always trip the occurs check, and always
//!    decode to a finite mu type when cycles are admitted
//! 5. Stating an equation twice changes nothing
//! 6. The applicative laws hold for `pure`, `map`, and `and`

use proptest::prelude::*;
use weka_types::DeepTy;

use crate::testutil::{C, Shape, ShapeForm, Ty};
use crate::{build, equal, exist, exist_, has_structure, let0, pure, solve};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Ground deep types (no variables) of bounded depth.
fn arb_deep(depth: u32) -> BoxedStrategy<DeepTy<ShapeForm>> {
    let leaf = prop_oneof![
        Just(DeepTy::shape(Shape::Int)),
        Just(DeepTy::shape(Shape::Bool)),
    ];
    if depth == 0 {
        leaf.boxed()
    } else {
        let inner = arb_deep(depth - 1);
        prop_oneof![
            2 => leaf,
            3 => (inner.clone(), inner.clone()).prop_map(|(a, b)| {
                DeepTy::shape(Shape::Arrow(Box::new(a), Box::new(b)))
            }),
            3 => (inner.clone(), inner).prop_map(|(a, b)| {
                DeepTy::shape(Shape::Pair(Box::new(a), Box::new(b)))
            }),
        ]
        .boxed()
    }
}

/// The decoded type a ground deep tree must come back as.
fn expected_ty(deep: &DeepTy<ShapeForm>) -> Ty {
    match deep {
        DeepTy::Var(_) => unreachable!("strategies generate ground trees only"),
        DeepTy::Shape(shape) => match shape {
            Shape::Arrow(a, b) => {
                Ty::Arrow(Box::new(expected_ty(a)), Box::new(expected_ty(b)))
            }
            Shape::Pair(a, b) => Ty::Pair(Box::new(expected_ty(a)), Box::new(expected_ty(b))),
            Shape::Int => Ty::Int,
            Shape::Bool => Ty::Bool,
        },
    }
}

proptest! {
    #[test]
    fn deep_types_decode_back_to_their_tree(deep in arb_deep(4)) {
        let want = expected_ty(&deep);
        let co: C<(Ty, ())> = exist(|v| build(deep, move |root| equal(v, root)));
        let (_, (ty, ())) = solve(false, let0(co)).unwrap();
        prop_assert_eq!(ty, want);
    }

    #[test]
    fn unification_is_reflexive_over_ground_types(deep in arb_deep(4)) {
        let copy = deep.clone();
        let co: C<()> = exist_(|v| {
            build(deep, move |left| equal(v, left))
                .and(exist_(move |w| {
                    build(copy, move |right| equal(w, right)).and(equal(v, w)).map(|_| ())
                }))
                .map(|_| ())
        });
        prop_assert!(solve(false, let0(co)).is_ok());
    }

    #[test]
    fn ground_types_unify_exactly_when_equal(left in arb_deep(3), right in arb_deep(3)) {
        let structurally_equal = expected_ty(&left) == expected_ty(&right);
        let co: C<()> = exist_(|v| {
            build(left, move |l| equal(v, l))
                .and(build(right, move |r| equal(v, r)))
                .map(|_| ())
        });
        let result = solve(false, let0(co));
        prop_assert_eq!(result.is_ok(), structurally_equal);
    }

    /// Wrapping a variable in any constructor around itself must trip the
    /// occurs check, whichever child position the cycle goes through.
    #[test]
    fn occurs_check_always_fires(wrapper in 0u32..4) {
        let co: C<()> = exist_(move |v| {
            exist_(move |w| {
                let shape = match wrapper {
                    0 => Shape::Arrow(v, w),
                    1 => Shape::Arrow(w, v),
                    2 => Shape::Pair(v, w),
                    _ => Shape::Pair(w, v),
                };
                has_structure(v, shape)
            })
        });
        let err = solve(false, let0(co)).unwrap_err();
        let is_cyclic = matches!(err, crate::SolveError::CyclicType { .. });
        prop_assert!(is_cyclic);
    }

    /// The same cycles are fine with recursive types on, and the decoder
    /// always closes them into a finite term.
    #[test]
    fn admitted_cycles_decode_to_finite_mu_types(wrapper in 0u32..4) {
        let co: C<(Ty, ())> = exist(move |v| {
            exist_(move |w| {
                let shape = match wrapper {
                    0 => Shape::Arrow(v, w),
                    1 => Shape::Arrow(w, v),
                    2 => Shape::Pair(v, w),
                    _ => Shape::Pair(w, v),
                };
                has_structure(v, shape)
            })
        });
        let (_, (ty, ())) = solve(true, let0(co)).unwrap();
        prop_assert!(ty.contains_mu());
    }

    #[test]
    fn stating_an_equation_twice_changes_nothing(deep in arb_deep(3)) {
        let copy = deep.clone();
        let once: C<(Ty, ())> = exist(|v| build(deep, move |root| equal(v, root)));
        let twice: C<(Ty, ())> = exist(|v| {
            build(copy, move |root| equal(v, root).and(equal(v, root)).map(|_| ()))
        });
        let (_, (ty_once, ())) = solve(false, let0(once)).unwrap();
        let (_, (ty_twice, ())) = solve(false, let0(twice)).unwrap();
        prop_assert_eq!(ty_once, ty_twice);
    }

    // -----------------------------------------------------------------------
    // Applicative laws
    // -----------------------------------------------------------------------

    #[test]
    fn map_identity_law(value in any::<i64>()) {
        let plain: C<i64> = pure(value);
        let mapped: C<i64> = pure(value).map(|v| v);
        let (_, left) = solve(false, let0(plain)).unwrap();
        let (_, right) = solve(false, let0(mapped)).unwrap();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn map_composition_law(value in any::<i32>()) {
        let f = |n: i32| n.wrapping_add(1);
        let g = |n: i32| n.wrapping_mul(3);
        let composed: C<i32> = pure(value).map(move |n| g(f(n)));
        let chained: C<i32> = pure(value).map(f).map(g);
        let (_, left) = solve(false, let0(composed)).unwrap();
        let (_, right) = solve(false, let0(chained)).unwrap();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn pure_conjunction_pairs_with_the_other_side(value in any::<i64>(), deep in arb_deep(2)) {
        let want = expected_ty(&deep);
        let co: C<(i64, (Ty, ()))> =
            pure(value).and(exist(|v| build(deep, move |root| equal(v, root))));
        let (_, (got_value, (ty, ()))) = solve(false, let0(co)).unwrap();
        prop_assert_eq!(got_value, value);
        prop_assert_eq!(ty, want);
    }
}
