//! Decoding: from solved graph classes to client-facing types.
//!
//! Two modes. The acyclic decoder assumes the occurs check has ruled out
//! cycles and memoizes by class, so shared subgraphs decode once. The
//! cyclic decoder detects back-edges and closes them with `mu` binders; it
//! is used for client decoding in recursive-types mode and unconditionally
//! for error payloads, whose types may be cyclic either way.

use std::collections::HashMap;
use std::marker::PhantomData;

use weka_types::{DecodedScheme, Output, TypeForm, Var};

use crate::generalize::Scheme;
use crate::unify::Graph;
use crate::unionfind::NodeId;

/// Converts solved graph nodes into client types. Handed to decoding
/// continuations after a successful solve.
pub struct Decoder<'a, F: TypeForm, O: Output<F>> {
    graph: &'a mut Graph<F>,
    bindings: &'a HashMap<Var, NodeId>,
    cyclic: bool,
    memo: HashMap<u32, O::Ty>,
    _output: PhantomData<O>,
}

enum Visit<T> {
    /// Being decoded right now; the flag records whether a back-edge hit it.
    InProgress { hit: bool },
    Done(T),
}

impl<'a, F: TypeForm, O: Output<F>> Decoder<'a, F, O> {
    pub(crate) fn new(
        graph: &'a mut Graph<F>,
        bindings: &'a HashMap<Var, NodeId>,
        cyclic: bool,
    ) -> Self {
        Self {
            graph,
            bindings,
            cyclic,
            memo: HashMap::new(),
            _output: PhantomData,
        }
    }

    /// Decode a constraint variable.
    pub fn decode(&mut self, var: Var) -> O::Ty {
        let node = *self
            .bindings
            .get(&var)
            .unwrap_or_else(|| panic!("variable {var} was never introduced in this solve"));
        self.decode_node(node)
    }

    pub(crate) fn decode_node(&mut self, node: NodeId) -> O::Ty {
        if self.cyclic {
            let mut state = HashMap::new();
            self.cyclic_node(node, &mut state)
        } else {
            self.acyclic_node(node)
        }
    }

    /// The decoded variable naming a class. Stable across calls.
    pub(crate) fn tyvar(&mut self, node: NodeId) -> O::TyVar {
        O::tyvar(self.graph.id(node))
    }

    pub(crate) fn decode_scheme(&mut self, scheme: &Scheme) -> DecodedScheme<F, O> {
        let quantifiers = scheme.quantifiers.iter().map(|&q| self.tyvar(q)).collect();
        (quantifiers, self.decode_node(scheme.root))
    }

    fn acyclic_node(&mut self, node: NodeId) -> O::Ty {
        let root = self.graph.find(node);
        let id = self.graph.id(root);
        if let Some(ty) = self.memo.get(&id) {
            return ty.clone();
        }
        let ty = match self.graph.structure(root) {
            None => O::variable(O::tyvar(id)),
            Some(shape) => O::structure(F::map(&shape, |&child| self.acyclic_node(child))),
        };
        self.memo.insert(id, ty.clone());
        ty
    }

    fn cyclic_node(&mut self, node: NodeId, state: &mut HashMap<u32, Visit<O::Ty>>) -> O::Ty {
        let root = self.graph.find(node);
        let id = self.graph.id(root);
        match state.get_mut(&id) {
            Some(Visit::Done(ty)) => return ty.clone(),
            Some(Visit::InProgress { hit }) => {
                *hit = true;
                return O::variable(O::tyvar(id));
            }
            None => {}
        }
        state.insert(id, Visit::InProgress { hit: false });
        let body = match self.graph.structure(root) {
            None => O::variable(O::tyvar(id)),
            Some(shape) => O::structure(F::map(&shape, |&child| self.cyclic_node(child, state))),
        };
        let hit = matches!(state.get(&id), Some(Visit::InProgress { hit: true }));
        let ty = if hit {
            O::mu(O::tyvar(id), body)
        } else {
            body
        };
        state.insert(id, Visit::Done(ty.clone()));
        ty
    }
}
