//! Rank-based generalization: pools, scope exit, schemes, instantiation.
//!
//! Every open `let` scope owns a pool of the variables introduced at its
//! rank. Leaving the scope runs the generalization pass:
//!
//! 1. adjust ranks bottom-up so no variable outranks its children,
//! 2. variables that stayed at the leaving rank become generic,
//! 3. each binding root is closed into a scheme whose quantifiers are the
//!    structureless generic classes reachable from it.
//!
//! Instantiation is the inverse: copy the generic part of a scheme at the
//! current rank, share everything else.

use std::collections::{HashMap, HashSet};

use weka_types::TypeForm;

use crate::unify::Graph;
use crate::unionfind::NodeId;

/// A polymorphic type scheme over the solver's internal graph.
///
/// Quantifiers are the structureless generic classes of the scheme body,
/// in discovery order; instantiation substitutes a fresh variable for each
/// and reports those substitutes as the instantiation witness.
#[derive(Clone)]
pub(crate) struct Scheme {
    pub(crate) quantifiers: Vec<NodeId>,
    pub(crate) root: NodeId,
}

impl Scheme {
    /// A monomorphic scheme: no quantifiers, instantiation shares the body.
    pub(crate) fn mono(root: NodeId) -> Self {
        Self {
            quantifiers: Vec::new(),
            root,
        }
    }
}

/// The stack of per-rank pools. The current rank is the depth of `let`
/// nesting; rank 0 is the outermost scope, opened by the toplevel `let0`.
pub(crate) struct Pools {
    stack: Vec<Vec<NodeId>>,
}

impl Pools {
    pub(crate) fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub(crate) fn current_rank(&self) -> u32 {
        assert!(
            !self.stack.is_empty(),
            "no open scope: solve requires a toplevel let0 constraint"
        );
        (self.stack.len() - 1) as u32
    }

    /// Open a new scope, incrementing the current rank.
    pub(crate) fn enter(&mut self) {
        self.stack.push(Vec::new());
    }

    /// Register a variable in the pool of the current rank.
    pub(crate) fn register(&mut self, node: NodeId) {
        let rank = self.current_rank() as usize;
        self.stack[rank].push(node);
    }

    /// Register a variable in the pool of an enclosing rank. Used when rank
    /// adjustment discovers that a variable escapes the leaving scope.
    fn register_at(&mut self, rank: u32, node: NodeId) {
        self.stack[rank as usize].push(node);
    }

    /// Leave the current scope: generalize what stayed, hand back one scheme
    /// per root plus the deduplicated union of their quantifiers.
    pub(crate) fn exit<F: TypeForm>(
        &mut self,
        graph: &mut Graph<F>,
        roots: &[NodeId],
    ) -> (Vec<Scheme>, Vec<NodeId>) {
        let young_rank = self.current_rank();
        let young = self.stack.pop().expect("exit of an open scope");

        // Adjust ranks. A structured variable can live no higher than its
        // highest-ranked child; variables whose rank drops below the leaving
        // rank escape into the pool they dropped to.
        let mut visited = HashSet::new();
        for &node in &young {
            self.adjust(graph, &mut visited, young_rank, node);
        }

        // Whatever still sits at the leaving rank is generic. Pool entries
        // are stale after unification, so go through the representative.
        for &node in &young {
            let root = graph.find(node);
            if graph.rank(root) == young_rank {
                graph.set_generic(root);
            }
        }

        let mut schemes = Vec::with_capacity(roots.len());
        let mut generalizable = Vec::new();
        let mut reported = HashSet::new();
        for &root in roots {
            let mut quantifiers = Vec::new();
            let mut seen = HashSet::new();
            collect_quantifiers(graph, &mut seen, root, &mut quantifiers);
            for &q in &quantifiers {
                if reported.insert(graph.id(q)) {
                    generalizable.push(q);
                }
            }
            schemes.push(Scheme { quantifiers, root });
        }
        (schemes, generalizable)
    }

    /// Returns the adjusted rank of `node`'s class.
    fn adjust<F: TypeForm>(
        &mut self,
        graph: &mut Graph<F>,
        visited: &mut HashSet<u32>,
        young_rank: u32,
        node: NodeId,
    ) -> u32 {
        let root = graph.find(node);
        if !visited.insert(graph.id(root)) {
            return graph.rank(root);
        }
        let rank = graph.rank(root);
        if rank < young_rank {
            // Belongs to an enclosing scope; its own exit will adjust it.
            return rank;
        }
        let Some(shape) = graph.structure(root) else {
            return rank;
        };
        let mut children = Vec::new();
        F::visit(&shape, |&child| children.push(child));
        let mut highest_child = 0;
        for child in children {
            highest_child = highest_child.max(self.adjust(graph, visited, young_rank, child));
        }
        let adjusted = rank.min(highest_child);
        if adjusted < rank {
            graph.set_rank(root, adjusted);
        }
        if adjusted < young_rank {
            self.register_at(adjusted, root);
        }
        adjusted
    }
}

/// Collect the structureless generic classes reachable from `node`.
/// Non-generic classes are shared boundaries; traversal stops there.
fn collect_quantifiers<F: TypeForm>(
    graph: &mut Graph<F>,
    seen: &mut HashSet<u32>,
    node: NodeId,
    quantifiers: &mut Vec<NodeId>,
) {
    let root = graph.find(node);
    if !graph.is_generic(root) {
        return;
    }
    if !seen.insert(graph.id(root)) {
        return;
    }
    match graph.structure(root) {
        None => quantifiers.push(root),
        Some(shape) => {
            let mut children = Vec::new();
            F::visit(&shape, |&child| children.push(child));
            for child in children {
                collect_quantifiers(graph, seen, child, quantifiers);
            }
        }
    }
}

/// Instantiate a scheme at the current rank.
///
/// Generic classes are copied (the copy memo is seeded before recursing
/// into children, so cyclic schemes terminate); everything else is shared.
/// Returns the copied body plus the witness: the substitutes for the
/// quantifiers, in quantifier order.
pub(crate) fn instantiate<F: TypeForm>(
    graph: &mut Graph<F>,
    pools: &mut Pools,
    scheme: &Scheme,
) -> (NodeId, Vec<NodeId>) {
    let rank = pools.current_rank();
    let mut mapping = HashMap::new();
    let root = copy(graph, pools, rank, &mut mapping, scheme.root);
    let witnesses = scheme
        .quantifiers
        .iter()
        .map(|&q| copy(graph, pools, rank, &mut mapping, q))
        .collect();
    (root, witnesses)
}

fn copy<F: TypeForm>(
    graph: &mut Graph<F>,
    pools: &mut Pools,
    rank: u32,
    mapping: &mut HashMap<u32, NodeId>,
    node: NodeId,
) -> NodeId {
    let root = graph.find(node);
    if !graph.is_generic(root) {
        return root;
    }
    let id = graph.id(root);
    if let Some(&copied) = mapping.get(&id) {
        return copied;
    }
    let fresh = graph.fresh(None, rank);
    pools.register(fresh);
    mapping.insert(id, fresh);
    if let Some(shape) = graph.structure(root) {
        let copied = F::map(&shape, |&child| copy(graph, pools, rank, mapping, child));
        graph.set_structure(fresh, Some(copied));
    }
    fresh
}
