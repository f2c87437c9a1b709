//! The unification graph: descriptors, destructive unification, and the
//! occurs check.
//!
//! Each equivalence class carries one descriptor: an allocation id (stable
//! for the life of the class and used to name decoded variables), an
//! optional shallow structure whose children are other classes, and a
//! generalization rank. Unification merges descriptors through the client's
//! [`TypeForm::merge`], queueing child equations on an explicit worklist
//! rather than recursing.

use std::collections::HashMap;

use weka_types::TypeForm;

use crate::trace::{UnifyAction, UnifyStep};
use crate::unionfind::{NodeId, UnionFind};

/// Per-class state.
pub(crate) struct Descriptor<S> {
    /// Allocation id; decoded variables are named after it.
    pub(crate) id: u32,
    /// Shallow structure, children are other classes. `None` means the
    /// class is still an unknown.
    pub(crate) structure: Option<S>,
    /// Generalization rank: the `let` depth this class currently lives at.
    pub(crate) rank: u32,
    /// Set during generalization for classes that became part of a scheme.
    pub(crate) generic: bool,
}

/// Why a unification failed, in graph terms. The solver attaches the
/// ambient range and decodes the payload at the boundary.
pub(crate) enum UnifyFault {
    /// The two classes build incompatible head constructors.
    Clash(NodeId, NodeId),
    /// Linking would make a type contain itself.
    Cycle(NodeId),
}

pub(crate) struct Graph<F: TypeForm> {
    nodes: UnionFind<Descriptor<F::Shape<NodeId>>>,
    /// When set, every equation is followed by a cycle scan of the classes
    /// it touched. Disabled in recursive-types mode.
    occurs_check: bool,
    tracing: bool,
    trace: Vec<UnifyStep>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Grey,
    Black,
}

impl<F: TypeForm> Graph<F> {
    pub(crate) fn new(occurs_check: bool) -> Self {
        Self {
            nodes: UnionFind::new(),
            occurs_check,
            tracing: false,
            trace: Vec::new(),
        }
    }

    pub(crate) fn enable_tracing(&mut self) {
        self.tracing = true;
    }

    pub(crate) fn take_trace(&mut self) -> Vec<UnifyStep> {
        std::mem::take(&mut self.trace)
    }

    /// Allocate a fresh variable at the given generalization rank.
    pub(crate) fn fresh(&mut self, structure: Option<F::Shape<NodeId>>, rank: u32) -> NodeId {
        let id = self.nodes.len() as u32;
        self.nodes.push(Descriptor {
            id,
            structure,
            rank,
            generic: false,
        })
    }

    pub(crate) fn find(&mut self, node: NodeId) -> NodeId {
        self.nodes.find(node)
    }

    pub(crate) fn id(&mut self, node: NodeId) -> u32 {
        let root = self.nodes.find(node);
        self.nodes.get(root).id
    }

    pub(crate) fn rank(&mut self, node: NodeId) -> u32 {
        let root = self.nodes.find(node);
        self.nodes.get(root).rank
    }

    pub(crate) fn set_rank(&mut self, node: NodeId, rank: u32) {
        let root = self.nodes.find(node);
        self.nodes.get_mut(root).rank = rank;
    }

    pub(crate) fn is_generic(&mut self, node: NodeId) -> bool {
        let root = self.nodes.find(node);
        self.nodes.get(root).generic
    }

    pub(crate) fn set_generic(&mut self, node: NodeId) {
        let root = self.nodes.find(node);
        self.nodes.get_mut(root).generic = true;
    }

    /// Cloned structure of the class. Shapes over node ids are shallow, so
    /// the clone is cheap.
    pub(crate) fn structure(&mut self, node: NodeId) -> Option<F::Shape<NodeId>> {
        let root = self.nodes.find(node);
        self.nodes.get(root).structure.clone()
    }

    pub(crate) fn set_structure(&mut self, node: NodeId, structure: Option<F::Shape<NodeId>>) {
        let root = self.nodes.find(node);
        self.nodes.get_mut(root).structure = structure;
    }

    /// Solve the equation `a = b`.
    ///
    /// Drains a worklist of pending pairs; structure merges enqueue the
    /// child equations they discover. A clash is detected before the two
    /// offending classes are linked, so the fault payload decodes to two
    /// distinct types.
    pub(crate) fn unify(&mut self, a: NodeId, b: NodeId) -> Result<(), UnifyFault> {
        let mut pending = vec![(a, b)];
        let mut touched = Vec::new();

        while let Some((x, y)) = pending.pop() {
            let rx = self.nodes.find(x);
            let ry = self.nodes.find(y);
            if rx == ry {
                let id = self.nodes.get(rx).id;
                self.record(UnifyAction::Identity, id, id, "already the same class");
                continue;
            }

            // Compute the merged structure before linking anything.
            let left_id = self.nodes.get(rx).id;
            let right_id = self.nodes.get(ry).id;
            let left_structure = self.nodes.get(rx).structure.clone();
            let right_structure = self.nodes.get(ry).structure.clone();
            let structure = match (left_structure, right_structure) {
                (None, None) => {
                    self.record(UnifyAction::Link, left_id, right_id, "both unknown");
                    None
                }
                (Some(shape), None) | (None, Some(shape)) => {
                    self.record(UnifyAction::Link, left_id, right_id, "one side known");
                    Some(shape)
                }
                (Some(s1), Some(s2)) => {
                    match F::merge(&s1, &s2, |c1, c2| pending.push((c1, c2))) {
                        Some(merged) => {
                            self.record(
                                UnifyAction::Decompose,
                                left_id,
                                right_id,
                                "decomposed into child equations",
                            );
                            Some(merged)
                        }
                        None => {
                            self.record(
                                UnifyAction::Clash,
                                left_id,
                                right_id,
                                "head constructors disagree",
                            );
                            return Err(UnifyFault::Clash(x, y));
                        }
                    }
                }
            };

            let (root, left, right) = self.nodes.union(rx, ry);
            // The lower-rank side survives as the class identity: the class
            // is promoted toward the enclosing scope. Ties go to the older id.
            let rank = left.rank.min(right.rank);
            let id = if (left.rank, left.id) <= (right.rank, right.id) {
                left.id
            } else {
                right.id
            };
            self.nodes.set(
                root,
                Descriptor {
                    id,
                    structure,
                    rank,
                    generic: false,
                },
            );
            touched.push(root);
        }

        if self.occurs_check {
            let mut state = HashMap::new();
            for node in touched {
                self.acyclic_from(node, &mut state)?;
            }
        }
        Ok(())
    }

    /// Tri-color depth-first scan: meeting a grey class again means the
    /// class participates in its own structure.
    fn acyclic_from(
        &mut self,
        node: NodeId,
        state: &mut HashMap<u32, Color>,
    ) -> Result<(), UnifyFault> {
        let root = self.nodes.find(node);
        let id = self.nodes.get(root).id;
        match state.get(&id) {
            Some(Color::Black) => return Ok(()),
            Some(Color::Grey) => {
                self.record(UnifyAction::OccursCheck, id, id, "cycle detected");
                return Err(UnifyFault::Cycle(root));
            }
            None => {}
        }
        state.insert(id, Color::Grey);
        if let Some(shape) = self.structure(root) {
            let mut children = Vec::new();
            F::visit(&shape, |&child| children.push(child));
            for child in children {
                self.acyclic_from(child, state)?;
            }
        }
        state.insert(id, Color::Black);
        Ok(())
    }

    fn record(&mut self, action: UnifyAction, left: u32, right: u32, detail: &str) {
        if !self.tracing {
            return;
        }
        let step = self.trace.len();
        self.trace.push(UnifyStep {
            step,
            action,
            left,
            right,
            detail: detail.to_string(),
        });
    }
}
