//! The low-level solver: walks a constraint tree against the graph.
//!
//! The walker owns the unification graph, the pool stack, the typing
//! environment, and the table binding constraint variables to graph nodes.
//! It deposits results (schemes, generalizable lists, instantiation
//! witnesses) into the write-once slots embedded in the tree; decoding
//! happens afterwards, in the combinator layer.

use std::collections::{BTreeMap, HashMap};

use weka_types::{Range, TypeForm, Var};

use crate::generalize::{Pools, Scheme, instantiate};
use crate::slot::Slot;
use crate::unify::{Graph, UnifyFault};
use crate::unionfind::NodeId;

/// The constraint tree consumed by the low-level solver. Built exclusively
/// by the combinator layer.
pub(crate) enum RawCo<X, F: TypeForm> {
    /// Trivially satisfied.
    True,
    /// Both must hold, solved left to right.
    Conj(Box<RawCo<X, F>>, Box<RawCo<X, F>>),
    /// Unify the two variables.
    Eq(Var, Var),
    /// Introduce a fresh variable at the current rank, optionally with a
    /// known shallow structure, then solve the body.
    Exist {
        var: Var,
        shape: Option<F::Shape<Var>>,
        body: Box<RawCo<X, F>>,
    },
    /// Instantiate the scheme bound to `name` and unify the copy with
    /// `var`. The witness (one fresh substitute per quantifier) lands in
    /// the slot.
    Instance {
        name: X,
        var: Var,
        witnesses: Slot<Vec<NodeId>>,
    },
    /// Bind `name` monomorphically while solving the body.
    Def {
        name: X,
        var: Var,
        body: Box<RawCo<X, F>>,
    },
    /// Enter a new rank, solve `body` under the fresh binding variables,
    /// generalize, bind the schemes while solving `tail`.
    Let {
        bindings: Vec<LetBinding<X>>,
        body: Box<RawCo<X, F>>,
        tail: Box<RawCo<X, F>>,
        generalizable: Slot<Vec<NodeId>>,
    },
    /// Attach a source range to errors raised while solving the body.
    At(Range, Box<RawCo<X, F>>),
}

pub(crate) struct LetBinding<X> {
    pub(crate) name: X,
    pub(crate) var: Var,
    pub(crate) scheme: Slot<Scheme>,
}

/// A failed solve, in graph terms plus the innermost range.
pub(crate) enum Fault<X> {
    Unbound(Range, X),
    Clash(Range, NodeId, NodeId),
    Cycle(Range, NodeId),
}

pub(crate) struct Solver<X, F: TypeForm> {
    pub(crate) graph: Graph<F>,
    pools: Pools,
    env: BTreeMap<X, Scheme>,
    pub(crate) bindings: HashMap<Var, NodeId>,
    range: Range,
}

impl<X: Clone + Ord, F: TypeForm> Solver<X, F> {
    pub(crate) fn new(rectypes: bool) -> Self {
        Self {
            graph: Graph::new(!rectypes),
            pools: Pools::new(),
            env: BTreeMap::new(),
            bindings: HashMap::new(),
            range: Range::synthetic(),
        }
    }

    pub(crate) fn enable_tracing(&mut self) {
        self.graph.enable_tracing();
    }

    fn node(&self, var: Var) -> NodeId {
        *self
            .bindings
            .get(&var)
            .unwrap_or_else(|| panic!("variable {var} is not bound in this solve"))
    }

    /// Allocate a graph node for a constraint variable at the current rank.
    fn introduce(&mut self, var: Var, shape: Option<F::Shape<Var>>) -> NodeId {
        let shape = shape.map(|s| F::map(&s, |&child| self.node(child)));
        let rank = self.pools.current_rank();
        let node = self.graph.fresh(shape, rank);
        self.pools.register(node);
        if self.bindings.insert(var, node).is_some() {
            panic!("variable {var} was introduced twice; constraints are single-use");
        }
        node
    }

    pub(crate) fn run(&mut self, co: RawCo<X, F>) -> Result<(), Fault<X>> {
        match co {
            RawCo::True => Ok(()),
            RawCo::Conj(first, second) => {
                self.run(*first)?;
                self.run(*second)
            }
            RawCo::Eq(v, w) => {
                let (a, b) = (self.node(v), self.node(w));
                self.unify(a, b)
            }
            RawCo::Exist { var, shape, body } => {
                self.introduce(var, shape);
                self.run(*body)
            }
            RawCo::Instance {
                name,
                var,
                witnesses,
            } => {
                let target = self.node(var);
                let Some(scheme) = self.env.get(&name).cloned() else {
                    return Err(Fault::Unbound(self.range, name));
                };
                let (copy, fresh) = instantiate(&mut self.graph, &mut self.pools, &scheme);
                witnesses.fill(fresh);
                self.unify(copy, target)
            }
            RawCo::Def { name, var, body } => {
                let scheme = Scheme::mono(self.node(var));
                let saved = self.env.insert(name.clone(), scheme);
                let result = self.run(*body);
                self.restore(name, saved);
                result
            }
            RawCo::Let {
                bindings,
                body,
                tail,
                generalizable,
            } => {
                self.pools.enter();
                let roots: Vec<NodeId> = bindings
                    .iter()
                    .map(|binding| self.introduce(binding.var, None))
                    .collect();
                self.run(*body)?;
                let (schemes, generalized) = self.pools.exit(&mut self.graph, &roots);
                generalizable.fill(generalized);
                let mut saved = Vec::with_capacity(bindings.len());
                for (binding, scheme) in bindings.into_iter().zip(schemes) {
                    binding.scheme.fill(scheme.clone());
                    saved.push((
                        binding.name.clone(),
                        self.env.insert(binding.name, scheme),
                    ));
                }
                let result = self.run(*tail);
                for (name, previous) in saved.into_iter().rev() {
                    self.restore(name, previous);
                }
                result
            }
            RawCo::At(range, body) => {
                let saved = self.range;
                self.range = range;
                let result = self.run(*body);
                self.range = saved;
                result
            }
        }
    }

    fn unify(&mut self, a: NodeId, b: NodeId) -> Result<(), Fault<X>> {
        self.graph.unify(a, b).map_err(|fault| match fault {
            UnifyFault::Clash(x, y) => Fault::Clash(self.range, x, y),
            UnifyFault::Cycle(node) => Fault::Cycle(self.range, node),
        })
    }

    fn restore(&mut self, name: X, saved: Option<Scheme>) {
        match saved {
            Some(scheme) => {
                self.env.insert(name, scheme);
            }
            None => {
                self.env.remove(&name);
            }
        }
    }
}
