//! Union-find arena over unification variables.
//!
//! Variables, their links, and their descriptors live in parallel vectors
//! indexed by [`NodeId`]; there is no pointer aliasing anywhere in the
//! graph. Path halving plus union by weight gives the usual near-constant
//! amortized cost. The weight used for balancing here is the classic
//! union-find rank and has nothing to do with the generalization rank
//! stored in descriptors.

/// Index of a unification variable in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(pub(crate) u32);

pub(crate) struct UnionFind<D> {
    parent: Vec<u32>,
    weight: Vec<u8>,
    /// `Some` exactly for class representatives.
    descriptor: Vec<Option<D>>,
}

impl<D> UnionFind<D> {
    pub(crate) fn new() -> Self {
        Self {
            parent: Vec::new(),
            weight: Vec::new(),
            descriptor: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.parent.len()
    }

    /// Allocate a fresh singleton class.
    pub(crate) fn push(&mut self, descriptor: D) -> NodeId {
        let index = self.parent.len() as u32;
        self.parent.push(index);
        self.weight.push(0);
        self.descriptor.push(Some(descriptor));
        NodeId(index)
    }

    /// Find the representative of `node`, halving the path on the way.
    pub(crate) fn find(&mut self, node: NodeId) -> NodeId {
        let mut index = node.0 as usize;
        while self.parent[index] as usize != index {
            let grandparent = self.parent[self.parent[index] as usize];
            self.parent[index] = grandparent;
            index = grandparent as usize;
        }
        NodeId(index as u32)
    }

    /// Descriptor of a representative.
    pub(crate) fn get(&self, root: NodeId) -> &D {
        debug_assert_eq!(self.parent[root.0 as usize], root.0, "not a representative");
        self.descriptor[root.0 as usize]
            .as_ref()
            .expect("representative carries a descriptor")
    }

    pub(crate) fn get_mut(&mut self, root: NodeId) -> &mut D {
        debug_assert_eq!(self.parent[root.0 as usize], root.0, "not a representative");
        self.descriptor[root.0 as usize]
            .as_mut()
            .expect("representative carries a descriptor")
    }

    /// Replace the descriptor stored at a representative.
    pub(crate) fn set(&mut self, root: NodeId, descriptor: D) {
        debug_assert_eq!(self.parent[root.0 as usize], root.0, "not a representative");
        self.descriptor[root.0 as usize] = Some(descriptor);
    }

    /// Link two distinct representatives and return the surviving root plus
    /// both descriptors. The caller decides what the merged descriptor looks
    /// like and stores it with [`set`](Self::set).
    pub(crate) fn union(&mut self, a: NodeId, b: NodeId) -> (NodeId, D, D) {
        debug_assert_ne!(a, b, "union of a class with itself");
        let left = self.descriptor[a.0 as usize]
            .take()
            .expect("representative carries a descriptor");
        let right = self.descriptor[b.0 as usize]
            .take()
            .expect("representative carries a descriptor");
        let (wa, wb) = (self.weight[a.0 as usize], self.weight[b.0 as usize]);
        let root = if wa < wb {
            self.parent[a.0 as usize] = b.0;
            b
        } else {
            self.parent[b.0 as usize] = a.0;
            if wa == wb {
                self.weight[a.0 as usize] += 1;
            }
            a
        };
        (root, left, right)
    }
}
