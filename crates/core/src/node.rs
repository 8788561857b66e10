#![forbid(unsafe_code)]

use crate::ids::NodeId;
use std::collections::BTreeSet;

/// One parent link of a node. Initial nodes link to `Root` only.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Parent {
    Real(NodeId),
    Root,
}

impl Parent {
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            Self::Real(id) => Some(id),
            Self::Root => None,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }
}

/// An immutable vertex of a history graph.
///
/// `sequence` is the local insertion order and is `0` until the node has been
/// stored. It carries no graph meaning beyond being monotonic along every edge
/// inside one store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub generation: i64,
    pub sequence: i64,
    pub parents: BTreeSet<NodeId>,
}

impl Node {
    pub fn new(id: NodeId, parents: impl IntoIterator<Item = NodeId>, generation: i64) -> Self {
        Self {
            id,
            generation,
            sequence: 0,
            parents: parents.into_iter().collect(),
        }
    }

    pub fn initial(id: NodeId) -> Self {
        Self::new(id, std::iter::empty(), 1)
    }

    pub fn is_initial(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn parent_links(&self) -> Vec<Parent> {
        if self.parents.is_empty() {
            return vec![Parent::Root];
        }
        self.parents.iter().cloned().map(Parent::Real).collect()
    }

    /// `1 + max(parent generations)`, or `1` when there are none.
    pub fn child_generation(parent_generations: impl IntoIterator<Item = i64>) -> i64 {
        parent_generations
            .into_iter()
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }
}

/// Row-level facts returned by `is_known`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KnownNode {
    pub generation: i64,
    pub sequence: i64,
}
