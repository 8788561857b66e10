#![forbid(unsafe_code)]

use crate::ids::NodeId;
use crate::node::Node;
use std::collections::BTreeSet;

/// In-memory leaf set carried through a batch insert and flushed once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeafSet {
    ids: BTreeSet<NodeId>,
}

impl LeafSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The new node becomes a leaf; its real parents stop being leaves.
    pub fn record_insert(&mut self, node: &Node) {
        for parent in &node.parents {
            self.ids.remove(parent);
        }
        self.ids.insert(node.id.clone());
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.ids.iter()
    }

    pub fn into_set(self) -> BTreeSet<NodeId> {
        self.ids
    }
}

impl FromIterator<NodeId> for LeafSet {
    fn from_iter<T: IntoIterator<Item = NodeId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
