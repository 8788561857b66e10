#![forbid(unsafe_code)]

use crate::ids::NodeId;
use crate::node::Node;
use std::collections::{BTreeMap, BTreeSet};

/// A bounded subgraph exchanged between repositories.
///
/// `members` must be ordered ancestor-before-descendant. The end-fringe lists
/// the oldest ids the fragment relies on without defining them.
pub trait Fragment {
    fn end_fringe(&self) -> &BTreeSet<NodeId>;

    fn members(&self) -> &[Node];

    fn member_count(&self) -> usize {
        self.members().len()
    }

    fn contains(&self, id: &NodeId) -> bool {
        self.members().iter().any(|node| &node.id == id)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeFragment {
    members: Vec<Node>,
    index: BTreeMap<NodeId, usize>,
    end_fringe: BTreeSet<NodeId>,
}

impl NodeFragment {
    /// Builds a fragment whose end-fringe is every referenced parent that is
    /// not itself a member.
    pub fn from_members(members: impl IntoIterator<Item = Node>) -> Self {
        let members = ordered(members);
        let ids: BTreeSet<&NodeId> = members.iter().map(|node| &node.id).collect();
        let end_fringe = members
            .iter()
            .flat_map(|node| node.parents.iter())
            .filter(|parent| !ids.contains(parent))
            .cloned()
            .collect();
        Self::assemble(members, end_fringe)
    }

    /// Builds a fragment with an explicitly declared end-fringe.
    pub fn with_fringe(
        members: impl IntoIterator<Item = Node>,
        end_fringe: impl IntoIterator<Item = NodeId>,
    ) -> Self {
        Self::assemble(ordered(members), end_fringe.into_iter().collect())
    }

    fn assemble(members: Vec<Node>, end_fringe: BTreeSet<NodeId>) -> Self {
        let index = members
            .iter()
            .enumerate()
            .map(|(pos, node)| (node.id.clone(), pos))
            .collect();
        Self {
            members,
            index,
            end_fringe,
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|pos| &self.members[*pos])
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.members.iter().map(|node| &node.id)
    }
}

impl Fragment for NodeFragment {
    fn end_fringe(&self) -> &BTreeSet<NodeId> {
        &self.end_fringe
    }

    fn members(&self) -> &[Node] {
        &self.members
    }

    fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }
}

// Generation strictly increases along every edge, so sorting by it is a
// valid ancestor-before-descendant order.
fn ordered(members: impl IntoIterator<Item = Node>) -> Vec<Node> {
    let mut by_id: BTreeMap<NodeId, Node> = BTreeMap::new();
    for node in members {
        by_id.entry(node.id.clone()).or_insert(node);
    }
    let mut out: Vec<Node> = by_id.into_values().collect();
    out.sort_by(|a, b| a.generation.cmp(&b.generation).then_with(|| a.id.cmp(&b.id)));
    out
}

/// Outcome of checking a fragment's end-fringe against a repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Connected,
    Disconnected { missing: BTreeSet<NodeId> },
}

impl Connectivity {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}
