#![forbid(unsafe_code)]

use crate::ancestry::Marks;
use crate::ids::NodeId;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrontierItem<M> {
    pub sequence: i64,
    pub id: NodeId,
    pub marks: M,
}

/// Result of pushing into a frontier: the marks before and after the merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrontierPush<M> {
    pub previous: Option<M>,
    pub current: M,
}

impl<M: Marks> FrontierPush<M> {
    pub fn changed(&self) -> bool {
        self.previous.as_ref() != Some(&self.current)
    }
}

/// Work queue of graph walks, keyed by local sequence number.
///
/// Every parent has a lower sequence than its child, so popping the highest
/// sequence never visits a node before all of its queued descendants.
#[derive(Clone, Debug)]
pub struct Frontier<M> {
    items: BTreeMap<i64, (NodeId, M)>,
}

impl<M: Marks> Default for Frontier<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Marks> Frontier<M> {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, sequence: i64, id: NodeId, marks: M) -> FrontierPush<M> {
        match self.items.get_mut(&sequence) {
            Some((_, existing)) => {
                let previous = existing.clone();
                existing.merge(&marks);
                FrontierPush {
                    previous: Some(previous),
                    current: existing.clone(),
                }
            }
            None => {
                self.items.insert(sequence, (id, marks.clone()));
                FrontierPush {
                    previous: None,
                    current: marks,
                }
            }
        }
    }

    pub fn pop_highest(&mut self) -> Option<FrontierItem<M>> {
        self.items
            .pop_last()
            .map(|(sequence, (id, marks))| FrontierItem { sequence, id, marks })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
