#![forbid(unsafe_code)]

use super::super::StoreError;
use super::super::reader::DagReader;
use dag_core::{NodeId, Parent};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

impl<'a> DagReader<'a> {
    /// One parent chain from `max` back to `min`, both included, or back to
    /// an initial node followed by [`Parent::Root`] when `min` is `None`.
    ///
    /// Breadth-first from `max`, so the chain is as short as any. Parents are
    /// queued lowest generation first (then by id) and the first route to a
    /// node is the one kept. With diamonds other chains of equal length may
    /// exist; this one is stable across calls.
    pub fn find_path_between(
        &self,
        min: Option<&NodeId>,
        max: &NodeId,
    ) -> Result<Vec<Parent>, StoreError> {
        let mut session = self.session()?;
        let top = session.node(max)?;

        let floor = match min {
            Some(min) => {
                let known = session.is_known(min)?.ok_or(StoreError::NotFound)?;
                if known.generation > top.generation {
                    return Err(StoreError::NotDescendant);
                }
                known.generation
            }
            None => 1,
        };

        let mut came_from: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut seen = BTreeSet::from([max.clone()]);
        let mut queue = VecDeque::from([top]);
        let mut reached = None;

        while let Some(node) = queue.pop_front() {
            let done = match min {
                Some(min) => &node.id == min,
                None => node.is_initial(),
            };
            if done {
                reached = Some(node.id);
                break;
            }

            let mut parents = Vec::with_capacity(node.parents.len());
            for parent in &node.parents {
                if seen.contains(parent) {
                    continue;
                }
                let known = session.known_parent(parent)?;
                if known.generation >= floor {
                    parents.push((known.generation, parent.clone()));
                }
            }
            parents.sort();

            for (_, parent) in parents {
                seen.insert(parent.clone());
                came_from.insert(parent.clone(), node.id.clone());
                queue.push_back(session.node(&parent)?);
            }
        }

        let Some(mut cursor) = reached else {
            return Err(StoreError::NotDescendant);
        };

        let mut path = vec![Parent::Real(cursor.clone())];
        while let Some(next) = came_from.get(&cursor) {
            path.push(Parent::Real(next.clone()));
            cursor = next.clone();
        }
        path.reverse();
        if min.is_none() {
            path.push(Parent::Root);
        }
        Ok(path)
    }
}
