#![forbid(unsafe_code)]

use super::super::StoreError;
use super::super::reader::DagReader;
use dag_core::{DeltaSide, Frontier, FrontierPush, NodeId, Relationship, RelationshipChecks};
use std::collections::BTreeSet;

impl<'a> DagReader<'a> {
    /// Ancestors of `new` (itself included) that are not ancestors of `old`.
    ///
    /// Walks parents from `new`; a branch stops as soon as it reaches an
    /// ancestor of `old`, since everything behind it is shared history.
    pub fn new_since(&self, old: &NodeId, new: &NodeId) -> Result<BTreeSet<NodeId>, StoreError> {
        let mut session = self.session()?;
        if session.is_known(old)?.is_none() || session.is_known(new)?.is_none() {
            return Err(StoreError::NotFound);
        }
        if self.relationship_in(&mut session, new, old, RelationshipChecks::BOTH)?
            != Relationship::Descendant
        {
            return Err(StoreError::NotDescendant);
        }

        let mut result = BTreeSet::new();
        let mut visited = BTreeSet::from([new.clone()]);
        let mut stack = vec![new.clone()];

        while let Some(id) = stack.pop() {
            match self.relationship_in(&mut session, &id, old, RelationshipChecks::ANCESTOR_ONLY)? {
                Relationship::Same | Relationship::Ancestor => continue,
                _ => {}
            }
            for parent in session.parents(&id)? {
                if visited.insert(parent.clone()) {
                    stack.push(parent);
                }
            }
            result.insert(id);
        }

        Ok(result)
    }

    /// Same set as [`DagReader::new_since`], computed with one shared
    /// frontier and returned ancestor-first (ascending sequence).
    ///
    /// Frontier items are tagged NEW, OLD or BOTH; tags flow to parents by
    /// bitwise OR. The walk ends once no NEW-only item is left.
    pub fn new_since_common(&self, old: &NodeId, new: &NodeId) -> Result<Vec<NodeId>, StoreError> {
        let mut session = self.session()?;
        let known_new = session.is_known(new)?.ok_or(StoreError::NotFound)?;
        let known_old = session.is_known(old)?.ok_or(StoreError::NotFound)?;

        let mut frontier = Frontier::new();
        let mut new_only = 0usize;
        track(
            &mut new_only,
            &frontier.push(known_new.sequence, new.clone(), DeltaSide::NEW),
        );
        track(
            &mut new_only,
            &frontier.push(known_old.sequence, old.clone(), DeltaSide::OLD),
        );

        let mut out = Vec::new();
        while new_only > 0 {
            let Some(item) = frontier.pop_highest() else {
                break;
            };
            if item.marks.is_new_only() {
                new_only -= 1;
                out.push(item.id.clone());
            }
            for parent in session.parents(&item.id)? {
                let known = session.known_parent(&parent)?;
                track(
                    &mut new_only,
                    &frontier.push(known.sequence, parent, item.marks),
                );
            }
        }

        out.reverse();
        Ok(out)
    }
}

fn track(new_only: &mut usize, push: &FrontierPush<DeltaSide>) {
    let was = push.previous.is_some_and(DeltaSide::is_new_only);
    match (was, push.current.is_new_only()) {
        (false, true) => *new_only += 1,
        (true, false) => *new_only -= 1,
        _ => {}
    }
}
