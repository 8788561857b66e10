#![forbid(unsafe_code)]

use super::super::StoreError;
use super::super::reader::DagReader;
use dag_core::{AncestorMask, Frontier, NodeId};

impl<'a> DagReader<'a> {
    /// Most recent common ancestor of all `ids`.
    ///
    /// Each frontier item records which inputs it is an ancestor of. Items
    /// pop in descending sequence order, so the first one carrying every bit
    /// is the answer. `NotFound` if an input is unknown or the inputs share
    /// no ancestor.
    pub fn highest_sequence_common_ancestor(&self, ids: &[NodeId]) -> Result<NodeId, StoreError> {
        if ids.is_empty() {
            return Err(StoreError::InvalidInput("ids must not be empty"));
        }

        let width = ids.len();
        let mut session = self.session()?;
        let mut frontier = Frontier::new();
        for (bit, id) in ids.iter().enumerate() {
            let known = session.is_known(id)?.ok_or(StoreError::NotFound)?;
            frontier.push(known.sequence, id.clone(), AncestorMask::single(width, bit));
        }

        while let Some(item) = frontier.pop_highest() {
            if item.marks.is_full() {
                return Ok(item.id);
            }
            for parent in session.parents(&item.id)? {
                let known = session.known_parent(&parent)?;
                frontier.push(known.sequence, parent, item.marks.clone());
            }
        }

        Err(StoreError::NotFound)
    }
}
