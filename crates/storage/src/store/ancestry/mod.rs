#![forbid(unsafe_code)]

mod common;
mod delta;
mod path;

use super::StoreError;
use super::fragments::load_fragment;
use super::reader::DagReader;
use super::session::QuerySession;
use dag_core::{
    DescendantHeads, Fragment, HeadsStatus, NodeId, Relationship, RelationshipChecks,
};
use std::collections::BTreeSet;

impl<'a> DagReader<'a> {
    pub fn relationship(&self, a: &NodeId, b: &NodeId) -> Result<Relationship, StoreError> {
        self.relationship_with(a, b, RelationshipChecks::BOTH)
    }

    /// Classifies `a` relative to `b`.
    ///
    /// Equal generations can only be peers. Otherwise the deeper node's
    /// fragment, `|generation(a) - generation(b)|` generations thick, is
    /// loaded and searched for the shallower node. Unknown ids yield
    /// `Unknown`.
    pub fn relationship_with(
        &self,
        a: &NodeId,
        b: &NodeId,
        checks: RelationshipChecks,
    ) -> Result<Relationship, StoreError> {
        let mut session = self.session()?;
        self.relationship_in(&mut session, a, b, checks)
    }

    /// [`DagReader::relationship_with`] on a session the caller already holds.
    fn relationship_in(
        &self,
        session: &mut QuerySession<'_>,
        a: &NodeId,
        b: &NodeId,
        checks: RelationshipChecks,
    ) -> Result<Relationship, StoreError> {
        if a == b {
            return Ok(Relationship::Same);
        }

        let (Some(known_a), Some(known_b)) = (session.is_known(a)?, session.is_known(b)?) else {
            return Ok(Relationship::Unknown);
        };

        let difference = known_a.generation - known_b.generation;
        if difference == 0 {
            return Ok(Relationship::Peer);
        }

        if difference > 0 {
            if checks.skip_descendant {
                return Ok(Relationship::Peer);
            }
            let fragment = load_fragment(session, a, difference)?;
            return Ok(if fragment.contains(b) {
                Relationship::Descendant
            } else {
                Relationship::Peer
            });
        }

        if checks.skip_ancestor {
            return Ok(Relationship::Peer);
        }
        let fragment = load_fragment(session, b, -difference)?;
        Ok(if fragment.contains(a) {
            Relationship::Ancestor
        } else {
            Relationship::Peer
        })
    }

    /// Current leaves that descend from `start`.
    ///
    /// With `stop_at_first_ambiguous`, enumeration stops at the second match
    /// and the partial set is discarded. Finding no leaf at all means the
    /// stored graph is broken.
    pub fn find_descendant_heads(
        &self,
        start: &NodeId,
        stop_at_first_ambiguous: bool,
    ) -> Result<DescendantHeads, StoreError> {
        let mut session = self.session()?;
        if session.is_known(start)?.is_none() {
            return Err(StoreError::NotFound);
        }

        let leaves = self.fetch_leaves()?;
        if leaves.contains(start) {
            return Ok(DescendantHeads {
                status: HeadsStatus::IsLeaf,
                heads: BTreeSet::from([start.clone()]),
            });
        }

        let mut heads = BTreeSet::new();
        for leaf in &leaves {
            if self.relationship_in(&mut session, leaf, start, RelationshipChecks::DESCENDANT_ONLY)?
                != Relationship::Descendant
            {
                continue;
            }
            heads.insert(leaf.clone());
            if stop_at_first_ambiguous && heads.len() > 1 {
                return Ok(DescendantHeads {
                    status: HeadsStatus::Multiple,
                    heads: BTreeSet::new(),
                });
            }
        }

        let status = match heads.len() {
            0 => {
                return Err(StoreError::not_consistent(format!(
                    "no leaf descends from {start}"
                )));
            }
            1 => HeadsStatus::Unique,
            _ => HeadsStatus::Multiple,
        };
        Ok(DescendantHeads { status, heads })
    }
}
