#![forbid(unsafe_code)]

use super::StoreError;
use super::reader::DagReader;
use super::session::QuerySession;
use super::writer::DagWriter;
use dag_core::{Connectivity, Fragment, LeafSet, NodeFragment, NodeId};
use std::collections::{BTreeSet, VecDeque};

/// Outcome of merging a fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FragmentInsert {
    /// Members stored by this call, in insertion order.
    pub inserted: Vec<NodeId>,
    /// Members the store already had.
    pub skipped: Vec<NodeId>,
}

impl<'a> DagReader<'a> {
    /// Checks that every end-fringe id is already known. Cost is bounded by
    /// the fringe size, not the fragment size.
    pub fn check_connectivity<F: Fragment + ?Sized>(
        &self,
        fragment: &F,
    ) -> Result<Connectivity, StoreError> {
        let mut session = self.session()?;
        connectivity(&mut session, fragment)
    }

    /// Loads the subgraph reachable from `start` down to
    /// `generation(start) - thickness` inclusive. Parents below that floor
    /// form the end-fringe.
    pub fn fetch_fragment(&self, start: &NodeId, thickness: i64) -> Result<NodeFragment, StoreError> {
        if thickness < 0 {
            return Err(StoreError::InvalidInput("thickness must not be negative"));
        }
        let mut session = self.session()?;
        load_fragment(&mut session, start, thickness)
    }
}

impl<'a> DagWriter<'a> {
    /// Commits a connected fragment. Members must come ancestor-first;
    /// members already present are skipped. The leaf set is tracked in memory
    /// and written once at the end, inside the caller's transaction.
    pub fn insert_fragment<F: Fragment + ?Sized>(
        &self,
        fragment: &F,
    ) -> Result<FragmentInsert, StoreError> {
        let mut session = self.session()?;
        if let Connectivity::Disconnected { missing } = connectivity(&mut session, fragment)? {
            return Err(StoreError::CannotCreateSparseGraph { missing });
        }

        let mut leaves: LeafSet = self.fetch_leaves()?.into_iter().collect();
        let mut report = FragmentInsert::default();

        for node in fragment.members() {
            match self.insert_node_rows(&mut session, node) {
                Ok(_) => {
                    leaves.record_insert(node);
                    report.inserted.push(node.id.clone());
                }
                Err(StoreError::AlreadyExists) => report.skipped.push(node.id.clone()),
                Err(err) => return Err(err),
            }
        }

        if !report.inserted.is_empty() {
            self.replace_leaves(&leaves)?;
        }

        tracing::debug!(
            dagnum = %self.dagnum,
            members = fragment.member_count(),
            inserted = report.inserted.len(),
            skipped = report.skipped.len(),
            leaves = leaves.len(),
            "inserted fragment"
        );
        Ok(report)
    }
}

fn connectivity<F: Fragment + ?Sized>(
    session: &mut QuerySession<'_>,
    fragment: &F,
) -> Result<Connectivity, StoreError> {
    let mut missing = BTreeSet::new();
    for id in fragment.end_fringe() {
        if session.is_known(id)?.is_none() {
            missing.insert(id.clone());
        }
    }
    if missing.is_empty() {
        Ok(Connectivity::Connected)
    } else {
        Ok(Connectivity::Disconnected { missing })
    }
}

pub(super) fn load_fragment(
    session: &mut QuerySession<'_>,
    start: &NodeId,
    thickness: i64,
) -> Result<NodeFragment, StoreError> {
    let root = session.node(start)?;
    let floor = root.generation.saturating_sub(thickness);

    let mut seen = BTreeSet::from([start.clone()]);
    let mut fringe = BTreeSet::new();
    let mut members = Vec::new();
    let mut queue = VecDeque::from([root]);

    while let Some(node) = queue.pop_front() {
        for parent in &node.parents {
            if !seen.insert(parent.clone()) {
                continue;
            }
            let known = session.known_parent(parent)?;
            if known.generation >= floor {
                queue.push_back(session.node(parent)?);
            } else {
                fringe.insert(parent.clone());
            }
        }
        members.push(node);
    }

    Ok(NodeFragment::with_fringe(members, fringe))
}
