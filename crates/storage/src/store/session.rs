#![forbid(unsafe_code)]

use super::StoreError;
use super::reader::stored_id;
use super::tables::DagTables;
use dag_core::{KnownNode, Node, NodeId};
use rusqlite::{CachedStatement, Connection, OptionalExtension, params};
use std::collections::BTreeSet;

/// Prepared lookups reused across the many point queries of one logical
/// operation. Statements go back to the connection's cache on drop.
pub struct QuerySession<'a> {
    lookups: Option<Lookups<'a>>,
}

struct Lookups<'a> {
    known: CachedStatement<'a>,
    parents: CachedStatement<'a>,
}

impl<'a> QuerySession<'a> {
    pub(super) fn prepare(conn: &'a Connection, tables: &DagTables) -> Result<Self, StoreError> {
        let known = conn.prepare_cached(&format!(
            "SELECT generation, sequence FROM {} WHERE child_id=?1",
            tables.info
        ))?;
        let parents = conn.prepare_cached(&format!(
            "SELECT parent_id FROM {} WHERE child_id=?1 ORDER BY parent_id ASC",
            tables.edges
        ))?;
        Ok(Self {
            lookups: Some(Lookups { known, parents }),
        })
    }

    /// Session over a graph without tables: every id is unknown.
    pub(super) fn empty() -> Self {
        Self { lookups: None }
    }

    /// `None` for an unknown id; never an error for that case.
    pub fn is_known(&mut self, id: &NodeId) -> Result<Option<KnownNode>, StoreError> {
        let Some(lookups) = self.lookups.as_mut() else {
            return Ok(None);
        };
        Ok(lookups
            .known
            .query_row(params![id.as_str()], |row| {
                Ok(KnownNode {
                    generation: row.get(0)?,
                    sequence: row.get(1)?,
                })
            })
            .optional()?)
    }

    pub fn parents(&mut self, id: &NodeId) -> Result<BTreeSet<NodeId>, StoreError> {
        let mut out = BTreeSet::new();
        let Some(lookups) = self.lookups.as_mut() else {
            return Ok(out);
        };
        let mut rows = lookups.parents.query(params![id.as_str()])?;
        while let Some(row) = rows.next()? {
            out.insert(stored_id(row.get::<_, String>(0)?)?);
        }
        Ok(out)
    }

    pub fn node(&mut self, id: &NodeId) -> Result<Node, StoreError> {
        let known = self.is_known(id)?.ok_or(StoreError::NotFound)?;
        let parents = self.parents(id)?;
        Ok(Node {
            id: id.clone(),
            generation: known.generation,
            sequence: known.sequence,
            parents,
        })
    }

    /// Facts about a parent that the edge table references. A missing row
    /// means the stored graph is sparse.
    pub(super) fn known_parent(&mut self, id: &NodeId) -> Result<KnownNode, StoreError> {
        self.is_known(id)?
            .ok_or_else(|| StoreError::not_consistent(format!("edge references unknown node {id}")))
    }
}
