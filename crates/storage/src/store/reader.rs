#![forbid(unsafe_code)]

use super::session::QuerySession;
use super::tables::{self, DagTables};
use super::{StoreError, to_sqlite_i64};
use dag_core::{DagNum, KnownNode, Node, NodeId, is_hex_prefix};
use rusqlite::{Connection, params};
use std::collections::BTreeSet;

/// Read access to one graph of the store.
///
/// A graph that has never been written has no tables yet; it reads as empty.
pub struct DagReader<'a> {
    pub(super) conn: &'a Connection,
    pub(super) dagnum: DagNum,
    pub(super) tables: DagTables,
    pub(super) registered: bool,
}

impl<'a> DagReader<'a> {
    pub(super) fn open(conn: &'a Connection, dagnum: DagNum) -> Result<Self, StoreError> {
        let registered = tables::dag_registered(conn, dagnum)?;
        Ok(Self {
            registered,
            ..Self::bind(conn, dagnum)
        })
    }

    /// Binds to a graph whose tables are known to exist.
    pub(super) fn bind(conn: &'a Connection, dagnum: DagNum) -> Self {
        Self {
            conn,
            dagnum,
            tables: DagTables::for_dag(dagnum),
            registered: true,
        }
    }

    pub fn dagnum(&self) -> DagNum {
        self.dagnum
    }

    /// Opens a session for repeated point lookups. Hold it for one logical
    /// operation and let it drop.
    pub fn session(&self) -> Result<QuerySession<'a>, StoreError> {
        if !self.registered {
            return Ok(QuerySession::empty());
        }
        QuerySession::prepare(self.conn, &self.tables)
    }

    pub fn is_known(&self, id: &NodeId) -> Result<Option<KnownNode>, StoreError> {
        self.session()?.is_known(id)
    }

    pub fn fetch_node(&self, id: &NodeId) -> Result<Node, StoreError> {
        self.session()?.node(id)
    }

    pub fn fetch_leaves(&self) -> Result<BTreeSet<NodeId>, StoreError> {
        self.collect_ids(
            &format!("SELECT child_id FROM {} ORDER BY child_id ASC", self.tables.leaves),
            [],
        )
    }

    pub fn fetch_children(&self, id: &NodeId) -> Result<BTreeSet<NodeId>, StoreError> {
        self.collect_ids(
            &format!(
                "SELECT child_id FROM {} WHERE parent_id=?1 ORDER BY child_id ASC",
                self.tables.edges
            ),
            params![id.as_str()],
        )
    }

    /// Ids in the half-open range `[prefix, prefix+1)`. A prefix that is not
    /// hex matches nothing.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<BTreeSet<NodeId>, StoreError> {
        if !is_hex_prefix(prefix) {
            return Ok(BTreeSet::new());
        }
        let low = prefix.to_ascii_lowercase();
        match prefix_upper_bound(&low) {
            Some(high) => self.collect_ids(
                &format!(
                    "SELECT child_id FROM {} WHERE child_id >= ?1 AND child_id < ?2",
                    self.tables.info
                ),
                params![low, high],
            ),
            None => self.collect_ids(
                &format!("SELECT child_id FROM {} WHERE child_id >= ?1", self.tables.info),
                params![low],
            ),
        }
    }

    pub fn count_nodes(&self) -> Result<usize, StoreError> {
        if !self.registered {
            return Ok(0);
        }
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.tables.info),
            [],
            |row| row.get::<_, i64>(0),
        )?;
        usize::try_from(count).map_err(|_| StoreError::not_consistent("negative node count"))
    }

    pub fn fetch_all_node_ids_in_generation_order(&self) -> Result<Vec<NodeId>, StoreError> {
        self.collect_ordered_ids(
            &format!(
                "SELECT child_id FROM {} ORDER BY generation ASC, sequence ASC",
                self.tables.info
            ),
            [],
        )
    }

    /// Inclusive on both ends.
    pub fn fetch_node_ids_in_generation_range(
        &self,
        min_generation: i64,
        max_generation: i64,
    ) -> Result<Vec<NodeId>, StoreError> {
        if min_generation > max_generation {
            return Err(StoreError::InvalidInput(
                "min_generation must not exceed max_generation",
            ));
        }
        self.collect_ordered_ids(
            &format!(
                "SELECT child_id FROM {} WHERE generation BETWEEN ?1 AND ?2 \
                 ORDER BY generation ASC, sequence ASC",
                self.tables.info
            ),
            params![min_generation, max_generation],
        )
    }

    /// Newest first, starting at `start_sequence` (inclusive) or at the
    /// newest node when `None`.
    pub fn fetch_recent_nodes(
        &self,
        start_sequence: Option<i64>,
        count: usize,
    ) -> Result<Vec<Node>, StoreError> {
        let limit = to_sqlite_i64(count)?;
        let start = start_sequence.unwrap_or(i64::MAX);
        let ids = self.collect_ordered_ids(
            &format!(
                "SELECT child_id FROM {} WHERE sequence <= ?1 ORDER BY sequence DESC LIMIT ?2",
                self.tables.info
            ),
            params![start, limit],
        )?;

        let mut session = self.session()?;
        ids.iter().map(|id| session.node(id)).collect()
    }

    /// Generation for a new node with these parents. Unknown parents make
    /// the node impossible to attach.
    pub fn next_generation(&self, parents: &BTreeSet<NodeId>) -> Result<i64, StoreError> {
        let mut session = self.session()?;
        let mut generations = Vec::with_capacity(parents.len());
        let mut missing = BTreeSet::new();
        for parent in parents {
            match session.is_known(parent)? {
                Some(known) => generations.push(known.generation),
                None => {
                    missing.insert(parent.clone());
                }
            }
        }
        if !missing.is_empty() {
            return Err(StoreError::CannotCreateSparseGraph { missing });
        }
        Ok(Node::child_generation(generations))
    }

    fn collect_ids(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<BTreeSet<NodeId>, StoreError> {
        Ok(self.collect_ordered_ids(sql, params)?.into_iter().collect())
    }

    fn collect_ordered_ids(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<NodeId>, StoreError> {
        if !self.registered {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(stored_id(row.get::<_, String>(0)?)?);
        }
        Ok(out)
    }
}

pub(super) fn stored_id(raw: String) -> Result<NodeId, StoreError> {
    NodeId::try_new(raw)
        .map_err(|err| StoreError::not_consistent(format!("stored {}", err.message())))
}

/// Smallest string greater than every string starting with `prefix`, or
/// `None` when the prefix is all `f`.
fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut digits: Vec<char> = prefix.chars().collect();
    while let Some(last) = digits.pop() {
        let next = match last {
            '0'..='8' | 'a'..='e' => char::from(last as u8 + 1),
            '9' => 'a',
            _ => continue,
        };
        digits.push(next);
        return Some(digits.into_iter().collect());
    }
    None
}
