#![forbid(unsafe_code)]

use super::reader::DagReader;
use super::session::QuerySession;
use super::{StoreError, is_constraint_violation, map_insert_conflict, tables};
use dag_core::{DagNum, LeafSet, Node, NodeId};
use rusqlite::{Transaction, params};
use std::collections::BTreeSet;
use std::ops::Deref;

/// Mutating access to one graph. Only constructible from an open
/// transaction, so every write commits or rolls back as a unit; reads through
/// the writer see the transaction's own uncommitted rows.
pub struct DagWriter<'a> {
    reader: DagReader<'a>,
}

impl<'a> Deref for DagWriter<'a> {
    type Target = DagReader<'a>;

    fn deref(&self) -> &Self::Target {
        &self.reader
    }
}

impl<'a> DagWriter<'a> {
    pub fn attach(tx: &'a Transaction<'_>, dagnum: DagNum) -> Result<Self, StoreError> {
        tables::ensure_dag_tables(tx, dagnum)?;
        Ok(Self {
            reader: DagReader::bind(tx, dagnum),
        })
    }

    /// Stores a node whose generation the caller already computed and
    /// updates the leaf table. Returns the assigned sequence number.
    pub fn store_node(&self, node: &Node) -> Result<i64, StoreError> {
        let mut session = self.session()?;
        let sequence = self.insert_node_rows(&mut session, node)?;

        let leaves = &self.tables.leaves;
        let mut remove = self
            .conn
            .prepare_cached(&format!("DELETE FROM {leaves} WHERE child_id=?1"))?;
        for parent in &node.parents {
            remove.execute(params![parent.as_str()])?;
        }
        self.conn.execute(
            &format!("INSERT INTO {leaves}(child_id) VALUES (?1)"),
            params![node.id.as_str()],
        )?;

        Ok(sequence)
    }

    /// Single-node insertion path: computes the generation from the stored
    /// parents, then stores the node.
    pub fn add_node(
        &self,
        id: NodeId,
        parents: impl IntoIterator<Item = NodeId>,
    ) -> Result<Node, StoreError> {
        let parents: BTreeSet<NodeId> = parents.into_iter().collect();
        let generation = self.next_generation(&parents)?;
        let mut node = Node::new(id, parents, generation);
        node.sequence = self.store_node(&node)?;
        Ok(node)
    }

    /// Writes the info and edge rows of `node` without touching the leaf
    /// table.
    pub(super) fn insert_node_rows(
        &self,
        session: &mut QuerySession<'_>,
        node: &Node,
    ) -> Result<i64, StoreError> {
        let info = &self.tables.info;
        let rows = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {info} WHERE child_id=?1"),
            params![node.id.as_str()],
            |row| row.get::<_, i64>(0),
        )?;
        match rows {
            0 => {}
            1 => return Err(StoreError::AlreadyExists),
            n => {
                return Err(StoreError::not_consistent(format!(
                    "{n} info rows for node {}",
                    node.id
                )));
            }
        }

        if node.generation < 1 {
            return Err(StoreError::InvalidInput("generation must be at least 1"));
        }

        let mut missing = BTreeSet::new();
        for parent in &node.parents {
            match session.is_known(parent)? {
                Some(known) if known.generation >= node.generation => {
                    return Err(StoreError::InvalidInput(
                        "generation must exceed every parent generation",
                    ));
                }
                Some(_) => {}
                None => {
                    missing.insert(parent.clone());
                }
            }
        }
        if !missing.is_empty() {
            return Err(StoreError::CannotCreateSparseGraph { missing });
        }

        self.conn
            .prepare_cached(&format!(
                "INSERT INTO {info}(child_id, generation) VALUES (?1, ?2)"
            ))?
            .execute(params![node.id.as_str(), node.generation])
            .map_err(map_insert_conflict)?;
        let sequence = self.conn.last_insert_rowid();

        let mut edge = self.conn.prepare_cached(&format!(
            "INSERT INTO {}(child_id, parent_id) VALUES (?1, ?2)",
            self.tables.edges
        ))?;
        for parent in &node.parents {
            edge.execute(params![node.id.as_str(), parent.as_str()])
                .map_err(|err| {
                    if is_constraint_violation(&err) {
                        return StoreError::not_consistent(format!(
                            "edge {}->{parent} stored before its child",
                            node.id
                        ));
                    }
                    StoreError::from(err)
                })?;
        }

        tracing::trace!(
            dagnum = %self.dagnum,
            id = %node.id,
            generation = node.generation,
            sequence,
            "stored node"
        );
        Ok(sequence)
    }

    /// Replaces the stored leaf set with `leaves`.
    pub(super) fn replace_leaves(&self, leaves: &LeafSet) -> Result<(), StoreError> {
        let table = &self.tables.leaves;
        self.conn.execute(&format!("DELETE FROM {table}"), [])?;
        let mut insert = self
            .conn
            .prepare_cached(&format!("INSERT INTO {table}(child_id) VALUES (?1)"))?;
        for id in leaves.iter() {
            insert.execute(params![id.as_str()])?;
        }
        Ok(())
    }
}
