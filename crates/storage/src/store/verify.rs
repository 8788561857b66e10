#![forbid(unsafe_code)]

use super::StoreError;
use super::reader::DagReader;
use rusqlite::Row;

/// One violated structural invariant. Ids are kept as stored text since a
/// corrupt table may hold values that no longer parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsistencyIssue {
    /// A node without children that is not in the leaf table.
    LeafMissing { id: String },
    /// A leaf row for a node that has children or does not exist.
    UnexpectedLeaf { id: String },
    /// An edge whose parent is not a stored node.
    SparseEdge { child: String, parent: String },
    /// An edge whose child is not a stored node.
    OrphanEdge { child: String, parent: String },
    GenerationInversion { child: String, parent: String },
    WrongGeneration { id: String, stored: i64, expected: i64 },
    /// A parent stored after its child.
    SequenceOrder { child: String, parent: String },
    DuplicateInfo { id: String, rows: i64 },
}

impl ConsistencyIssue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LeafMissing { .. } => "leaf_missing",
            Self::UnexpectedLeaf { .. } => "unexpected_leaf",
            Self::SparseEdge { .. } => "sparse_edge",
            Self::OrphanEdge { .. } => "orphan_edge",
            Self::GenerationInversion { .. } => "generation_inversion",
            Self::WrongGeneration { .. } => "wrong_generation",
            Self::SequenceOrder { .. } => "sequence_order",
            Self::DuplicateInfo { .. } => "duplicate_info",
        }
    }
}

impl std::fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeafMissing { id } => write!(f, "{id} has no children but is not a leaf"),
            Self::UnexpectedLeaf { id } => write!(f, "{id} is listed as a leaf"),
            Self::SparseEdge { child, parent } => {
                write!(f, "edge {child}->{parent} references an unknown parent")
            }
            Self::OrphanEdge { child, parent } => {
                write!(f, "edge {child}->{parent} references an unknown child")
            }
            Self::GenerationInversion { child, parent } => {
                write!(f, "generation of {parent} is not below its child {child}")
            }
            Self::WrongGeneration {
                id,
                stored,
                expected,
            } => write!(f, "{id} has generation {stored}, expected {expected}"),
            Self::SequenceOrder { child, parent } => {
                write!(f, "{parent} was stored after its child {child}")
            }
            Self::DuplicateInfo { id, rows } => write!(f, "{id} has {rows} info rows"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub nodes: i64,
    pub edges: i64,
    pub leaves: i64,
    pub issues: Vec<ConsistencyIssue>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

impl<'a> DagReader<'a> {
    /// Recomputes leaves, sparseness and ordering from the raw tables and
    /// lists every disagreement with what is stored.
    pub fn check_consistency(&self) -> Result<ConsistencyReport, StoreError> {
        if !self.registered {
            return Ok(ConsistencyReport::default());
        }
        let info = &self.tables.info;
        let edges = &self.tables.edges;
        let leaves = &self.tables.leaves;

        let mut report = ConsistencyReport {
            nodes: self.count(info)?,
            edges: self.count(edges)?,
            leaves: self.count(leaves)?,
            issues: Vec::new(),
        };

        self.scan(
            &format!(
                "SELECT child_id, COUNT(*) FROM {info} GROUP BY child_id HAVING COUNT(*) > 1 \
                 ORDER BY child_id"
            ),
            &mut report.issues,
            |row| {
                Ok(ConsistencyIssue::DuplicateInfo {
                    id: row.get(0)?,
                    rows: row.get(1)?,
                })
            },
        )?;

        self.scan(
            &format!(
                "SELECT i.child_id FROM {info} i \
                 WHERE NOT EXISTS (SELECT 1 FROM {edges} e WHERE e.parent_id=i.child_id) \
                   AND NOT EXISTS (SELECT 1 FROM {leaves} l WHERE l.child_id=i.child_id) \
                 ORDER BY i.child_id"
            ),
            &mut report.issues,
            |row| Ok(ConsistencyIssue::LeafMissing { id: row.get(0)? }),
        )?;

        self.scan(
            &format!(
                "SELECT l.child_id FROM {leaves} l \
                 WHERE EXISTS (SELECT 1 FROM {edges} e WHERE e.parent_id=l.child_id) \
                    OR NOT EXISTS (SELECT 1 FROM {info} i WHERE i.child_id=l.child_id) \
                 ORDER BY l.child_id"
            ),
            &mut report.issues,
            |row| Ok(ConsistencyIssue::UnexpectedLeaf { id: row.get(0)? }),
        )?;

        self.scan(
            &format!(
                "SELECT e.child_id, e.parent_id FROM {edges} e \
                 LEFT JOIN {info} p ON p.child_id=e.parent_id \
                 WHERE p.child_id IS NULL \
                 ORDER BY e.child_id, e.parent_id"
            ),
            &mut report.issues,
            |row| {
                Ok(ConsistencyIssue::SparseEdge {
                    child: row.get(0)?,
                    parent: row.get(1)?,
                })
            },
        )?;

        self.scan(
            &format!(
                "SELECT e.child_id, e.parent_id FROM {edges} e \
                 LEFT JOIN {info} c ON c.child_id=e.child_id \
                 WHERE c.child_id IS NULL \
                 ORDER BY e.child_id, e.parent_id"
            ),
            &mut report.issues,
            |row| {
                Ok(ConsistencyIssue::OrphanEdge {
                    child: row.get(0)?,
                    parent: row.get(1)?,
                })
            },
        )?;

        self.scan(
            &format!(
                "SELECT e.child_id, e.parent_id FROM {edges} e \
                 JOIN {info} c ON c.child_id=e.child_id \
                 JOIN {info} p ON p.child_id=e.parent_id \
                 WHERE p.generation >= c.generation \
                 ORDER BY e.child_id, e.parent_id"
            ),
            &mut report.issues,
            |row| {
                Ok(ConsistencyIssue::GenerationInversion {
                    child: row.get(0)?,
                    parent: row.get(1)?,
                })
            },
        )?;

        self.scan(
            &format!(
                "SELECT i.child_id, i.generation, COALESCE(MAX(p.generation), 0) + 1 \
                 FROM {info} i \
                 LEFT JOIN {edges} e ON e.child_id=i.child_id \
                 LEFT JOIN {info} p ON p.child_id=e.parent_id \
                 GROUP BY i.child_id, i.generation \
                 HAVING i.generation <> COALESCE(MAX(p.generation), 0) + 1 \
                 ORDER BY i.child_id"
            ),
            &mut report.issues,
            |row| {
                Ok(ConsistencyIssue::WrongGeneration {
                    id: row.get(0)?,
                    stored: row.get(1)?,
                    expected: row.get(2)?,
                })
            },
        )?;

        self.scan(
            &format!(
                "SELECT e.child_id, e.parent_id FROM {edges} e \
                 JOIN {info} c ON c.child_id=e.child_id \
                 JOIN {info} p ON p.child_id=e.parent_id \
                 WHERE p.sequence >= c.sequence \
                 ORDER BY e.child_id, e.parent_id"
            ),
            &mut report.issues,
            |row| {
                Ok(ConsistencyIssue::SequenceOrder {
                    child: row.get(0)?,
                    parent: row.get(1)?,
                })
            },
        )?;

        for issue in &report.issues {
            tracing::debug!(dagnum = %self.dagnum, kind = issue.kind(), "{issue}");
        }
        Ok(report)
    }

    /// Fails with `NotConsistent` naming the first issue found.
    pub fn verify(&self) -> Result<ConsistencyReport, StoreError> {
        let report = self.check_consistency()?;
        match report.issues.first() {
            None => Ok(report),
            Some(first) => Err(StoreError::not_consistent(format!(
                "{} issue(s), first: {first}",
                report.issues.len()
            ))),
        }
    }

    fn count(&self, table: &str) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?)
    }

    fn scan(
        &self,
        sql: &str,
        out: &mut Vec<ConsistencyIssue>,
        map: impl Fn(&Row<'_>) -> rusqlite::Result<ConsistencyIssue>,
    ) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            out.push(map(row)?);
        }
        Ok(())
    }
}
