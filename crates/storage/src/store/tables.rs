#![forbid(unsafe_code)]

use super::{StoreError, now_ms};
use dag_core::DagNum;
use rusqlite::{Connection, OptionalExtension, params};

pub(super) const INFO_PREFIX: &str = "dag_info_";
pub(super) const EDGES_PREFIX: &str = "dag_edges_";
pub(super) const LEAVES_PREFIX: &str = "dag_leaves_";

/// Physical table names of one graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DagTables {
    pub info: String,
    pub edges: String,
    pub leaves: String,
}

impl DagTables {
    pub fn for_dag(dagnum: DagNum) -> Self {
        let hex = dagnum.hex();
        Self {
            info: format!("{INFO_PREFIX}{hex}"),
            edges: format!("{EDGES_PREFIX}{hex}"),
            leaves: format!("{LEAVES_PREFIX}{hex}"),
        }
    }

    fn create_sql(&self) -> String {
        let Self {
            info,
            edges,
            leaves,
        } = self;
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {info} (
              sequence INTEGER PRIMARY KEY AUTOINCREMENT,
              child_id TEXT NOT NULL UNIQUE,
              generation INTEGER NOT NULL CHECK(generation >= 1)
            );

            CREATE INDEX IF NOT EXISTS idx_{info}_generation
              ON {info}(generation);

            CREATE TABLE IF NOT EXISTS {edges} (
              child_id TEXT NOT NULL,
              parent_id TEXT NOT NULL,
              PRIMARY KEY(child_id, parent_id),
              CHECK(child_id <> parent_id)
            ) WITHOUT ROWID;

            CREATE INDEX IF NOT EXISTS idx_{edges}_parent
              ON {edges}(parent_id);

            CREATE TABLE IF NOT EXISTS {leaves} (
              child_id TEXT PRIMARY KEY
            ) WITHOUT ROWID;
            "#
        )
    }
}

/// True when `name` is one of the per-graph tables this store creates.
pub(super) fn is_dag_table(name: &str) -> bool {
    [INFO_PREFIX, EDGES_PREFIX, LEAVES_PREFIX]
        .iter()
        .filter_map(|prefix| name.strip_prefix(prefix))
        .any(|suffix| suffix.len() == 16 && DagNum::from_hex(suffix).is_some())
}

pub(super) fn dag_registered(conn: &Connection, dagnum: DagNum) -> Result<bool, StoreError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM dags WHERE dagnum=?1",
            params![dagnum.hex()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

/// Registers the graph and creates its tables. Must run inside the caller's
/// write transaction.
pub(super) fn ensure_dag_tables(conn: &Connection, dagnum: DagNum) -> Result<DagTables, StoreError> {
    let tables = DagTables::for_dag(dagnum);
    if dag_registered(conn, dagnum)? {
        return Ok(tables);
    }
    conn.execute_batch(&tables.create_sql())?;
    conn.execute(
        "INSERT OR IGNORE INTO dags(dagnum, created_at_ms) VALUES (?1, ?2)",
        params![dagnum.hex(), now_ms()],
    )?;
    tracing::debug!(dagnum = %dagnum, "registered dag");
    Ok(tables)
}
