#![forbid(unsafe_code)]

mod ancestry;
mod config;
mod error;
mod export;
mod fragments;
mod reader;
mod session;
mod tables;
mod verify;
mod writer;

pub use config::*;
pub use error::StoreError;
pub use fragments::FragmentInsert;
pub use reader::DagReader;
pub use session::QuerySession;
pub use verify::{ConsistencyIssue, ConsistencyReport};
pub use writer::DagWriter;

use dag_core::DagNum;
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

const SCHEMA_VERSION: i64 = 1;

/// A handle on one physical store. Several handles, in one process or many,
/// may open the same directory; SQLite serializes their writers.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
    config: StoreConfig,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_config(storage_dir, StoreConfig::default())
    }

    pub fn open_with_config(
        storage_dir: impl AsRef<Path>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        if config.db_file_name.trim().is_empty() {
            return Err(StoreError::InvalidInput("db_file_name must not be empty"));
        }

        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(&config.db_file_name);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(config.busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        preflight_gate(&conn)?;
        install_schema(&conn)?;

        tracing::debug!(dir = %storage_dir.display(), "opened dag store");
        Ok(Self {
            conn,
            storage_dir,
            config,
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Every graph registered in this store, ascending.
    pub fn list_dags(&self) -> Result<Vec<DagNum>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT dagnum FROM dags ORDER BY dagnum ASC")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let raw = row.get::<_, String>(0)?;
            let dagnum = DagNum::from_hex(&raw)
                .ok_or_else(|| StoreError::not_consistent(format!("bad dagnum row {raw}")))?;
            out.push(dagnum);
        }
        Ok(out)
    }

    pub fn dag_exists(&self, dagnum: DagNum) -> Result<bool, StoreError> {
        tables::dag_registered(&self.conn, dagnum)
    }

    /// When the graph was first written, in unix milliseconds.
    pub fn dag_created_at_ms(&self, dagnum: DagNum) -> Result<i64, StoreError> {
        self.conn
            .query_row(
                "SELECT created_at_ms FROM dags WHERE dagnum=?1",
                params![dagnum.hex()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .ok_or(StoreError::UnknownDag)
    }

    /// Reads outside any transaction. Each statement sees the latest
    /// committed state; use [`SqliteStore::read`] for a stable snapshot.
    /// A graph that was never written reads as empty.
    pub fn reader(&self, dagnum: DagNum) -> Result<DagReader<'_>, StoreError> {
        DagReader::open(&self.conn, dagnum)
    }

    /// Runs `op` inside a deferred transaction so every read observes one
    /// snapshot.
    pub fn read<T>(
        &mut self,
        dagnum: DagNum,
        mut op: impl FnMut(&DagReader<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.with_busy_retry("read", |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
            let out = {
                let reader = DagReader::open(&tx, dagnum)?;
                op(&reader)?
            };
            tx.commit()?;
            Ok(out)
        })
    }

    /// Runs `op` inside an immediate write transaction, registering the graph
    /// on first use. A busy store rolls the attempt back and retries it; any
    /// other error rolls back and is returned unchanged.
    pub fn write<T>(
        &mut self,
        dagnum: DagNum,
        mut op: impl FnMut(&DagWriter<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.with_busy_retry("write", |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let out = {
                let writer = DagWriter::attach(&tx, dagnum)?;
                op(&writer)?
            };
            tx.commit()?;
            Ok(out)
        })
    }

    fn with_busy_retry<T>(
        &mut self,
        what: &'static str,
        mut attempt: impl FnMut(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts = attempts.saturating_add(1);
            match attempt(&mut self.conn) {
                Err(StoreError::StoreBusy) => {
                    if started.elapsed() >= self.config.retry_timeout {
                        tracing::debug!(what, attempts, "store busy, giving up");
                        return Err(StoreError::StoreBusy);
                    }
                    tracing::debug!(what, attempts, "store busy, retrying");
                    std::thread::sleep(self.config.retry_interval);
                }
                other => return other,
            }
        }
    }
}

fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut existing = BTreeSet::new();
    while let Some(row) = rows.next()? {
        existing.insert(row.get::<_, String>(0)?);
    }

    if existing.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = ["store_state", "dags"].into_iter().collect();

    if existing
        .iter()
        .any(|table| !required.contains(table.as_str()) && !tables::is_dag_table(table))
    {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }

    for table in required {
        if !existing.contains(table) {
            return Err(StoreError::InvalidInput(
                "RESET_REQUIRED: required table is missing",
            ));
        }
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS dags (
          dagnum TEXT PRIMARY KEY,
          created_at_ms INTEGER NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO NOTHING",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

fn map_insert_conflict(err: rusqlite::Error) -> StoreError {
    if is_constraint_violation(&err) {
        return StoreError::AlreadyExists;
    }
    StoreError::from(err)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}

fn to_sqlite_i64(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("numeric overflow"))
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
