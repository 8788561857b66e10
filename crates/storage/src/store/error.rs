#![forbid(unsafe_code)]

use dag_core::NodeId;
use rusqlite::ErrorCode;
use std::collections::BTreeSet;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    UnknownDag,
    NotFound,
    AlreadyExists,
    CannotCreateSparseGraph { missing: BTreeSet<NodeId> },
    NotDescendant,
    NotConsistent(String),
    StoreBusy,
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO",
            Self::Sql(_) => "SQLITE",
            Self::InvalidInput(message) if message.starts_with("RESET_REQUIRED") => "RESET_REQUIRED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::UnknownDag => "UNKNOWN_DAG",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::CannotCreateSparseGraph { .. } => "CANNOT_CREATE_SPARSE_GRAPH",
            Self::NotDescendant => "NOT_DESCENDANT",
            Self::NotConsistent(_) => "NOT_CONSISTENT",
            Self::StoreBusy => "STORE_BUSY",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::StoreBusy)
    }

    pub(crate) fn not_consistent(message: impl Into<String>) -> Self {
        Self::NotConsistent(message.into())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::UnknownDag => write!(f, "unknown dag"),
            Self::NotFound => write!(f, "node not found"),
            Self::AlreadyExists => write!(f, "node already exists"),
            Self::CannotCreateSparseGraph { missing } => {
                let ids = missing
                    .iter()
                    .map(NodeId::as_str)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "cannot create sparse graph (missing={ids})")
            }
            Self::NotDescendant => write!(f, "node does not descend from the given ancestor"),
            Self::NotConsistent(message) => write!(f, "dag not consistent: {message}"),
            Self::StoreBusy => write!(f, "store busy"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Sql(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if is_busy(&value) {
            return Self::StoreBusy;
        }
        Self::Sql(value)
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => {
            matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        }
        _ => false,
    }
}
