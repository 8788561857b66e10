#![forbid(unsafe_code)]
#![allow(dead_code)]

use dag_core::{DagNum, Node, NodeId};
use dag_storage::SqliteStore;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

pub const DAG: DagNum = DagNum::new(7);

pub fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("dag_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn open_store(test_name: &str) -> SqliteStore {
    SqliteStore::open(temp_dir(test_name)).expect("open store")
}

/// Content-hash style id derived from a readable label.
pub fn id(label: &str) -> NodeId {
    let digest = Sha256::digest(label.as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    NodeId::try_new(hex).expect("sha256 hex is a node id")
}

pub fn ids(labels: &[&str]) -> Vec<NodeId> {
    labels.iter().map(|label| id(label)).collect()
}

pub fn add(store: &mut SqliteStore, label: &str, parents: &[&str]) -> Node {
    store
        .write(DAG, |w| w.add_node(id(label), ids(parents)))
        .expect("add node")
}

/// X <- Y, X <- Z, {Y, Z} <- W.
pub fn diamond(store: &mut SqliteStore) {
    add(store, "x", &[]);
    add(store, "y", &["x"]);
    add(store, "z", &["x"]);
    add(store, "w", &["y", "z"]);
}

/// Linear history `labels[0] <- labels[1] <- ...`.
pub fn chain(store: &mut SqliteStore, labels: &[&str]) {
    let mut previous: Option<&str> = None;
    for &label in labels {
        match previous {
            Some(parent) => add(store, label, &[parent]),
            None => add(store, label, &[]),
        };
        previous = Some(label);
    }
}
