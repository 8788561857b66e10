#![forbid(unsafe_code)]

mod common;

use common::{DAG, add, diamond, id, ids, open_store};
use dag_core::{Node, NodeFragment};
use dag_storage::{ConsistencyIssue, SqliteStore, StoreError};
use rusqlite::{Connection, params};
use std::collections::BTreeSet;

fn raw_conn(store: &SqliteStore) -> Connection {
    Connection::open(store.storage_dir().join(&store.config().db_file_name)).expect("open sqlite")
}

fn table(kind: &str) -> String {
    format!("dag_{kind}_{}", DAG.hex())
}

#[test]
fn clean_graph_has_no_issues() {
    let mut store = open_store("clean_graph_has_no_issues");
    diamond(&mut store);

    let reader = store.reader(DAG).expect("reader");
    let report = reader.verify().expect("verify");
    assert!(report.is_consistent());
    assert_eq!((report.nodes, report.edges, report.leaves), (4, 4, 1));

    let json = report.to_json();
    assert_eq!(json["consistent"], true);
    assert_eq!(json["issues"].as_array().map(Vec::len), Some(0));
}

#[test]
fn lost_leaf_row_is_reported() {
    let mut store = open_store("lost_leaf_row_is_reported");
    diamond(&mut store);
    raw_conn(&store)
        .execute(&format!("DELETE FROM {}", table("leaves")), [])
        .expect("drop leaves");

    let reader = store.reader(DAG).expect("reader");
    let report = reader.check_consistency().expect("check");
    assert_eq!(
        report.issues,
        vec![ConsistencyIssue::LeafMissing {
            id: id("w").into_string(),
        }]
    );

    let err = reader.verify().expect_err("inconsistent");
    assert_eq!(err.code(), "NOT_CONSISTENT");

    let err = reader
        .find_descendant_heads(&id("x"), false)
        .expect_err("no reachable leaf");
    assert!(matches!(err, StoreError::NotConsistent(_)));
}

#[test]
fn stale_leaf_row_is_reported() {
    let mut store = open_store("stale_leaf_row_is_reported");
    diamond(&mut store);
    raw_conn(&store)
        .execute(
            &format!("INSERT INTO {}(child_id) VALUES (?1)", table("leaves")),
            params![id("y").as_str()],
        )
        .expect("add leaf");

    let report = store
        .reader(DAG)
        .expect("reader")
        .check_consistency()
        .expect("check");
    assert_eq!(
        report.issues,
        vec![ConsistencyIssue::UnexpectedLeaf {
            id: id("y").into_string(),
        }]
    );
    assert_eq!(report.to_json()["issues"][0]["kind"], "unexpected_leaf");
}

#[test]
fn dangling_edges_are_reported() {
    let mut store = open_store("dangling_edges_are_reported");
    diamond(&mut store);
    let conn = raw_conn(&store);
    let edges = table("edges");
    conn.execute(
        &format!("INSERT INTO {edges}(child_id, parent_id) VALUES (?1, ?2)"),
        params![id("w").as_str(), "ab"],
    )
    .expect("sparse edge");
    conn.execute(
        &format!("INSERT INTO {edges}(child_id, parent_id) VALUES (?1, ?2)"),
        params!["cd", id("w").as_str()],
    )
    .expect("orphan edge");

    let report = store
        .reader(DAG)
        .expect("reader")
        .check_consistency()
        .expect("check");
    assert!(report.issues.contains(&ConsistencyIssue::SparseEdge {
        child: id("w").into_string(),
        parent: "ab".to_string(),
    }));
    assert!(report.issues.contains(&ConsistencyIssue::OrphanEdge {
        child: "cd".to_string(),
        parent: id("w").into_string(),
    }));
    // `w` now has a child edge, so its leaf row is stale too.
    assert!(report.issues.contains(&ConsistencyIssue::UnexpectedLeaf {
        id: id("w").into_string(),
    }));
}

#[test]
fn generation_damage_is_reported() {
    let mut store = open_store("generation_damage_is_reported");
    diamond(&mut store);
    raw_conn(&store)
        .execute(
            &format!("UPDATE {} SET generation=3 WHERE child_id=?1", table("info")),
            params![id("y").as_str()],
        )
        .expect("bump generation");

    let report = store
        .reader(DAG)
        .expect("reader")
        .check_consistency()
        .expect("check");
    assert!(report.issues.contains(&ConsistencyIssue::GenerationInversion {
        child: id("w").into_string(),
        parent: id("y").into_string(),
    }));
    assert!(report.issues.contains(&ConsistencyIssue::WrongGeneration {
        id: id("y").into_string(),
        stored: 3,
        expected: 2,
    }));
    assert!(report.issues.contains(&ConsistencyIssue::WrongGeneration {
        id: id("w").into_string(),
        stored: 3,
        expected: 4,
    }));
}

#[test]
fn parent_stored_after_child_is_reported() {
    let mut store = open_store("parent_stored_after_child_is_reported");
    diamond(&mut store);
    raw_conn(&store)
        .execute(
            &format!("UPDATE {} SET sequence=100 WHERE child_id=?1", table("info")),
            params![id("x").as_str()],
        )
        .expect("move sequence");

    let report = store
        .reader(DAG)
        .expect("reader")
        .check_consistency()
        .expect("check");
    let order: Vec<&ConsistencyIssue> = report
        .issues
        .iter()
        .filter(|issue| issue.kind() == "sequence_order")
        .collect();
    assert_eq!(order.len(), 2);
}

#[test]
fn stray_edge_row_aborts_the_insert() {
    let mut store = open_store("stray_edge_row_aborts_the_insert");
    add(&mut store, "a", &[]);
    raw_conn(&store)
        .execute(
            &format!("INSERT INTO {}(child_id, parent_id) VALUES (?1, ?2)", table("edges")),
            params![id("b").as_str(), id("a").as_str()],
        )
        .expect("plant edge");

    let fragment = NodeFragment::from_members([Node::new(id("b"), ids(&["a"]), 2)]);
    let err = store
        .write(DAG, |w| w.insert_fragment(&fragment))
        .expect_err("edge conflict is fatal");
    assert!(matches!(err, StoreError::NotConsistent(_)));

    let err = store
        .write(DAG, |w| w.add_node(id("b"), ids(&["a"])))
        .expect_err("edge conflict is fatal");
    assert_eq!(err.code(), "NOT_CONSISTENT");

    let reader = store.reader(DAG).expect("reader");
    assert_eq!(reader.is_known(&id("b")).expect("is_known"), None);
    assert_eq!(
        reader.fetch_leaves().expect("leaves"),
        BTreeSet::from([id("a")])
    );
}
