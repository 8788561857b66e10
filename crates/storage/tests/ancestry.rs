#![forbid(unsafe_code)]

mod common;

use common::{DAG, add, chain, diamond, id, ids, open_store};
use dag_core::{HeadsStatus, NodeId, Parent, Relationship, RelationshipChecks};
use dag_storage::StoreError;
use std::collections::BTreeSet;

fn set(labels: &[&str]) -> BTreeSet<NodeId> {
    ids(labels).into_iter().collect()
}

fn path(labels: &[&str]) -> Vec<Parent> {
    ids(labels).into_iter().map(Parent::Real).collect()
}

#[test]
fn diamond_scenario() {
    let mut store = open_store("diamond_scenario");

    add(&mut store, "x", &[]);
    {
        let reader = store.reader(DAG).expect("reader");
        assert_eq!(reader.fetch_leaves().expect("leaves"), set(&["x"]));
        assert_eq!(
            reader.relationship(&id("x"), &id("x")).expect("rel"),
            Relationship::Same
        );
    }

    add(&mut store, "y", &["x"]);
    {
        let reader = store.reader(DAG).expect("reader");
        assert_eq!(reader.fetch_leaves().expect("leaves"), set(&["y"]));
        assert_eq!(
            reader.relationship(&id("x"), &id("y")).expect("rel"),
            Relationship::Ancestor
        );
        assert_eq!(
            reader.relationship(&id("y"), &id("x")).expect("rel"),
            Relationship::Descendant
        );
    }

    add(&mut store, "z", &["x"]);
    {
        let reader = store.reader(DAG).expect("reader");
        assert_eq!(reader.fetch_leaves().expect("leaves"), set(&["y", "z"]));
        assert_eq!(
            reader.relationship(&id("y"), &id("z")).expect("rel"),
            Relationship::Peer
        );
    }

    let w = add(&mut store, "w", &["y", "z"]);
    let reader = store.reader(DAG).expect("reader");
    assert_eq!(reader.fetch_leaves().expect("leaves"), set(&["w"]));
    let y = reader.fetch_node(&id("y")).expect("y");
    let z = reader.fetch_node(&id("z")).expect("z");
    assert_eq!(w.generation, 1 + y.generation.max(z.generation));
    assert_eq!(
        reader
            .highest_sequence_common_ancestor(&ids(&["y", "z"]))
            .expect("common ancestor"),
        id("x")
    );
}

#[test]
fn relationship_is_symmetric() {
    let mut store = open_store("relationship_is_symmetric");
    diamond(&mut store);
    add(&mut store, "v", &["z"]);

    let reader = store.reader(DAG).expect("reader");
    let all = ids(&["x", "y", "z", "w", "v"]);
    for a in &all {
        for b in &all {
            let forward = reader.relationship(a, b).expect("forward");
            let backward = reader.relationship(b, a).expect("backward");
            assert_eq!(forward.inverse(), backward, "{a} vs {b}");
            assert_eq!(forward == Relationship::Same, a == b);
        }
    }

    assert_eq!(
        reader.relationship(&id("w"), &id("v")).expect("rel"),
        Relationship::Peer
    );
    assert_eq!(
        reader.relationship(&id("y"), &id("v")).expect("rel"),
        Relationship::Peer
    );
    assert_eq!(
        reader.relationship(&id("x"), &id("v")).expect("rel"),
        Relationship::Ancestor
    );
}

#[test]
fn skipped_direction_reports_peer() {
    let mut store = open_store("skipped_direction_reports_peer");
    chain(&mut store, &["a", "b", "c"]);

    let reader = store.reader(DAG).expect("reader");
    let (a, c) = (id("a"), id("c"));
    assert_eq!(
        reader
            .relationship_with(&c, &a, RelationshipChecks::ANCESTOR_ONLY)
            .expect("rel"),
        Relationship::Peer
    );
    assert_eq!(
        reader
            .relationship_with(&a, &c, RelationshipChecks::ANCESTOR_ONLY)
            .expect("rel"),
        Relationship::Ancestor
    );
    assert_eq!(
        reader
            .relationship_with(&a, &c, RelationshipChecks::DESCENDANT_ONLY)
            .expect("rel"),
        Relationship::Peer
    );
    assert_eq!(
        reader
            .relationship_with(&c, &a, RelationshipChecks::DESCENDANT_ONLY)
            .expect("rel"),
        Relationship::Descendant
    );
}

#[test]
fn unknown_ids_are_unrelated() {
    let mut store = open_store("unknown_ids_are_unrelated");
    add(&mut store, "a", &[]);

    let reader = store.reader(DAG).expect("reader");
    assert_eq!(
        reader.relationship(&id("a"), &id("ghost")).expect("rel"),
        Relationship::Unknown
    );
    assert_eq!(
        reader.relationship(&id("ghost"), &id("a")).expect("rel"),
        Relationship::Unknown
    );
}

#[test]
fn descendant_heads() {
    let mut store = open_store("descendant_heads");
    diamond(&mut store);
    add(&mut store, "v", &["z"]);

    let reader = store.reader(DAG).expect("reader");

    let leaf = reader.find_descendant_heads(&id("w"), false).expect("heads");
    assert_eq!(leaf.status, HeadsStatus::IsLeaf);
    assert_eq!(leaf.heads, set(&["w"]));

    let unique = reader.find_descendant_heads(&id("y"), false).expect("heads");
    assert_eq!(unique.status, HeadsStatus::Unique);
    assert_eq!(unique.heads, set(&["w"]));

    let multiple = reader.find_descendant_heads(&id("x"), false).expect("heads");
    assert_eq!(multiple.status, HeadsStatus::Multiple);
    assert_eq!(multiple.heads, set(&["w", "v"]));

    let stopped = reader.find_descendant_heads(&id("z"), true).expect("heads");
    assert_eq!(stopped.status, HeadsStatus::Multiple);
    assert!(stopped.heads.is_empty());

    let err = reader
        .find_descendant_heads(&id("ghost"), false)
        .expect_err("unknown start");
    assert!(matches!(err, StoreError::NotFound));
}

#[test]
fn new_since_on_a_chain() {
    let mut store = open_store("new_since_on_a_chain");
    chain(&mut store, &["root", "a", "b", "c"]);

    let reader = store.reader(DAG).expect("reader");
    assert_eq!(
        reader.new_since(&id("a"), &id("c")).expect("new since"),
        set(&["b", "c"])
    );
    assert_eq!(
        reader.new_since_common(&id("a"), &id("c")).expect("new since"),
        ids(&["b", "c"])
    );
    assert!(reader.new_since(&id("c"), &id("c")).is_err());

    let err = reader.new_since(&id("c"), &id("a")).expect_err("wrong direction");
    assert!(matches!(err, StoreError::NotDescendant));
}

#[test]
fn new_since_needs_known_endpoints() {
    let mut store = open_store("new_since_needs_known_endpoints");
    chain(&mut store, &["a", "b", "c"]);

    let reader = store.reader(DAG).expect("reader");
    for (old, new) in [("ghost", "c"), ("a", "ghost"), ("ghost", "ghost")] {
        let err = reader
            .new_since(&id(old), &id(new))
            .expect_err("unknown endpoint");
        assert!(matches!(err, StoreError::NotFound), "{old}..{new}: {err:?}");
        let err = reader
            .new_since_common(&id(old), &id(new))
            .expect_err("unknown endpoint");
        assert!(matches!(err, StoreError::NotFound), "{old}..{new}: {err:?}");
    }
}

#[test]
fn new_since_across_a_merge() {
    let mut store = open_store("new_since_across_a_merge");
    diamond(&mut store);
    add(&mut store, "t", &["w"]);

    let reader = store.reader(DAG).expect("reader");
    assert_eq!(
        reader.new_since(&id("y"), &id("t")).expect("new since"),
        set(&["z", "w", "t"])
    );
    assert_eq!(
        reader.new_since_common(&id("y"), &id("t")).expect("new since"),
        ids(&["z", "w", "t"])
    );
    assert_eq!(
        reader.new_since(&id("x"), &id("t")).expect("new since"),
        set(&["y", "z", "w", "t"])
    );
}

#[test]
fn new_since_common_handles_side_branches() {
    let mut store = open_store("new_since_common_handles_side_branches");
    diamond(&mut store);
    add(&mut store, "v", &["z"]);

    let reader = store.reader(DAG).expect("reader");
    // Nodes only reachable from `w`, oldest first.
    assert_eq!(
        reader.new_since_common(&id("v"), &id("w")).expect("delta"),
        ids(&["y", "w"])
    );
    assert!(
        reader
            .new_since_common(&id("w"), &id("w"))
            .expect("delta")
            .is_empty()
    );
}

#[test]
fn common_ancestor_of_many() {
    let mut store = open_store("common_ancestor_of_many");
    diamond(&mut store);
    add(&mut store, "v", &["z"]);
    add(&mut store, "u", &["v"]);

    let reader = store.reader(DAG).expect("reader");
    let hsca = |labels: &[&str]| reader.highest_sequence_common_ancestor(&ids(labels));

    assert_eq!(hsca(&["w", "v"]).expect("hsca"), id("z"));
    assert_eq!(hsca(&["w", "u", "y"]).expect("hsca"), id("x"));
    assert_eq!(hsca(&["u", "v"]).expect("hsca"), id("v"));
    assert_eq!(hsca(&["w"]).expect("hsca"), id("w"));

    assert!(matches!(hsca(&[]), Err(StoreError::InvalidInput(_))));
    assert!(matches!(hsca(&["w", "ghost"]), Err(StoreError::NotFound)));
}

#[test]
fn unrelated_roots_have_no_common_ancestor() {
    let mut store = open_store("unrelated_roots_have_no_common_ancestor");
    chain(&mut store, &["a", "b"]);
    chain(&mut store, &["p", "q"]);

    let reader = store.reader(DAG).expect("reader");
    let err = reader
        .highest_sequence_common_ancestor(&ids(&["b", "q"]))
        .expect_err("disjoint histories");
    assert!(matches!(err, StoreError::NotFound));
}

#[test]
fn path_along_a_chain() {
    let mut store = open_store("path_along_a_chain");
    chain(&mut store, &["a", "b", "c", "d"]);

    let reader = store.reader(DAG).expect("reader");
    assert_eq!(
        reader
            .find_path_between(Some(&id("b")), &id("d"))
            .expect("path"),
        path(&["d", "c", "b"])
    );

    let mut to_root = path(&["d", "c", "b", "a"]);
    to_root.push(Parent::Root);
    assert_eq!(reader.find_path_between(None, &id("d")).expect("path"), to_root);

    assert_eq!(
        reader
            .find_path_between(Some(&id("d")), &id("d"))
            .expect("path"),
        path(&["d"])
    );
}

#[test]
fn path_prefers_the_shortest_lowest_generation_route() {
    let mut store = open_store("path_prefers_the_shortest_lowest_generation_route");
    add(&mut store, "r", &[]);
    add(&mut store, "q", &["r"]);
    add(&mut store, "p", &["q", "r"]);
    add(&mut store, "m", &["p", "q"]);

    let reader = store.reader(DAG).expect("reader");
    assert_eq!(
        reader
            .find_path_between(Some(&id("r")), &id("m"))
            .expect("path"),
        path(&["m", "q", "r"])
    );

    let mut to_root = path(&["m", "q", "r"]);
    to_root.push(Parent::Root);
    assert_eq!(reader.find_path_between(None, &id("m")).expect("path"), to_root);
}

#[test]
fn path_breaks_equal_generation_ties_by_id() {
    let mut store = open_store("path_breaks_equal_generation_ties_by_id");
    diamond(&mut store);

    let reader = store.reader(DAG).expect("reader");
    let first = id("y").min(id("z"));
    let found = reader.find_path_between(None, &id("w")).expect("path");
    assert_eq!(
        found,
        vec![
            Parent::Real(id("w")),
            Parent::Real(first),
            Parent::Real(id("x")),
            Parent::Root,
        ]
    );
}

#[test]
fn path_requires_ancestry() {
    let mut store = open_store("path_requires_ancestry");
    diamond(&mut store);

    let reader = store.reader(DAG).expect("reader");
    let err = reader
        .find_path_between(Some(&id("y")), &id("z"))
        .expect_err("peers");
    assert!(matches!(err, StoreError::NotDescendant));

    let err = reader
        .find_path_between(Some(&id("w")), &id("x"))
        .expect_err("reversed");
    assert!(matches!(err, StoreError::NotDescendant));

    let err = reader
        .find_path_between(None, &id("ghost"))
        .expect_err("unknown max");
    assert!(matches!(err, StoreError::NotFound));
}
