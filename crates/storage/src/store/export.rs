#![forbid(unsafe_code)]

use super::StoreError;
use super::reader::DagReader;
use super::verify::ConsistencyReport;
use dag_core::{Node, Parent};
use serde_json::{Value as JsonValue, json};

impl<'a> DagReader<'a> {
    /// Diagnostic dump of recent nodes, newest first, one JSON object per
    /// node. Initial nodes list the root marker as their only parent.
    pub fn export_recent(
        &self,
        start_sequence: Option<i64>,
        count: usize,
    ) -> Result<Vec<JsonValue>, StoreError> {
        Ok(self
            .fetch_recent_nodes(start_sequence, count)?
            .iter()
            .map(node_json)
            .collect())
    }
}

impl ConsistencyReport {
    pub fn to_json(&self) -> JsonValue {
        let issues: Vec<JsonValue> = self
            .issues
            .iter()
            .map(|issue| {
                json!({
                    "kind": issue.kind(),
                    "message": issue.to_string(),
                })
            })
            .collect();
        json!({
            "nodes": self.nodes,
            "edges": self.edges,
            "leaves": self.leaves,
            "consistent": self.is_consistent(),
            "issues": issues,
        })
    }
}

fn node_json(node: &Node) -> JsonValue {
    let parents: Vec<JsonValue> = node
        .parent_links()
        .into_iter()
        .map(|parent| match parent {
            Parent::Real(id) => JsonValue::String(id.into_string()),
            Parent::Root => JsonValue::Null,
        })
        .collect();
    json!({
        "id": node.id.as_str(),
        "generation": node.generation,
        "sequence": node.sequence,
        "parents": parents,
    })
}
