//! Result shapes returned by the graph layer and serialized to tool callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── References ────────────────────────────────────────────────────

/// Identifies a node by optional label and exact-match properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRef {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl NodeRef {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

// ── Paths ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    pub id: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRelationship {
    pub id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Element id of the start node.
    pub start: String,
    /// Element id of the end node.
    pub end: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// An ordered walk through the graph. `length` counts relationships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    pub nodes: Vec<PathNode>,
    pub relationships: Vec<PathRelationship>,
    pub length: usize,
}

impl GraphPath {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ── Schema ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    /// Engine-reported types, e.g. `["String"]`; `["unknown"]` when sampled.
    pub types: Vec<String>,
}

/// An observed `(label)-[:TYPE]->(label)` combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaTriple {
    pub source: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub labels: Vec<String>,
    pub relationship_types: Vec<String>,
    #[serde(
        rename = "properties_by_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<BTreeMap<String, Vec<PropertyInfo>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triples: Option<Vec<SchemaTriple>>,
}

// ── Database ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub version: String,
    pub edition: String,
    pub address: String,
    pub database: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseStatistics {
    pub node_count: i64,
    pub relationship_count: i64,
    pub label_counts: BTreeMap<String, i64>,
    pub relationship_type_counts: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    /// RANGE, TEXT, POINT, FULLTEXT, LOOKUP, VECTOR.
    pub kind: String,
    /// NODE or RELATIONSHIP.
    pub entity_type: String,
    /// Labels or relationship types the index covers.
    pub targets: Vec<String>,
    pub properties: Vec<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDescriptor {
    pub name: String,
    pub kind: String,
    pub entity_type: String,
    pub targets: Vec<String>,
    pub properties: Vec<String>,
}

/// A sampled node returned by `get_sample_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleNode {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: Map<String, Value>,
}

// ── Statements ────────────────────────────────────────────────────

/// What a write statement did to the graph.
///
/// Node and relationship counts are net deltas between database-wide totals
/// read inside the statement's transaction, so a statement that creates and
/// deletes the same number of nodes reports zero for both. They are exact
/// only while no other session is writing. Statements that cannot run in an
/// explicit transaction leave `counts_observed` false and the counts at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteSummary {
    pub nodes_created: i64,
    pub nodes_deleted: i64,
    pub relationships_created: i64,
    pub relationships_deleted: i64,
    /// Not observable through the driver; always `None`.
    pub properties_set: Option<i64>,
    pub counts_observed: bool,
    pub schema_changed: bool,
    pub rows: Vec<Map<String, Value>>,
}

impl WriteSummary {
    /// Build a summary from before/after `(nodes, relationships)` snapshots.
    pub fn from_counts(before: (i64, i64), after: (i64, i64)) -> Self {
        let node_delta = after.0 - before.0;
        let rel_delta = after.1 - before.1;
        Self {
            nodes_created: node_delta.max(0),
            nodes_deleted: (-node_delta).max(0),
            relationships_created: rel_delta.max(0),
            relationships_deleted: (-rel_delta).max(0),
            counts_observed: true,
            ..Default::default()
        }
    }
}

/// Read, write, or schema statement, as decided by the keyword classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Read,
    Write,
    Schema,
}

/// Outcome of planning a statement with `EXPLAIN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDescription {
    pub statement: String,
    pub kind: StatementKind,
    /// The engine parsed and planned the statement without running it.
    pub planned: bool,
    /// The mutating keyword that classified the statement as a write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_keyword: Option<String>,
}

/// Result of an index or constraint change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminStatus {
    pub status: String,
    pub name: String,
    pub statement: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_summary_from_counts() {
        let created = WriteSummary::from_counts((10, 4), (12, 5));
        assert_eq!(created.nodes_created, 2);
        assert_eq!(created.nodes_deleted, 0);
        assert_eq!(created.relationships_created, 1);
        assert!(created.counts_observed);

        let deleted = WriteSummary::from_counts((10, 4), (7, 0));
        assert_eq!(deleted.nodes_deleted, 3);
        assert_eq!(deleted.relationships_deleted, 4);
        assert_eq!(deleted.nodes_created, 0);
    }

    #[test]
    fn test_relationship_type_field_name() {
        let rel = PathRelationship {
            id: "r1".into(),
            rel_type: "KNOWS".into(),
            start: "a".into(),
            end: "b".into(),
            properties: Map::new(),
        };
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["type"], "KNOWS");
    }

    #[test]
    fn test_node_ref_deserializes_without_label() {
        let r: NodeRef = serde_json::from_str(r#"{"properties": {"name": "Alice"}}"#).unwrap();
        assert!(r.label.is_none());
        assert_eq!(r.properties["name"], "Alice");
    }
}
