//! MCP tool definitions and the name-to-handler registry.

use std::collections::HashMap;

use futures::future::BoxFuture;
use serde_json::{json, Value};

use neo4j_mcp_graph::GraphService;

use crate::dispatch::ToolError;
use crate::handlers;
use crate::protocol::ToolDescriptor;

/// Async tool handler: graph service plus validated arguments in, JSON out.
pub type Handler = for<'a> fn(&'a GraphService, Value) -> BoxFuture<'a, Result<Value, ToolError>>;

/// One tool: what it's called, what it accepts, and what runs it.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: &'static [&'static str],
    pub input_schema: Value,
    pub handler: Handler,
}

impl ToolSpec {
    fn new(
        name: &'static str,
        description: &'static str,
        properties: Value,
        required: &'static [&'static str],
        handler: Handler,
    ) -> Self {
        Self {
            name,
            description,
            required,
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
            handler,
        }
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema.clone(),
        }
    }
}

/// Fixed table of every tool the server exposes.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, ToolSpec>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        let tools = all_tools()
            .into_iter()
            .map(|spec| (spec.name, spec))
            .collect();
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut out: Vec<ToolDescriptor> = self.tools.values().map(ToolSpec::descriptor).collect();
        out.sort_by_key(|d| d.name);
        out
    }
}

fn node_ref_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "label": {"type": "string", "description": "Node label"},
            "properties": {"type": "object", "description": "Exact-match property values"}
        }
    })
}

fn path_properties(default_depth: i64, with_limit: bool) -> Value {
    let mut props = json!({
        "start_ref": node_ref_schema("Start node: label and/or exact-match properties"),
        "end_ref": node_ref_schema("End node: label and/or exact-match properties"),
        "max_depth": {
            "type": "integer",
            "description": format!("Maximum relationships per path (default: {default_depth}); values above 6 can be slow")
        },
        "relationship_types": {
            "type": "array",
            "items": {"type": "string"},
            "description": "Only follow these relationship types"
        }
    });
    if with_limit {
        props["limit"] = json!({"type": "integer", "description": "Maximum paths returned (default: 5)"});
    }
    props
}

fn all_tools() -> Vec<ToolSpec> {
    vec![
        // ── Schema & Introspection ──
        ToolSpec::new(
            "get_neo4j_schema",
            "List node labels and relationship types. With detailed=true also property names with types per label and observed (label)-[:TYPE]->(label) combinations.",
            json!({
                "detailed": {"type": "boolean", "description": "Include properties and relationship triples (default: false)"}
            }),
            &[],
            handlers::get_schema,
        ),
        ToolSpec::new(
            "get_database_info",
            "Report the Neo4j version, edition, and connection address.",
            json!({}),
            &[],
            handlers::get_database_info,
        ),
        ToolSpec::new(
            "get_database_statistics",
            "Count nodes and relationships overall, per label, and per relationship type.",
            json!({}),
            &[],
            handlers::get_database_statistics,
        ),
        ToolSpec::new(
            "get_node_counts_by_label",
            "Count nodes per label.",
            json!({}),
            &[],
            handlers::get_node_counts_by_label,
        ),
        ToolSpec::new(
            "get_relationship_counts_by_type",
            "Count relationships per type.",
            json!({}),
            &[],
            handlers::get_relationship_counts_by_type,
        ),
        ToolSpec::new(
            "get_indexes",
            "List indexes with their kind, target labels or types, properties, and state.",
            json!({}),
            &[],
            handlers::get_indexes,
        ),
        ToolSpec::new(
            "get_constraints",
            "List constraints with their kind, target labels or types, and properties.",
            json!({}),
            &[],
            handlers::get_constraints,
        ),
        ToolSpec::new(
            "get_sample_data",
            "Return up to limit_per_label nodes with all properties for each label.",
            json!({
                "limit_per_label": {"type": "integer", "description": "Nodes per label (default: 5)"},
                "labels": {"type": "array", "items": {"type": "string"}, "description": "Only sample these labels"}
            }),
            &[],
            handlers::get_sample_data,
        ),
        // ── Cypher ──
        ToolSpec::new(
            "read_neo4j_cypher",
            "Run a read-only Cypher query with parameters and return its rows. Statements that write are rejected.",
            json!({
                "query": {"type": "string", "description": "Cypher query"},
                "params": {"type": "object", "description": "Query parameters"}
            }),
            &["query"],
            handlers::read_cypher,
        ),
        ToolSpec::new(
            "write_neo4j_cypher",
            "Run a Cypher statement that may modify the graph and summarize what changed.",
            json!({
                "query": {"type": "string", "description": "Cypher statement"},
                "params": {"type": "object", "description": "Statement parameters"}
            }),
            &["query"],
            handlers::write_cypher,
        ),
        ToolSpec::new(
            "explain_neo4j_cypher",
            "Have Neo4j parse and plan a Cypher statement without running it.",
            json!({
                "query": {"type": "string", "description": "Cypher statement"}
            }),
            &["query"],
            handlers::explain_cypher,
        ),
        // ── Administration ──
        ToolSpec::new(
            "create_index",
            "Create an index on a label's properties. Kinds: RANGE (default, BTREE accepted), TEXT, POINT, FULLTEXT.",
            json!({
                "label": {"type": "string"},
                "properties": {"type": "array", "items": {"type": "string"}},
                "name": {"type": "string", "description": "Index name (default: idx_<label>_<properties>)"},
                "kind": {"type": "string", "enum": ["RANGE", "BTREE", "TEXT", "POINT", "FULLTEXT"]}
            }),
            &["label", "properties"],
            handlers::create_index,
        ),
        ToolSpec::new(
            "drop_index",
            "Drop an index by name.",
            json!({"name": {"type": "string"}}),
            &["name"],
            handlers::drop_index,
        ),
        ToolSpec::new(
            "create_constraint",
            "Create a constraint on a label's properties. Kinds: UNIQUE, EXISTS (one property), NODE_KEY.",
            json!({
                "label": {"type": "string"},
                "properties": {"type": "array", "items": {"type": "string"}},
                "kind": {"type": "string", "enum": ["UNIQUE", "EXISTS", "NODE_KEY"]},
                "name": {"type": "string", "description": "Constraint name (default: <kind>_<label>_<properties>)"}
            }),
            &["label", "properties", "kind"],
            handlers::create_constraint,
        ),
        ToolSpec::new(
            "drop_constraint",
            "Drop a constraint by name.",
            json!({"name": {"type": "string"}}),
            &["name"],
            handlers::drop_constraint,
        ),
        // ── Exploration ──
        ToolSpec::new(
            "find_nodes",
            "Find nodes with a label whose properties exactly equal the given values.",
            json!({
                "label": {"type": "string"},
                "property_filters": {"type": "object", "description": "Exact-match property values"},
                "limit": {"type": "integer", "description": "Maximum rows (default: 10)"}
            }),
            &["label"],
            handlers::find_nodes,
        ),
        ToolSpec::new(
            "find_relationships",
            "Find relationships of a type whose properties exactly equal the given values.",
            json!({
                "type": {"type": "string", "description": "Relationship type"},
                "property_filters": {"type": "object"},
                "source_label": {"type": "string"},
                "target_label": {"type": "string"},
                "limit": {"type": "integer", "description": "Maximum rows (default: 10)"}
            }),
            &["type"],
            handlers::find_relationships,
        ),
        ToolSpec::new(
            "find_paths",
            "Find paths from the start node to the end node, shortest first.",
            path_properties(3, true),
            &["start_ref", "end_ref"],
            handlers::find_paths,
        ),
        ToolSpec::new(
            "find_shortest_path",
            "Find the shortest path from the start node to the end node. Returns an empty path when none exists.",
            path_properties(5, false),
            &["start_ref", "end_ref"],
            handlers::find_shortest_path,
        ),
        ToolSpec::new(
            "find_all_paths",
            "Find all paths from the start node to the end node that visit no node twice.",
            path_properties(3, true),
            &["start_ref", "end_ref"],
            handlers::find_all_paths,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_every_tool() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.len(), 20);
        for name in [
            "get_neo4j_schema",
            "read_neo4j_cypher",
            "write_neo4j_cypher",
            "explain_neo4j_cypher",
            "create_constraint",
            "find_all_paths",
        ] {
            assert!(registry.get(name).is_some(), "{name}");
        }
    }

    #[test]
    fn test_required_fields_are_declared() {
        let registry = ToolRegistry::new();
        for d in registry.descriptors() {
            let spec = registry.get(d.name).unwrap();
            for field in spec.required {
                assert!(
                    d.input_schema["properties"].get(*field).is_some(),
                    "{} requires undeclared {field}",
                    d.name
                );
            }
        }
    }

    #[test]
    fn test_descriptors_are_sorted() {
        let names: Vec<&str> = ToolRegistry::new().descriptors().iter().map(|d| d.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
