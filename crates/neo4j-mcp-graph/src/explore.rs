//! Graph exploration: exact-match lookups and path finding.
//!
//! Traversal is delegated to the engine. All three path operations follow
//! outgoing relationships from the start node, so a shortest path is never
//! longer than any path the enumerations return.

use serde_json::{Map, Value};

use neo4j_mcp_core::{GraphPath, NodeRef};

use crate::cypher::{quote_all, quote_identifier};
use crate::error::{GraphError, Result};
use crate::runner::{Record, Statement};
use crate::service::{decode, get_map, get_str, require_positive, require_text, GraphService};

pub const DEFAULT_FIND_LIMIT: i64 = 10;
pub const DEFAULT_PATH_LIMIT: i64 = 5;
pub const DEFAULT_PATH_DEPTH: i64 = 3;
pub const DEFAULT_SHORTEST_PATH_DEPTH: i64 = 5;

/// Depth beyond which enumeration gets expensive on real graphs.
pub const DEEP_SEARCH_WARNING: i64 = 6;

const PATH_PROJECTION: &str = "RETURN
       [n IN nodes(p) | {id: elementId(n), labels: labels(n), properties: properties(n)}] AS nodes,
       [r IN relationships(p) | {id: elementId(r), type: type(r),
         start: elementId(startNode(r)), end: elementId(endNode(r)),
         properties: properties(r)}] AS relationships,
       length(p) AS length";

/// Options shared by the path operations.
#[derive(Debug, Clone, Default)]
pub struct PathOptions {
    pub max_depth: Option<i64>,
    pub relationship_types: Vec<String>,
    pub limit: Option<i64>,
}

/// Render `(var:Label {key: $var_0})` and bind its property values.
fn node_pattern(var: &str, node: &NodeRef, statement: &mut Statement) -> Result<String> {
    let mut pattern = format!("({var}");
    if let Some(label) = &node.label {
        pattern.push(':');
        pattern.push_str(&quote_identifier(label)?);
    }
    pattern.push_str(&property_map(var, &node.properties, statement)?);
    pattern.push(')');
    Ok(pattern)
}

/// Render ` {key: $prefix_0, ...}` for exact-match filters; empty when no filters.
fn property_map(
    prefix: &str,
    properties: &Map<String, Value>,
    statement: &mut Statement,
) -> Result<String> {
    if properties.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(properties.len());
    for (i, (key, value)) in properties.iter().enumerate() {
        let param = format!("{prefix}_{i}");
        parts.push(format!("{}: ${param}", quote_identifier(key)?));
        statement.params.insert(param, value.clone());
    }
    Ok(format!(" {{{}}}", parts.join(", ")))
}

fn require_reference(node: &NodeRef, what: &str) -> Result<()> {
    if node.label.as_deref().map_or(true, |l| l.trim().is_empty()) && node.properties.is_empty() {
        return Err(GraphError::invalid(format!(
            "{what} must name a label or at least one property"
        )));
    }
    Ok(())
}

fn relationship_pattern(types: &[String], max_depth: i64, lower: &str) -> Result<String> {
    let types = if types.is_empty() {
        String::new()
    } else {
        format!(":{}", quote_all(types, "relationship_types")?.join("|"))
    };
    Ok(format!("-[{types}*{lower}..{max_depth}]->"))
}

fn resolve_depth(requested: Option<i64>, default: i64) -> Result<i64> {
    let depth = requested.unwrap_or(default);
    require_positive(depth, "max_depth")?;
    if depth > DEEP_SEARCH_WARNING {
        tracing::warn!(max_depth = depth, "Deep path search requested");
    }
    Ok(depth)
}

fn decode_path(record: &Record) -> Result<GraphPath> {
    let length: i64 = decode(record, "length")?;
    Ok(GraphPath {
        nodes: decode(record, "nodes")?,
        relationships: decode(record, "relationships")?,
        length: usize::try_from(length).unwrap_or(0),
    })
}

impl GraphService {
    // ── Lookups ──────────────────────────────────────────────────

    /// Property maps of nodes with `label` whose properties equal the filters.
    pub async fn find_nodes(
        &self,
        label: &str,
        property_filters: &Map<String, Value>,
        limit: i64,
    ) -> Result<Vec<Map<String, Value>>> {
        require_text(label, "label")?;
        require_positive(limit, "limit")?;

        let mut statement = Statement::new("");
        let pattern = node_pattern(
            "n",
            &NodeRef {
                label: Some(label.to_string()),
                properties: property_filters.clone(),
            },
            &mut statement,
        )?;
        statement.text = format!("MATCH {pattern} RETURN properties(n) AS n LIMIT $limit");
        statement = statement.param("limit", limit);

        let rows = self.runner().fetch(statement).await?;
        Ok(rows.iter().map(|r| get_map(r, "n")).collect())
    }

    /// Relationships of `rel_type` whose properties equal the filters.
    pub async fn find_relationships(
        &self,
        rel_type: &str,
        property_filters: &Map<String, Value>,
        limit: i64,
        source_label: Option<&str>,
        target_label: Option<&str>,
    ) -> Result<Vec<Map<String, Value>>> {
        require_text(rel_type, "type")?;
        require_positive(limit, "limit")?;

        let mut statement = Statement::new("");
        let source = node_pattern(
            "a",
            &NodeRef {
                label: source_label.map(str::to_string),
                properties: Map::new(),
            },
            &mut statement,
        )?;
        let target = node_pattern(
            "b",
            &NodeRef {
                label: target_label.map(str::to_string),
                properties: Map::new(),
            },
            &mut statement,
        )?;
        let props = property_map("r", property_filters, &mut statement)?;
        statement.text = format!(
            "MATCH {source}-[r:{}{props}]->{target}
             RETURN properties(a) AS source, type(r) AS type,
                    properties(r) AS properties, properties(b) AS target
             LIMIT $limit",
            quote_identifier(rel_type)?
        );
        statement = statement.param("limit", limit);

        let rows = self.runner().fetch(statement).await?;
        Ok(rows
            .iter()
            .map(|r| {
                let mut out = Map::new();
                out.insert("source".into(), Value::Object(get_map(r, "source")));
                out.insert("type".into(), Value::String(get_str(r, "type")));
                out.insert("properties".into(), Value::Object(get_map(r, "properties")));
                out.insert("target".into(), Value::Object(get_map(r, "target")));
                out
            })
            .collect())
    }

    // ── Paths ────────────────────────────────────────────────────

    /// Paths from `start` to `end` of at most `max_depth` hops, shortest first.
    pub async fn find_paths(
        &self,
        start: &NodeRef,
        end: &NodeRef,
        options: &PathOptions,
    ) -> Result<Vec<GraphPath>> {
        let depth = resolve_depth(options.max_depth, DEFAULT_PATH_DEPTH)?;
        let statement = self.path_statement(start, end, options, depth, false)?;
        let rows = self.runner().fetch(statement).await?;
        rows.iter().map(decode_path).collect()
    }

    /// Paths from `start` to `end` that never revisit a node.
    pub async fn find_all_paths(
        &self,
        start: &NodeRef,
        end: &NodeRef,
        options: &PathOptions,
    ) -> Result<Vec<GraphPath>> {
        let depth = resolve_depth(options.max_depth, DEFAULT_PATH_DEPTH)?;
        let statement = self.path_statement(start, end, options, depth, true)?;
        let rows = self.runner().fetch(statement).await?;
        rows.iter().map(decode_path).collect()
    }

    /// The engine's shortest path from `start` to `end`.
    ///
    /// Returns an empty path when no path exists or both references resolve
    /// to the same node.
    pub async fn find_shortest_path(
        &self,
        start: &NodeRef,
        end: &NodeRef,
        options: &PathOptions,
    ) -> Result<GraphPath> {
        require_reference(start, "start_ref")?;
        require_reference(end, "end_ref")?;
        let depth = resolve_depth(options.max_depth, DEFAULT_SHORTEST_PATH_DEPTH)?;

        let mut statement = Statement::new("");
        let a = node_pattern("a", start, &mut statement)?;
        let b = node_pattern("b", end, &mut statement)?;
        let rel = relationship_pattern(&options.relationship_types, depth, "")?;
        statement.text = format!(
            "MATCH {a}, {b} WHERE a <> b
             MATCH p = shortestPath((a){rel}(b))
             {PATH_PROJECTION}
             ORDER BY length LIMIT 1"
        );

        let rows = self.runner().fetch(statement).await?;
        match rows.first() {
            Some(row) => decode_path(row),
            None => Ok(GraphPath::default()),
        }
    }

    fn path_statement(
        &self,
        start: &NodeRef,
        end: &NodeRef,
        options: &PathOptions,
        depth: i64,
        simple: bool,
    ) -> Result<Statement> {
        require_reference(start, "start_ref")?;
        require_reference(end, "end_ref")?;
        let limit = options.limit.unwrap_or(DEFAULT_PATH_LIMIT);
        require_positive(limit, "limit")?;

        let mut statement = Statement::new("");
        let a = node_pattern("a", start, &mut statement)?;
        let b = node_pattern("b", end, &mut statement)?;
        let rel = relationship_pattern(&options.relationship_types, depth, "1")?;
        let filter = if simple {
            "WHERE ALL(x IN nodes(p) WHERE single(y IN nodes(p) WHERE y = x))"
        } else {
            ""
        };
        statement.text = format!(
            "MATCH p = {a}{rel}{b}
             {filter}
             {PATH_PROJECTION}
             ORDER BY length
             LIMIT $limit"
        );
        Ok(statement.param("limit", limit))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use neo4j_mcp_core::ErrorKind;
    use serde_json::json;

    use super::*;
    use crate::mock::MockRunner;

    fn service() -> (Arc<MockRunner>, GraphService) {
        let mock = Arc::new(MockRunner::new());
        (mock.clone(), GraphService::new(mock))
    }

    fn person(name: &str) -> NodeRef {
        NodeRef::new("Person").with_property("name", name)
    }

    fn two_hop_row() -> Value {
        json!({
            "nodes": [
                {"id": "n1", "labels": ["Person"], "properties": {"name": "Alice"}},
                {"id": "n2", "labels": ["Person"], "properties": {"name": "Bob"}},
                {"id": "n3", "labels": ["Person"], "properties": {"name": "Charlie"}}
            ],
            "relationships": [
                {"id": "r1", "type": "KNOWS", "start": "n1", "end": "n2", "properties": {}},
                {"id": "r2", "type": "KNOWS", "start": "n2", "end": "n3", "properties": {}}
            ],
            "length": 2
        })
    }

    #[tokio::test]
    async fn test_find_nodes_binds_filters() {
        let (mock, svc) = service();
        mock.reply_rows("MATCH (n:`Person`", vec![json!({"n": {"name": "Alice", "age": 30}})]);

        let mut filters = Map::new();
        filters.insert("name".into(), json!("Alice"));
        let rows = svc.find_nodes("Person", &filters, 10).await.unwrap();

        assert_eq!(rows, vec![json!({"name": "Alice", "age": 30}).as_object().unwrap().clone()]);
        let stmt = mock.last().unwrap();
        assert!(stmt.text.starts_with("MATCH (n:`Person` {`name`: $n_0})"));
        assert_eq!(stmt.params["n_0"], "Alice");
        assert_eq!(stmt.params["limit"], 10);
    }

    #[tokio::test]
    async fn test_find_nodes_validates_arguments() {
        let (mock, svc) = service();
        assert_eq!(
            svc.find_nodes("", &Map::new(), 10).await.unwrap_err().kind(),
            ErrorKind::InvalidArguments
        );
        assert_eq!(
            svc.find_nodes("Person", &Map::new(), 0).await.unwrap_err().kind(),
            ErrorKind::InvalidArguments
        );
        assert!(mock.executed().is_empty());
    }

    #[tokio::test]
    async fn test_find_relationships_with_endpoint_labels() {
        let (mock, svc) = service();
        let mut filters = Map::new();
        filters.insert("since".into(), json!(2020));
        svc.find_relationships("KNOWS", &filters, 5, Some("Person"), None)
            .await
            .unwrap();

        let stmt = mock.last().unwrap();
        assert!(stmt
            .text
            .starts_with("MATCH (a:`Person`)-[r:`KNOWS` {`since`: $r_0}]->(b)"));
        assert_eq!(stmt.params["r_0"], 2020);
    }

    #[tokio::test]
    async fn test_shortest_path_decodes_rows() {
        let (mock, svc) = service();
        mock.reply_rows("shortestPath", vec![two_hop_row()]);

        let path = svc
            .find_shortest_path(&person("Alice"), &person("Charlie"), &PathOptions::default())
            .await
            .unwrap();

        assert_eq!(path.length, 2);
        assert_eq!(path.nodes[2].properties["name"], "Charlie");
        assert_eq!(path.relationships[0].rel_type, "KNOWS");
        let stmt = mock.last().unwrap();
        assert!(stmt.text.contains("WHERE a <> b"));
        assert!(stmt.text.contains("-[*..5]->"));
    }

    #[tokio::test]
    async fn test_shortest_path_empty_when_unreachable() {
        let (_, svc) = service();
        let path = svc
            .find_shortest_path(&person("Alice"), &person("Nobody"), &PathOptions::default())
            .await
            .unwrap();
        assert!(path.is_empty());
        assert_eq!(path.length, 0);
    }

    #[tokio::test]
    async fn test_all_paths_are_simple_and_typed() {
        let (mock, svc) = service();
        mock.reply_rows("MATCH p =", vec![two_hop_row()]);
        let options = PathOptions {
            max_depth: Some(4),
            relationship_types: vec!["KNOWS".into(), "WORKS_WITH".into()],
            limit: None,
        };

        let paths = svc
            .find_all_paths(&person("Alice"), &person("Charlie"), &options)
            .await
            .unwrap();

        assert_eq!(paths.len(), 1);
        let stmt = mock.last().unwrap();
        assert!(stmt.text.contains("-[:`KNOWS`|`WORKS_WITH`*1..4]->"));
        assert!(stmt.text.contains("single(y IN nodes(p)"));
        assert_eq!(stmt.params["limit"], DEFAULT_PATH_LIMIT);
    }

    #[tokio::test]
    async fn test_bounded_paths_use_default_depth() {
        let (mock, svc) = service();
        svc.find_paths(&person("Alice"), &person("Bob"), &PathOptions::default())
            .await
            .unwrap();
        let stmt = mock.last().unwrap();
        assert!(stmt.text.contains("-[*1..3]->"));
        assert!(!stmt.text.contains("single("));
    }

    #[tokio::test]
    async fn test_path_arguments_are_validated() {
        let (mock, svc) = service();
        let zero = PathOptions {
            max_depth: Some(0),
            ..Default::default()
        };
        let err = svc
            .find_paths(&person("Alice"), &person("Bob"), &zero)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);

        let err = svc
            .find_all_paths(&NodeRef::default(), &person("Bob"), &PathOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        assert!(mock.executed().is_empty());
    }
}
