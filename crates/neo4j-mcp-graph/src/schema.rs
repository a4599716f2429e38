//! Schema and statistics introspection.

use std::collections::{BTreeMap, BTreeSet};

use neo4j_mcp_core::{
    ConstraintDescriptor, DatabaseInfo, DatabaseStatistics, IndexDescriptor, PropertyInfo,
    SampleNode, SchemaDescription, SchemaTriple,
};

use crate::cypher::quote_identifier;
use crate::error::{GraphError, Result};
use crate::runner::Statement;
use crate::service::{
    get_i64, get_map, get_opt_str, get_str, get_strings, require_positive, GraphService,
};

/// Nodes or edges sampled per label/type when the engine can't describe them.
const SCHEMA_SAMPLE_SIZE: i64 = 100;

impl GraphService {
    // ── Schema ───────────────────────────────────────────────────

    /// All labels, in name order.
    pub async fn labels(&self) -> Result<Vec<String>> {
        let rows = self
            .runner()
            .fetch(Statement::new(
                "CALL db.labels() YIELD label RETURN label ORDER BY label",
            ))
            .await?;
        Ok(rows.iter().map(|r| get_str(r, "label")).collect())
    }

    /// All relationship types, in name order.
    pub async fn relationship_types(&self) -> Result<Vec<String>> {
        let rows = self
            .runner()
            .fetch(Statement::new(
                "CALL db.relationshipTypes() YIELD relationshipType
                 RETURN relationshipType ORDER BY relationshipType",
            ))
            .await?;
        Ok(rows.iter().map(|r| get_str(r, "relationshipType")).collect())
    }

    /// Describe the graph's schema; `detailed` adds properties and triples.
    pub async fn get_schema(&self, detailed: bool) -> Result<SchemaDescription> {
        let labels = self.labels().await?;
        let relationship_types = self.relationship_types().await?;

        if !detailed {
            return Ok(SchemaDescription {
                labels,
                relationship_types,
                properties: None,
                triples: None,
            });
        }

        let properties = self.label_properties(&labels).await?;
        let triples = self.schema_triples(&relationship_types).await?;

        Ok(SchemaDescription {
            labels,
            relationship_types,
            properties: Some(properties),
            triples: Some(triples),
        })
    }

    async fn label_properties(
        &self,
        labels: &[String],
    ) -> Result<BTreeMap<String, Vec<PropertyInfo>>> {
        let described = self
            .runner()
            .fetch(Statement::new(
                "CALL db.schema.nodeTypeProperties()
                 YIELD nodeLabels, propertyName, propertyTypes
                 RETURN nodeLabels, propertyName, propertyTypes",
            ))
            .await;

        let mut by_label: BTreeMap<String, Vec<PropertyInfo>> =
            labels.iter().map(|l| (l.clone(), Vec::new())).collect();

        match described {
            Ok(rows) => {
                for row in &rows {
                    let Some(name) = get_opt_str(row, "propertyName") else {
                        continue;
                    };
                    let types = get_strings(row, "propertyTypes");
                    for label in get_strings(row, "nodeLabels") {
                        let entry = by_label.entry(label).or_default();
                        if !entry.iter().any(|p| p.name == name) {
                            entry.push(PropertyInfo {
                                name: name.clone(),
                                types: types.clone(),
                            });
                        }
                    }
                }
                for props in by_label.values_mut() {
                    props.sort_by(|a, b| a.name.cmp(&b.name));
                }
            }
            Err(GraphError::Connection(msg)) => return Err(GraphError::Connection(msg)),
            Err(e) => {
                tracing::info!(error = %e, "Schema procedure unavailable, sampling property keys");
                for label in labels {
                    let cypher = format!(
                        "MATCH (n:{}) WITH n LIMIT $sample
                         UNWIND keys(n) AS key
                         RETURN DISTINCT key ORDER BY key",
                        quote_identifier(label)?
                    );
                    let rows = self
                        .runner()
                        .fetch(Statement::new(cypher).param("sample", SCHEMA_SAMPLE_SIZE))
                        .await?;
                    by_label.insert(
                        label.clone(),
                        rows.iter()
                            .map(|r| PropertyInfo {
                                name: get_str(r, "key"),
                                types: vec!["unknown".to_string()],
                            })
                            .collect(),
                    );
                }
            }
        }
        Ok(by_label)
    }

    async fn schema_triples(&self, relationship_types: &[String]) -> Result<Vec<SchemaTriple>> {
        let mut triples = BTreeSet::new();
        for rel_type in relationship_types {
            let cypher = format!(
                "MATCH (a)-[r:{}]->(b) WITH a, b LIMIT $sample
                 UNWIND labels(a) AS source
                 UNWIND labels(b) AS target
                 RETURN DISTINCT source, target",
                quote_identifier(rel_type)?
            );
            let rows = self
                .runner()
                .fetch(Statement::new(cypher).param("sample", SCHEMA_SAMPLE_SIZE))
                .await?;
            for row in &rows {
                triples.insert(SchemaTriple {
                    source: get_str(row, "source"),
                    rel_type: rel_type.clone(),
                    target: get_str(row, "target"),
                });
            }
        }
        Ok(triples.into_iter().collect())
    }

    // ── Database ─────────────────────────────────────────────────

    pub async fn get_database_info(&self) -> Result<DatabaseInfo> {
        let rows = self
            .runner()
            .fetch(Statement::new(
                "CALL dbms.components() YIELD name, versions, edition
                 RETURN name, versions[0] AS version, edition",
            ))
            .await?;
        let row = rows.first().cloned().unwrap_or_default();

        Ok(DatabaseInfo {
            name: get_str(&row, "name"),
            version: get_str(&row, "version"),
            edition: get_str(&row, "edition"),
            address: self.address().to_string(),
            database: self.database().map(str::to_string),
        })
    }

    pub async fn get_node_counts_by_label(&self) -> Result<BTreeMap<String, i64>> {
        let mut counts = BTreeMap::new();
        for label in self.labels().await? {
            let cypher = format!("MATCH (n:{}) RETURN count(n) AS count", quote_identifier(&label)?);
            counts.insert(label, self.count(cypher).await?);
        }
        Ok(counts)
    }

    pub async fn get_relationship_counts_by_type(&self) -> Result<BTreeMap<String, i64>> {
        let mut counts = BTreeMap::new();
        for rel_type in self.relationship_types().await? {
            let cypher = format!(
                "MATCH ()-[r:{}]->() RETURN count(r) AS count",
                quote_identifier(&rel_type)?
            );
            counts.insert(rel_type, self.count(cypher).await?);
        }
        Ok(counts)
    }

    pub async fn get_database_statistics(&self) -> Result<DatabaseStatistics> {
        let node_count = self.count("MATCH (n) RETURN count(n) AS count".to_string()).await?;
        let relationship_count = self
            .count("MATCH ()-[r]->() RETURN count(r) AS count".to_string())
            .await?;

        Ok(DatabaseStatistics {
            node_count,
            relationship_count,
            label_counts: self.get_node_counts_by_label().await?,
            relationship_type_counts: self.get_relationship_counts_by_type().await?,
        })
    }

    async fn count(&self, cypher: String) -> Result<i64> {
        let rows = self.runner().fetch(Statement::new(cypher)).await?;
        Ok(rows.first().map(|r| get_i64(r, "count")).unwrap_or(0))
    }

    // ── Indexes & Constraints ────────────────────────────────────

    pub async fn get_indexes(&self) -> Result<Vec<IndexDescriptor>> {
        let rows = self
            .runner()
            .fetch(Statement::new(
                "SHOW INDEXES YIELD name, type, entityType, labelsOrTypes, properties, state
                 RETURN name, type, entityType, labelsOrTypes, properties, state
                 ORDER BY name",
            ))
            .await?;

        Ok(rows
            .iter()
            .map(|r| IndexDescriptor {
                name: get_str(r, "name"),
                kind: get_str(r, "type"),
                entity_type: get_str(r, "entityType"),
                targets: get_strings(r, "labelsOrTypes"),
                properties: get_strings(r, "properties"),
                state: get_opt_str(r, "state"),
            })
            .collect())
    }

    pub async fn get_constraints(&self) -> Result<Vec<ConstraintDescriptor>> {
        let rows = self
            .runner()
            .fetch(Statement::new(
                "SHOW CONSTRAINTS YIELD name, type, entityType, labelsOrTypes, properties
                 RETURN name, type, entityType, labelsOrTypes, properties
                 ORDER BY name",
            ))
            .await?;

        Ok(rows
            .iter()
            .map(|r| ConstraintDescriptor {
                name: get_str(r, "name"),
                kind: constraint_kind(&get_str(r, "type")),
                entity_type: get_str(r, "entityType"),
                targets: get_strings(r, "labelsOrTypes"),
                properties: get_strings(r, "properties"),
            })
            .collect())
    }

    // ── Samples ──────────────────────────────────────────────────

    /// Up to `limit_per_label` nodes for each label (or each of `labels`).
    pub async fn get_sample_data(
        &self,
        limit_per_label: i64,
        labels: Option<Vec<String>>,
    ) -> Result<BTreeMap<String, Vec<SampleNode>>> {
        require_positive(limit_per_label, "limit_per_label")?;
        let labels = match labels {
            Some(l) if !l.is_empty() => l,
            _ => self.labels().await?,
        };

        let mut samples = BTreeMap::new();
        for label in labels {
            let cypher = format!(
                "MATCH (n:{}) RETURN elementId(n) AS id, labels(n) AS labels,
                 properties(n) AS properties LIMIT $limit",
                quote_identifier(&label)?
            );
            let rows = self
                .runner()
                .fetch(Statement::new(cypher).param("limit", limit_per_label))
                .await?;
            let nodes = rows
                .iter()
                .map(|r| SampleNode {
                    id: get_str(r, "id"),
                    labels: get_strings(r, "labels"),
                    properties: get_map(r, "properties"),
                })
                .collect();
            samples.insert(label, nodes);
        }
        Ok(samples)
    }
}

/// Normalize `SHOW CONSTRAINTS` type names to the kinds accepted on creation.
fn constraint_kind(raw: &str) -> String {
    match raw {
        "UNIQUENESS" | "NODE_PROPERTY_UNIQUENESS" | "RELATIONSHIP_UNIQUENESS"
        | "RELATIONSHIP_PROPERTY_UNIQUENESS" => "UNIQUE".to_string(),
        "NODE_PROPERTY_EXISTENCE" | "RELATIONSHIP_PROPERTY_EXISTENCE" => "EXISTS".to_string(),
        "NODE_KEY" => "NODE_KEY".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::mock::MockRunner;

    fn service() -> (Arc<MockRunner>, GraphService) {
        let mock = Arc::new(MockRunner::new());
        (mock.clone(), GraphService::new(mock))
    }

    fn script_labels(mock: &MockRunner) {
        mock.reply_rows(
            "db.labels",
            vec![json!({"label": "Person"}), json!({"label": "City"})],
        )
        .reply_rows(
            "db.relationshipTypes",
            vec![json!({"relationshipType": "KNOWS"})],
        );
    }

    #[tokio::test]
    async fn test_plain_schema_omits_details() {
        let (mock, svc) = service();
        script_labels(&mock);

        let schema = svc.get_schema(false).await.unwrap();
        assert_eq!(schema.labels, vec!["Person", "City"]);
        assert_eq!(schema.relationship_types, vec!["KNOWS"]);
        assert!(schema.properties.is_none());
        assert!(schema.triples.is_none());
        assert_eq!(mock.executed().len(), 2);
    }

    #[tokio::test]
    async fn test_detailed_schema() {
        let (mock, svc) = service();
        script_labels(&mock);
        mock.reply_rows(
            "nodeTypeProperties",
            vec![
                json!({"nodeLabels": ["Person"], "propertyName": "name", "propertyTypes": ["String"]}),
                json!({"nodeLabels": ["Person"], "propertyName": "age", "propertyTypes": ["Long"]}),
                json!({"nodeLabels": ["City"], "propertyName": null, "propertyTypes": null}),
            ],
        )
        .reply_rows(
            "[r:`KNOWS`]",
            vec![json!({"source": "Person", "target": "Person"})],
        );

        let schema = svc.get_schema(true).await.unwrap();
        let props = schema.properties.unwrap();
        let person: Vec<&str> = props["Person"].iter().map(|p| p.name.as_str()).collect();
        assert_eq!(person, vec!["age", "name"]);
        assert!(props["City"].is_empty());

        let triples = schema.triples.unwrap();
        assert_eq!(
            triples,
            vec![SchemaTriple {
                source: "Person".into(),
                rel_type: "KNOWS".into(),
                target: "Person".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_property_fallback_when_procedure_missing() {
        let (mock, svc) = service();
        script_labels(&mock);
        mock.reply_error(
            "nodeTypeProperties",
            GraphError::classify("Neo.ClientError.Procedure.ProcedureNotFound: no such procedure"),
        )
        .reply_rows("UNWIND keys(n)", vec![json!({"key": "name"})]);

        let schema = svc.get_schema(true).await.unwrap();
        let props = schema.properties.unwrap();
        assert_eq!(props["Person"][0].name, "name");
        assert_eq!(props["Person"][0].types, vec!["unknown"]);
    }

    #[tokio::test]
    async fn test_statistics() {
        let (mock, svc) = service();
        script_labels(&mock);
        mock.reply_rows("MATCH (n:`Person`)", vec![json!({"count": 3})])
            .reply_rows("MATCH (n:`City`)", vec![json!({"count": 1})])
            .reply_rows("[r:`KNOWS`]", vec![json!({"count": 2})])
            .reply_rows("MATCH (n) RETURN", vec![json!({"count": 4})])
            .reply_rows("MATCH ()-[r]->()", vec![json!({"count": 2})]);

        let stats = svc.get_database_statistics().await.unwrap();
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.relationship_count, 2);
        assert_eq!(stats.label_counts["Person"], 3);
        assert_eq!(stats.label_counts["City"], 1);
        assert_eq!(stats.relationship_type_counts["KNOWS"], 2);
    }

    #[tokio::test]
    async fn test_database_info_reports_address() {
        let mock = Arc::new(MockRunner::new().with_database("projects"));
        mock.reply_rows(
            "dbms.components",
            vec![json!({"name": "Neo4j Kernel", "version": "5.20.0", "edition": "community"})],
        );
        let svc = GraphService::new(mock);

        let info = svc.get_database_info().await.unwrap();
        assert_eq!(info.version, "5.20.0");
        assert_eq!(info.edition, "community");
        assert_eq!(info.address, "bolt://mock:7687");
        assert_eq!(info.database.as_deref(), Some("projects"));
    }

    #[tokio::test]
    async fn test_indexes_and_constraints() {
        let (mock, svc) = service();
        mock.reply_rows(
            "SHOW INDEXES",
            vec![
                json!({"name": "idx_person_name", "type": "RANGE", "entityType": "NODE",
                       "labelsOrTypes": ["Person"], "properties": ["name"], "state": "ONLINE"}),
                json!({"name": "index_lookup", "type": "LOOKUP", "entityType": "NODE",
                       "labelsOrTypes": null, "properties": null, "state": "ONLINE"}),
            ],
        )
        .reply_rows(
            "SHOW CONSTRAINTS",
            vec![json!({"name": "unique_person_email", "type": "UNIQUENESS", "entityType": "NODE",
                        "labelsOrTypes": ["Person"], "properties": ["email"]})],
        );

        let indexes = svc.get_indexes().await.unwrap();
        assert_eq!(indexes[0].targets, vec!["Person"]);
        assert!(indexes[1].properties.is_empty());

        let constraints = svc.get_constraints().await.unwrap();
        assert_eq!(constraints[0].kind, "UNIQUE");
        assert_eq!(constraints[0].properties, vec!["email"]);
    }

    #[tokio::test]
    async fn test_sample_data_limits_each_label() {
        let (mock, svc) = service();
        mock.reply_rows(
            "MATCH (n:`Person`)",
            vec![json!({"id": "4:a:0", "labels": ["Person"], "properties": {"name": "Alice"}})],
        );

        let samples = svc
            .get_sample_data(2, Some(vec!["Person".to_string()]))
            .await
            .unwrap();
        assert_eq!(samples["Person"][0].properties["name"], "Alice");
        assert_eq!(mock.last().unwrap().params["limit"], 2);

        let err = svc.get_sample_data(0, None).await.unwrap_err();
        assert_eq!(err.kind(), neo4j_mcp_core::ErrorKind::InvalidArguments);
    }
}
