//! Tool handlers: typed arguments in, graph service call, JSON out.

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use neo4j_mcp_core::NodeRef;
use neo4j_mcp_graph::admin::{ConstraintKind, IndexKind};
use neo4j_mcp_graph::explore::{PathOptions, DEFAULT_FIND_LIMIT};
use neo4j_mcp_graph::GraphService;

use crate::dispatch::ToolError;

type HandlerResult<'a> = BoxFuture<'a, Result<Value, ToolError>>;

const DEFAULT_SAMPLE_LIMIT: i64 = 5;

fn parse<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::invalid(format!("Invalid arguments: {e}")))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(value)?)
}

fn default_find_limit() -> i64 {
    DEFAULT_FIND_LIMIT
}

fn default_sample_limit() -> i64 {
    DEFAULT_SAMPLE_LIMIT
}

// ── Argument Types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SchemaArgs {
    #[serde(default)]
    detailed: bool,
}

#[derive(Debug, Deserialize)]
struct CypherArgs {
    query: String,
    #[serde(default)]
    params: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SampleArgs {
    #[serde(default = "default_sample_limit")]
    limit_per_label: i64,
    #[serde(default)]
    labels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CreateIndexArgs {
    label: String,
    properties: Vec<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateConstraintArgs {
    label: String,
    properties: Vec<String>,
    kind: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NameArgs {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FindNodesArgs {
    label: String,
    #[serde(default)]
    property_filters: Map<String, Value>,
    #[serde(default = "default_find_limit")]
    limit: i64,
}

#[derive(Debug, Deserialize)]
struct FindRelationshipsArgs {
    #[serde(rename = "type")]
    rel_type: String,
    #[serde(default)]
    property_filters: Map<String, Value>,
    #[serde(default = "default_find_limit")]
    limit: i64,
    #[serde(default)]
    source_label: Option<String>,
    #[serde(default)]
    target_label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PathArgs {
    start_ref: NodeRef,
    end_ref: NodeRef,
    #[serde(default)]
    max_depth: Option<i64>,
    #[serde(default)]
    relationship_types: Vec<String>,
    #[serde(default)]
    limit: Option<i64>,
}

impl PathArgs {
    fn options(&self) -> PathOptions {
        PathOptions {
            max_depth: self.max_depth,
            relationship_types: self.relationship_types.clone(),
            limit: self.limit,
        }
    }
}

// ── Schema & Introspection ───────────────────────────────────────

pub fn get_schema(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: SchemaArgs = parse(args)?;
        to_json(&svc.get_schema(args.detailed).await?)
    })
}

pub fn get_database_info(svc: &GraphService, _args: Value) -> HandlerResult<'_> {
    Box::pin(async move { to_json(&svc.get_database_info().await?) })
}

pub fn get_database_statistics(svc: &GraphService, _args: Value) -> HandlerResult<'_> {
    Box::pin(async move { to_json(&svc.get_database_statistics().await?) })
}

pub fn get_node_counts_by_label(svc: &GraphService, _args: Value) -> HandlerResult<'_> {
    Box::pin(async move { to_json(&svc.get_node_counts_by_label().await?) })
}

pub fn get_relationship_counts_by_type(svc: &GraphService, _args: Value) -> HandlerResult<'_> {
    Box::pin(async move { to_json(&svc.get_relationship_counts_by_type().await?) })
}

pub fn get_indexes(svc: &GraphService, _args: Value) -> HandlerResult<'_> {
    Box::pin(async move { to_json(&svc.get_indexes().await?) })
}

pub fn get_constraints(svc: &GraphService, _args: Value) -> HandlerResult<'_> {
    Box::pin(async move { to_json(&svc.get_constraints().await?) })
}

pub fn get_sample_data(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: SampleArgs = parse(args)?;
        to_json(&svc.get_sample_data(args.limit_per_label, args.labels).await?)
    })
}

// ── Cypher ───────────────────────────────────────────────────────

pub fn read_cypher(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: CypherArgs = parse(args)?;
        to_json(&svc.execute_read(&args.query, args.params).await?)
    })
}

pub fn write_cypher(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: CypherArgs = parse(args)?;
        to_json(&svc.execute_write(&args.query, args.params).await?)
    })
}

pub fn explain_cypher(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: CypherArgs = parse(args)?;
        to_json(&svc.explain(&args.query).await?)
    })
}

// ── Administration ───────────────────────────────────────────────

pub fn create_index(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: CreateIndexArgs = parse(args)?;
        let kind = match args.kind.as_deref() {
            Some(k) => k.parse::<IndexKind>()?,
            None => IndexKind::default(),
        };
        let status = svc
            .create_index(&args.label, &args.properties, kind, args.name.as_deref())
            .await?;
        to_json(&status)
    })
}

pub fn drop_index(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: NameArgs = parse(args)?;
        to_json(&svc.drop_index(&args.name).await?)
    })
}

pub fn create_constraint(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: CreateConstraintArgs = parse(args)?;
        let kind: ConstraintKind = args.kind.parse()?;
        let status = svc
            .create_constraint(&args.label, &args.properties, kind, args.name.as_deref())
            .await?;
        to_json(&status)
    })
}

pub fn drop_constraint(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: NameArgs = parse(args)?;
        to_json(&svc.drop_constraint(&args.name).await?)
    })
}

// ── Exploration ──────────────────────────────────────────────────

pub fn find_nodes(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: FindNodesArgs = parse(args)?;
        to_json(
            &svc.find_nodes(&args.label, &args.property_filters, args.limit)
                .await?,
        )
    })
}

pub fn find_relationships(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: FindRelationshipsArgs = parse(args)?;
        let rows = svc
            .find_relationships(
                &args.rel_type,
                &args.property_filters,
                args.limit,
                args.source_label.as_deref(),
                args.target_label.as_deref(),
            )
            .await?;
        to_json(&rows)
    })
}

pub fn find_paths(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: PathArgs = parse(args)?;
        to_json(
            &svc.find_paths(&args.start_ref, &args.end_ref, &args.options())
                .await?,
        )
    })
}

pub fn find_shortest_path(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: PathArgs = parse(args)?;
        to_json(
            &svc.find_shortest_path(&args.start_ref, &args.end_ref, &args.options())
                .await?,
        )
    })
}

pub fn find_all_paths(svc: &GraphService, args: Value) -> HandlerResult<'_> {
    Box::pin(async move {
        let args: PathArgs = parse(args)?;
        to_json(
            &svc.find_all_paths(&args.start_ref, &args.end_ref, &args.options())
                .await?,
        )
    })
}
