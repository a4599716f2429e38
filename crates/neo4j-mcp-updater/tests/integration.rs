//! Integration tests for neo4j-mcp-updater against a live Neo4j instance.
//!
//! Run with: cargo test --package neo4j-mcp-updater --test integration -- --ignored
//!
//! Skipped automatically if Neo4j is not available.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use neo4j_mcp_core::{AppConfig, ConfigOverrides};
use neo4j_mcp_graph::{GraphClient, GraphConfig, GraphService};
use neo4j_mcp_updater::{
    ChangeLogSpec, ComponentSpec, FileSpec, FunctionCall, FunctionSpec, Manifest, ProjectGraph,
};
use serde_json::{json, Map};

async fn connect_or_skip() -> Option<(GraphService, ProjectGraph)> {
    let settings = AppConfig::load(&ConfigOverrides::default())
        .map(|c| c.neo4j)
        .unwrap_or_default();
    let client = GraphClient::open(&GraphConfig::from(&settings)).ok()?;
    match client.verify_connectivity().await {
        Ok(()) => {
            let runner = Arc::new(client);
            Some((GraphService::new(runner.clone()), ProjectGraph::new(runner)))
        }
        Err(e) => {
            eprintln!("Skipping integration test (Neo4j not available): {e}");
            None
        }
    }
}

fn unique_project(base: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{base}-{nanos}")
}

async fn cleanup(svc: &GraphService, project: &str) {
    let params = json!({"project": project}).as_object().cloned().unwrap_or_default();
    let _ = svc
        .execute_write(
            "MATCH (n:ProjectNode {project: $project}) DETACH DELETE n",
            params.clone(),
        )
        .await;
    let _ = svc
        .execute_write("MATCH (p:Project {name: $project}) DETACH DELETE p", params)
        .await;
}

async fn count(svc: &GraphService, query: &str, project: &str) -> i64 {
    let mut params = Map::new();
    params.insert("project".into(), json!(project));
    let rows = svc.execute_read(query, params).await.unwrap();
    rows[0]["count"].as_i64().unwrap()
}

#[tokio::test]
#[ignore = "requires live Neo4j - run with: cargo test --package neo4j-mcp-updater --test integration -- --ignored"]
async fn test_initialize_project_is_idempotent() {
    let Some((svc, graph)) = connect_or_skip().await else {
        return;
    };
    let project = unique_project("p1");

    let first = graph.initialize_project(&project, Some("desc")).await.unwrap();
    let second = graph.initialize_project(&project, Some("desc")).await.unwrap();
    assert!(first.created);
    assert!(!second.created);
    assert_eq!(
        count(&svc, "MATCH (p:Project {name: $project}) RETURN count(p) AS count", &project).await,
        1
    );

    cleanup(&svc, &project).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j - run with: cargo test --package neo4j-mcp-updater --test integration -- --ignored"]
async fn test_change_log_with_missing_component() {
    let Some((svc, graph)) = connect_or_skip().await else {
        return;
    };
    let project = unique_project("changelog");
    graph.initialize_project(&project, None).await.unwrap();
    graph
        .create_component(
            &project,
            &ComponentSpec {
                name: "ChainService".into(),
                description: None,
            },
        )
        .await
        .unwrap();

    let report = graph
        .add_change_log(
            &project,
            &ChangeLogSpec {
                description: "Touches a component that was never recorded".into(),
                components: vec!["ChainService".into(), "Ghost".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(report.linked.components, vec!["ChainService"]);
    assert_eq!(report.skipped.components, vec!["Ghost"]);
    assert_eq!(
        count(
            &svc,
            "MATCH (cl:ChangeLog:ProjectNode {project: $project})-[r:AFFECTS]->() RETURN count(r) AS count",
            &project
        )
        .await,
        1
    );

    cleanup(&svc, &project).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j - run with: cargo test --package neo4j-mcp-updater --test integration -- --ignored"]
async fn test_structure_and_summary() {
    let Some((svc, graph)) = connect_or_skip().await else {
        return;
    };
    let project = unique_project("structure");
    graph.initialize_project(&project, Some("demo")).await.unwrap();
    graph
        .create_component(
            &project,
            &ComponentSpec {
                name: "Core".into(),
                description: None,
            },
        )
        .await
        .unwrap();
    let file = graph
        .create_file(
            &project,
            &FileSpec {
                path: "src/lib.rs".into(),
                component: Some("Core".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(file.attached);

    for name in ["caller", "callee"] {
        graph
            .add_function(
                &project,
                &FunctionSpec {
                    name: name.into(),
                    file: "src/lib.rs".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
    let call = graph
        .add_function_call(
            &project,
            &FunctionCall {
                caller: "caller".into(),
                callee: "callee".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(call.linked, 1);

    let summary = graph.project_summary(&project).await.unwrap();
    assert_eq!(summary.nodes["Function"], 2);
    assert_eq!(summary.relationships["CALLS"], 1);
    assert_eq!(summary.relationships["CONTAINS"], 4);

    cleanup(&svc, &project).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j - run with: cargo test --package neo4j-mcp-updater --test integration -- --ignored"]
async fn test_manifest_import_links_change_logs() {
    let Some((svc, graph)) = connect_or_skip().await else {
        return;
    };
    let project = unique_project("manifest");

    let manifest = Manifest::from_json(&format!(
        r#"{{
            "project": "{project}",
            "components": [{{"name": "Core"}}],
            "files": [{{"path": "src/main.rs", "component": "Core"}}],
            "change_logs": [{{"description": "Import", "files": ["src/main.rs"]}}]
        }}"#
    ))
    .unwrap();
    let report = graph.apply_manifest(&manifest).await.unwrap();
    assert_eq!(report.change_logs[0].linked.files, vec!["src/main.rs"]);
    assert!(report.unattached.is_empty());

    cleanup(&svc, &project).await;
}
