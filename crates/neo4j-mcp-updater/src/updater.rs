//! `ProjectGraph`: upserts and reports for project-tagged knowledge graphs.
//!
//! Single operations are one statement each. A missing parent, endpoint or
//! change-log reference never fails the call: the reference is skipped,
//! logged at warn level, and reported back to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use neo4j_mcp_graph::{CypherRunner, Record, Statement};

use crate::error::{require_name, Result, UpdaterError};
use crate::model::{
    ChangeLogReport, ChangeLogSpec, ComponentLink, ComponentSpec, DocumentationSpec, FileSpec,
    FunctionCall, FunctionSpec, LinkReport, Manifest, ManifestReport, ModuleSpec, NodeKey,
    NodeReport, ProjectReport, ProjectSummary, ReferenceSet,
};
use crate::statements::{self, Upsert};

/// Writes project structure into the graph through any [`CypherRunner`].
#[derive(Clone)]
pub struct ProjectGraph {
    runner: Arc<dyn CypherRunner>,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn new_change_log_id() -> String {
    format!("CL-{}", Uuid::new_v4())
}

fn strings(record: &Record, key: &str) -> Vec<String> {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn text(record: &Record, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Requested keys absent from `linked`, first occurrence only.
fn missing(requested: &[String], linked: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for key in requested {
        if !linked.contains(key) && !out.contains(key) {
            out.push(key.clone());
        }
    }
    out
}

impl ProjectGraph {
    pub fn new(runner: Arc<dyn CypherRunner>) -> Self {
        Self { runner }
    }

    // ── Project ──────────────────────────────────────────────────

    /// Create the project root if absent. Idempotent.
    pub async fn initialize_project(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<ProjectReport> {
        let statement = statements::project(name, description, &now())?;
        let summary = self.runner.apply(statement).await?;
        let created = summary
            .rows
            .first()
            .and_then(|r| r.get("created"))
            .and_then(Value::as_bool)
            .unwrap_or(summary.nodes_created > 0);
        tracing::info!(project = name, created, "Project initialized");
        Ok(ProjectReport {
            name: name.to_string(),
            created,
        })
    }

    // ── Structure ────────────────────────────────────────────────

    pub async fn create_component(&self, project: &str, spec: &ComponentSpec) -> Result<NodeReport> {
        self.upsert(statements::component(project, spec, &now())?).await
    }

    pub async fn create_module(&self, project: &str, spec: &ModuleSpec) -> Result<NodeReport> {
        self.upsert(statements::module(project, spec, &now())?).await
    }

    pub async fn create_file(&self, project: &str, spec: &FileSpec) -> Result<NodeReport> {
        self.upsert(statements::file(project, spec, &now())?).await
    }

    pub async fn add_function(&self, project: &str, spec: &FunctionSpec) -> Result<NodeReport> {
        self.upsert(statements::function(project, spec, &now())?).await
    }

    pub async fn add_documentation(
        &self,
        project: &str,
        spec: &DocumentationSpec,
    ) -> Result<NodeReport> {
        self.upsert(statements::documentation(project, spec, &now())?)
            .await
    }

    async fn upsert(&self, upsert: Upsert) -> Result<NodeReport> {
        let summary = self.runner.apply(upsert.statement).await?;
        let attached = summary
            .rows
            .iter()
            .any(|r| r.get("attached").and_then(Value::as_bool).unwrap_or(false));
        let parent = upsert.anchor.describe();
        if attached {
            tracing::debug!(label = upsert.label, key = %upsert.key, parent = %parent, "Upserted");
        } else {
            tracing::warn!(
                label = upsert.label,
                key = %upsert.key,
                parent = %parent,
                "Parent not found; node left unattached"
            );
        }
        Ok(NodeReport {
            label: upsert.label.to_string(),
            key: upsert.key,
            parent,
            attached,
        })
    }

    // ── Edges ────────────────────────────────────────────────────

    pub async fn link_components(&self, project: &str, link: &ComponentLink) -> Result<LinkReport> {
        let statement = statements::link_components(project, link)?;
        self.link("INTERACTS_WITH", &link.from, &link.to, statement)
            .await
    }

    pub async fn add_function_call(&self, project: &str, call: &FunctionCall) -> Result<LinkReport> {
        let statement = statements::function_call(project, call)?;
        self.link("CALLS", &call.caller, &call.callee, statement)
            .await
    }

    async fn link(
        &self,
        rel_type: &str,
        from: &str,
        to: &str,
        statement: Statement,
    ) -> Result<LinkReport> {
        let summary = self.runner.apply(statement).await?;
        let linked = summary
            .rows
            .first()
            .and_then(|r| r.get("linked"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        if linked == 0 {
            tracing::warn!(rel_type, from, to, "Endpoint not found; edge skipped");
        }
        Ok(LinkReport {
            rel_type: rel_type.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            linked,
        })
    }

    // ── Change Logs ──────────────────────────────────────────────

    /// Record a change and link it to every referenced node that exists.
    pub async fn add_change_log(
        &self,
        project: &str,
        spec: &ChangeLogSpec,
    ) -> Result<ChangeLogReport> {
        let id = spec.id.clone().unwrap_or_else(new_change_log_id);
        let statement = statements::change_log(project, &id, spec, &now())?;
        let summary = self.runner.apply(statement).await?;
        let report = change_log_report(&id, spec, summary.rows.first());
        tracing::info!(project, id = %report.id, linked = report.linked.len(), "Change log recorded");
        Ok(report)
    }

    // ── Reports ──────────────────────────────────────────────────

    /// Node counts per label and edge counts per type for one project.
    pub async fn project_summary(&self, project: &str) -> Result<ProjectSummary> {
        require_name(project, "project name")?;
        let rows = self.runner.fetch(statements::project_node(project)).await?;
        let root = rows
            .first()
            .ok_or_else(|| UpdaterError::UnknownProject(project.to_string()))?;

        let mut nodes = BTreeMap::new();
        for row in self.runner.fetch(statements::label_counts(project)).await? {
            if let (Some(label), Some(count)) = (text(&row, "label"), row.get("count").and_then(Value::as_i64)) {
                nodes.insert(label, count);
            }
        }
        let mut relationships = BTreeMap::new();
        for row in self
            .runner
            .fetch(statements::relationship_counts(project))
            .await?
        {
            if let (Some(rel), Some(count)) = (text(&row, "type"), row.get("count").and_then(Value::as_i64)) {
                relationships.insert(rel, count);
            }
        }

        Ok(ProjectSummary {
            name: text(root, "name").unwrap_or_else(|| project.to_string()),
            description: text(root, "description"),
            created_at: text(root, "created_at"),
            nodes,
            relationships,
        })
    }

    // ── Bulk Import ──────────────────────────────────────────────

    /// Apply a whole manifest in one transaction, then report what could
    /// not be linked. A failing statement rolls the manifest back.
    pub async fn apply_manifest(&self, manifest: &Manifest) -> Result<ManifestReport> {
        let project = manifest.project.as_str();
        let now = now();

        let mut batch = vec![statements::project(
            project,
            manifest.description.as_deref(),
            &now,
        )?];
        for spec in &manifest.components {
            batch.push(statements::component(project, spec, &now)?.statement);
        }
        for spec in &manifest.modules {
            batch.push(statements::module(project, spec, &now)?.statement);
        }
        for spec in &manifest.files {
            batch.push(statements::file(project, spec, &now)?.statement);
        }
        for spec in &manifest.functions {
            batch.push(statements::function(project, spec, &now)?.statement);
        }
        for spec in &manifest.documentation {
            batch.push(statements::documentation(project, spec, &now)?.statement);
        }
        for link in &manifest.links {
            batch.push(statements::link_components(project, link)?);
        }
        for call in &manifest.calls {
            batch.push(statements::function_call(project, call)?);
        }
        let mut change_logs = Vec::with_capacity(manifest.change_logs.len());
        for spec in &manifest.change_logs {
            let id = spec.id.clone().unwrap_or_else(new_change_log_id);
            batch.push(statements::change_log(project, &id, spec, &now)?);
            change_logs.push((id, spec));
        }

        let count = batch.len();
        tracing::info!(project, statements = count, "Applying manifest");
        self.runner.apply_all(batch).await?;

        let mut reports = Vec::with_capacity(change_logs.len());
        for (id, spec) in change_logs {
            let rows = self
                .runner
                .fetch(statements::change_log_links(project, &id))
                .await?;
            reports.push(change_log_report(&id, spec, rows.first()));
        }

        let unattached: Vec<NodeKey> = self
            .runner
            .fetch(statements::unattached(project))
            .await?
            .iter()
            .filter_map(|row| {
                Some(NodeKey {
                    label: text(row, "label")?,
                    key: text(row, "key")?,
                })
            })
            .collect();
        for node in &unattached {
            tracing::warn!(project, label = %node.label, key = %node.key, "Node left unattached");
        }

        Ok(ManifestReport {
            project: project.to_string(),
            statements: count,
            change_logs: reports,
            unattached,
        })
    }
}

/// Split the requested references into linked and skipped, warning on each skip.
fn change_log_report(id: &str, spec: &ChangeLogSpec, row: Option<&Record>) -> ChangeLogReport {
    let linked = match row {
        Some(r) => ReferenceSet {
            components: strings(r, "components"),
            files: strings(r, "files"),
            functions: strings(r, "functions"),
        },
        None => ReferenceSet::default(),
    };
    let skipped = ReferenceSet {
        components: missing(&spec.components, &linked.components),
        files: missing(&spec.files, &linked.files),
        functions: missing(&spec.functions, &linked.functions),
    };

    for (kind, keys) in [
        ("component", &skipped.components),
        ("file", &skipped.files),
        ("function", &skipped.functions),
    ] {
        for key in keys {
            tracing::warn!(change_log = id, kind, reference = %key, "Reference not found; link skipped");
        }
    }

    ChangeLogReport {
        id: id.to_string(),
        linked,
        skipped,
    }
}
