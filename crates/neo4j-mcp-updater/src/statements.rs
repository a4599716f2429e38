//! Cypher builders for the tagging layer.
//!
//! Every domain node is merged on `(label, project, key)` and carries the
//! `ProjectNode` label. Labels and property names come from fixed tables;
//! user values are always bound as parameters.

use serde_json::Value;

use neo4j_mcp_graph::Statement;

use crate::error::{require_name, Result, UpdaterError};
use crate::model::{
    ChangeLogSpec, ComponentLink, ComponentSpec, DocumentationSpec, FileSpec, FunctionCall,
    FunctionSpec, ModuleSpec, TargetKind,
};

pub(crate) const TAG: &str = "ProjectNode";

/// The node an upsert hangs off.
pub(crate) struct Anchor {
    pub label: &'static str,
    pub key_property: &'static str,
    pub key: String,
}

impl Anchor {
    fn project(name: &str) -> Self {
        Self {
            label: "Project",
            key_property: "name",
            key: name.to_string(),
        }
    }

    fn tagged(label: &'static str, key_property: &'static str, key: &str) -> Self {
        Self {
            label,
            key_property,
            key: key.to_string(),
        }
    }

    fn pattern(&self) -> String {
        if self.label == "Project" {
            "(a:Project {name: $anchor})".to_string()
        } else {
            format!(
                "(a:{}:{TAG} {{project: $project, {}: $anchor}})",
                self.label, self.key_property
            )
        }
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.label, self.key)
    }
}

/// `CONTAINS` from the anchor, or `DOCUMENTS` towards it.
#[derive(Clone, Copy)]
enum Edge {
    ContainedBy,
    Documents,
}

/// One upsert of a tagged node plus its edge to the anchor.
pub(crate) struct Upsert {
    pub label: &'static str,
    pub key: String,
    pub anchor: Anchor,
    pub statement: Statement,
}

fn upsert(
    project: &str,
    label: &'static str,
    keys: &[(&'static str, &str)],
    fields: &[(&'static str, Option<&str>)],
    anchor: Anchor,
    edge: Edge,
    now: &str,
) -> Upsert {
    let identity: Vec<String> = keys
        .iter()
        .map(|(prop, _)| format!("{prop}: $k_{prop}"))
        .collect();
    let mut assignments: Vec<String> = fields
        .iter()
        .map(|(prop, _)| format!("n.{prop} = coalesce($f_{prop}, n.{prop})"))
        .collect();
    assignments.push("n.updated_at = $now".to_string());
    let link = match edge {
        Edge::ContainedBy => "MERGE (x)-[:CONTAINS]->(n)",
        Edge::Documents => "MERGE (n)-[:DOCUMENTS]->(x)",
    };

    let text = format!(
        "MERGE (n:{label}:{TAG} {{project: $project, {identity}}})
         ON CREATE SET n.created_at = $now
         SET {assignments}
         WITH n
         OPTIONAL MATCH {anchor}
         FOREACH (x IN CASE WHEN a IS NULL THEN [] ELSE [a] END | {link})
         RETURN a IS NOT NULL AS attached",
        identity = identity.join(", "),
        assignments = assignments.join(", "),
        anchor = anchor.pattern(),
    );

    let mut statement = Statement::new(text)
        .param("project", project)
        .param("anchor", anchor.key.as_str())
        .param("now", now);
    for (prop, value) in keys {
        statement = statement.param(&format!("k_{prop}"), *value);
    }
    for (prop, value) in fields {
        let value = value.map_or(Value::Null, Value::from);
        statement = statement.param(&format!("f_{prop}"), value);
    }

    Upsert {
        label,
        key: keys.first().map(|(_, v)| v.to_string()).unwrap_or_default(),
        anchor,
        statement,
    }
}

// ── Nodes ────────────────────────────────────────────────────────

pub(crate) fn project(name: &str, description: Option<&str>, now: &str) -> Result<Statement> {
    require_name(name, "project name")?;
    Ok(Statement::new(
        "MERGE (p:Project {name: $name})
         ON CREATE SET p.created_at = $now
         SET p.description = coalesce($description, p.description), p.updated_at = $now
         RETURN p.name AS name, p.created_at = $now AS created",
    )
    .param("name", name)
    .param("description", description.map_or(Value::Null, Value::from))
    .param("now", now))
}

pub(crate) fn component(project: &str, spec: &ComponentSpec, now: &str) -> Result<Upsert> {
    require_name(project, "project name")?;
    require_name(&spec.name, "component name")?;
    Ok(upsert(
        project,
        "Component",
        &[("name", spec.name.as_str())],
        &[("description", spec.description.as_deref())],
        Anchor::project(project),
        Edge::ContainedBy,
        now,
    ))
}

pub(crate) fn module(project: &str, spec: &ModuleSpec, now: &str) -> Result<Upsert> {
    require_name(project, "project name")?;
    require_name(&spec.name, "module name")?;
    require_name(&spec.component, "module component")?;
    Ok(upsert(
        project,
        "Module",
        &[("name", spec.name.as_str())],
        &[("description", spec.description.as_deref())],
        Anchor::tagged("Component", "name", &spec.component),
        Edge::ContainedBy,
        now,
    ))
}

pub(crate) fn file(project: &str, spec: &FileSpec, now: &str) -> Result<Upsert> {
    require_name(project, "project name")?;
    require_name(&spec.path, "file path")?;
    let anchor = match (spec.module.as_deref(), spec.component.as_deref()) {
        (Some(m), _) if !m.trim().is_empty() => Anchor::tagged("Module", "name", m),
        (_, Some(c)) if !c.trim().is_empty() => Anchor::tagged("Component", "name", c),
        _ => {
            return Err(UpdaterError::InvalidArguments(format!(
                "file {} needs a module or component",
                spec.path
            )))
        }
    };
    Ok(upsert(
        project,
        "File",
        &[("path", spec.path.as_str())],
        &[
            ("language", spec.language.as_deref()),
            ("description", spec.description.as_deref()),
        ],
        anchor,
        Edge::ContainedBy,
        now,
    ))
}

pub(crate) fn function(project: &str, spec: &FunctionSpec, now: &str) -> Result<Upsert> {
    require_name(project, "project name")?;
    require_name(&spec.name, "function name")?;
    require_name(&spec.file, "function file")?;
    Ok(upsert(
        project,
        "Function",
        &[("name", spec.name.as_str()), ("file", spec.file.as_str())],
        &[
            ("signature", spec.signature.as_deref()),
            ("description", spec.description.as_deref()),
        ],
        Anchor::tagged("File", "path", &spec.file),
        Edge::ContainedBy,
        now,
    ))
}

pub(crate) fn documentation(
    project: &str,
    spec: &DocumentationSpec,
    now: &str,
) -> Result<Upsert> {
    require_name(project, "project name")?;
    require_name(&spec.name, "documentation name")?;
    require_name(&spec.target, "documentation target")?;
    let kind: TargetKind = spec.target_kind;
    Ok(upsert(
        project,
        "Documentation",
        &[("name", spec.name.as_str())],
        &[
            ("content", spec.content.as_deref()),
            ("url", spec.url.as_deref()),
        ],
        Anchor::tagged(kind.label(), kind.key_property(), &spec.target),
        Edge::Documents,
        now,
    ))
}

// ── Edges ────────────────────────────────────────────────────────

pub(crate) fn link_components(project: &str, link: &ComponentLink) -> Result<Statement> {
    require_name(project, "project name")?;
    require_name(&link.from, "source component")?;
    require_name(&link.to, "target component")?;
    if link.from == link.to {
        return Err(UpdaterError::InvalidArguments(format!(
            "component {} cannot interact with itself",
            link.from
        )));
    }
    Ok(Statement::new(format!(
        "MATCH (a:Component:{TAG} {{project: $project, name: $from}})
         MATCH (b:Component:{TAG} {{project: $project, name: $to}})
         MERGE (a)-[r:INTERACTS_WITH]->(b)
         SET r.description = coalesce($description, r.description)
         RETURN count(r) AS linked"
    ))
    .param("project", project)
    .param("from", link.from.as_str())
    .param("to", link.to.as_str())
    .param(
        "description",
        link.description.as_deref().map_or(Value::Null, Value::from),
    ))
}

pub(crate) fn function_call(project: &str, call: &FunctionCall) -> Result<Statement> {
    require_name(project, "project name")?;
    require_name(&call.caller, "caller")?;
    require_name(&call.callee, "callee")?;
    let opt = |v: &Option<String>| v.as_deref().map_or(Value::Null, Value::from);
    Ok(Statement::new(format!(
        "MATCH (a:Function:{TAG} {{project: $project, name: $caller}})
         WHERE $caller_file IS NULL OR a.file = $caller_file
         MATCH (b:Function:{TAG} {{project: $project, name: $callee}})
         WHERE $callee_file IS NULL OR b.file = $callee_file
         MERGE (a)-[r:CALLS]->(b)
         RETURN count(r) AS linked"
    ))
    .param("project", project)
    .param("caller", call.caller.as_str())
    .param("callee", call.callee.as_str())
    .param("caller_file", opt(&call.caller_file))
    .param("callee_file", opt(&call.callee_file)))
}

/// Create a change log and link it to every reference that resolves.
/// Returns one row: `id`, `components`, `files`, `functions` (linked keys).
pub(crate) fn change_log(
    project: &str,
    id: &str,
    spec: &ChangeLogSpec,
    now: &str,
) -> Result<Statement> {
    require_name(project, "project name")?;
    require_name(id, "change log id")?;
    require_name(&spec.description, "change log description")?;
    let opt = |v: &Option<String>| v.as_deref().map_or(Value::Null, Value::from);
    Ok(Statement::new(format!(
        "MERGE (cl:ChangeLog:{TAG} {{project: $project, id: $id}})
         ON CREATE SET cl.created_at = $now
         SET cl.description = $description, cl.timestamp = $now,
             cl.type = $type, cl.author = $author
         WITH cl
         CALL {{
           WITH cl
           UNWIND $components AS key
           MATCH (c:Component:{TAG} {{project: $project, name: key}})
           MERGE (cl)-[:AFFECTS]->(c)
           RETURN collect(DISTINCT c.name) AS components
         }}
         CALL {{
           WITH cl
           UNWIND $files AS key
           MATCH (f:File:{TAG} {{project: $project, path: key}})
           MERGE (cl)-[:MODIFIES]->(f)
           RETURN collect(DISTINCT f.path) AS files
         }}
         CALL {{
           WITH cl
           UNWIND $functions AS key
           MATCH (fn:Function:{TAG} {{project: $project, name: key}})
           MERGE (cl)-[:ADDS]->(fn)
           RETURN collect(DISTINCT fn.name) AS functions
         }}
         RETURN cl.id AS id, components, files, functions"
    ))
    .param("project", project)
    .param("id", id)
    .param("description", spec.description.as_str())
    .param("type", opt(&spec.change_type))
    .param("author", opt(&spec.author))
    .param("components", spec.components.clone())
    .param("files", spec.files.clone())
    .param("functions", spec.functions.clone())
    .param("now", now))
}

/// Keys currently linked from a change log, in the same shape as [`change_log`].
pub(crate) fn change_log_links(project: &str, id: &str) -> Statement {
    Statement::new(format!(
        "MATCH (cl:ChangeLog:{TAG} {{project: $project, id: $id}})
         RETURN cl.id AS id,
                [(cl)-[:AFFECTS]->(c) | c.name] AS components,
                [(cl)-[:MODIFIES]->(f) | f.path] AS files,
                [(cl)-[:ADDS]->(fn) | fn.name] AS functions"
    ))
    .param("project", project)
    .param("id", id)
}

// ── Reads ────────────────────────────────────────────────────────

pub(crate) fn project_node(name: &str) -> Statement {
    Statement::new(
        "MATCH (p:Project {name: $name})
         RETURN p.name AS name, p.description AS description,
                toString(p.created_at) AS created_at",
    )
    .param("name", name)
}

pub(crate) fn label_counts(project: &str) -> Statement {
    Statement::new(format!(
        "MATCH (n:{TAG} {{project: $project}})
         UNWIND labels(n) AS label
         WITH label WHERE label <> '{TAG}'
         RETURN label, count(*) AS count ORDER BY label"
    ))
    .param("project", project)
}

pub(crate) fn relationship_counts(project: &str) -> Statement {
    Statement::new(format!(
        "MATCH ()-[r]->(:{TAG} {{project: $project}})
         RETURN type(r) AS type, count(r) AS count ORDER BY type"
    ))
    .param("project", project)
}

/// Containable nodes without a container, and documentation without a target.
pub(crate) fn unattached(project: &str) -> Statement {
    Statement::new(format!(
        "MATCH (n:{TAG} {{project: $project}})
         WHERE (NOT n:ChangeLog AND NOT n:Documentation
                AND NOT EXISTS {{ MATCH ()-[:CONTAINS]->(n) }})
            OR (n:Documentation AND NOT EXISTS {{ MATCH (n)-[:DOCUMENTS]->() }})
         WITH n, [l IN labels(n) WHERE l <> '{TAG}'][0] AS label
         RETURN label, coalesce(n.path, n.name) AS key
         ORDER BY label, key"
    ))
    .param("project", project)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2026-01-01T00:00:00+00:00";

    #[test]
    fn test_component_upsert_is_tagged() {
        let up = component(
            "p1",
            &ComponentSpec {
                name: "ChainService".into(),
                description: None,
            },
            NOW,
        )
        .unwrap();
        let text = &up.statement.text;
        assert!(text.starts_with("MERGE (n:Component:ProjectNode {project: $project, name: $k_name})"));
        assert!(text.contains("OPTIONAL MATCH (a:Project {name: $anchor})"));
        assert!(text.contains("MERGE (x)-[:CONTAINS]->(n)"));
        assert_eq!(up.statement.params["k_name"], "ChainService");
        assert_eq!(up.statement.params["f_description"], Value::Null);
        assert_eq!(up.anchor.describe(), "Project p1");
    }

    #[test]
    fn test_file_prefers_module() {
        let spec = FileSpec {
            path: "src/rpc.rs".into(),
            component: Some("Core".into()),
            module: Some("rpc".into()),
            ..Default::default()
        };
        let up = file("p1", &spec, NOW).unwrap();
        assert!(up
            .statement
            .text
            .contains("(a:Module:ProjectNode {project: $project, name: $anchor})"));

        let orphan = FileSpec {
            path: "src/x.rs".into(),
            ..Default::default()
        };
        assert!(matches!(
            file("p1", &orphan, NOW),
            Err(UpdaterError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_function_keyed_by_name_and_file() {
        let up = function(
            "p1",
            &FunctionSpec {
                name: "optimize_batch_processing".into(),
                file: "src/chain_service/service.rs".into(),
                ..Default::default()
            },
            NOW,
        )
        .unwrap();
        assert!(up.statement.text.contains("name: $k_name, file: $k_file"));
        assert!(up
            .statement
            .text
            .contains("(a:File:ProjectNode {project: $project, path: $anchor})"));
        assert_eq!(up.key, "optimize_batch_processing");
    }

    #[test]
    fn test_documentation_points_at_target() {
        let up = documentation(
            "p1",
            &DocumentationSpec {
                name: "Service guide".into(),
                content: Some("How batching works".into()),
                url: None,
                target_kind: TargetKind::File,
                target: "src/service.rs".into(),
            },
            NOW,
        )
        .unwrap();
        assert!(up.statement.text.contains("MERGE (n)-[:DOCUMENTS]->(x)"));
        assert!(up.statement.text.contains("path: $anchor"));
    }

    #[test]
    fn test_empty_names_rejected() {
        let spec = ComponentSpec {
            name: "  ".into(),
            description: None,
        };
        assert!(component("p1", &spec, NOW).is_err());
        assert!(project("", None, NOW).is_err());
        let link = ComponentLink {
            from: "A".into(),
            to: "A".into(),
            description: None,
        };
        assert!(link_components("p1", &link).is_err());
    }

    #[test]
    fn test_change_log_binds_references() {
        let spec = ChangeLogSpec {
            description: "Added batch processing optimization".into(),
            change_type: Some("ENHANCEMENT".into()),
            components: vec!["ChainService".into()],
            ..Default::default()
        };
        let statement = change_log("p1", "CL-1", &spec, NOW).unwrap();
        assert!(statement.text.contains("MERGE (cl)-[:AFFECTS]->(c)"));
        assert!(statement.text.contains("MERGE (cl)-[:MODIFIES]->(f)"));
        assert!(statement.text.contains("MERGE (cl)-[:ADDS]->(fn)"));
        assert_eq!(statement.params["components"], serde_json::json!(["ChainService"]));
        assert_eq!(statement.params["files"], serde_json::json!([]));
        assert_eq!(statement.params["type"], "ENHANCEMENT");
    }
}
