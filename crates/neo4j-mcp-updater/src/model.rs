//! Inputs and reports of the project-tagging layer.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdaterError};

// ── Inputs ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A module, contained by a component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    pub component: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A source file, contained by its module when given, otherwise by its component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: String,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A function, identified by name within its file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// What a documentation node describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Component,
    Module,
    File,
    Function,
}

impl TargetKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Component => "Component",
            Self::Module => "Module",
            Self::File => "File",
            Self::Function => "Function",
        }
    }

    /// Property that identifies a node of this kind within a project.
    pub fn key_property(&self) -> &'static str {
        match self {
            Self::File => "path",
            _ => "name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationSpec {
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub target_kind: TargetKind,
    /// Name of the target, or its path for files.
    pub target: String,
}

/// An `INTERACTS_WITH` edge between two components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentLink {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A `CALLS` edge. The optional files disambiguate same-named functions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub caller: String,
    pub callee: String,
    #[serde(default)]
    pub caller_file: Option<String>,
    #[serde(default)]
    pub callee_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogSpec {
    /// Generated as `CL-<uuid>` when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub description: String,
    #[serde(default, rename = "type")]
    pub change_type: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
}

/// Everything to import for one project, applied in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub project: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub files: Vec<FileSpec>,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
    #[serde(default)]
    pub documentation: Vec<DocumentationSpec>,
    #[serde(default)]
    pub links: Vec<ComponentLink>,
    #[serde(default)]
    pub calls: Vec<FunctionCall>,
    #[serde(default)]
    pub change_logs: Vec<ChangeLogSpec>,
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| UpdaterError::Manifest(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
            .map_err(|e| UpdaterError::Manifest(format!("{}: {e}", path.display())))
    }
}

// ── Reports ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub name: String,
    /// False when the project already existed.
    pub created: bool,
}

/// Outcome of an upsert. `attached` is false when the parent (or documented
/// target) does not exist; the node is created regardless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub label: String,
    pub key: String,
    pub parent: String,
    pub attached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkReport {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub from: String,
    pub to: String,
    /// Number of edges now present; zero when an endpoint is missing.
    pub linked: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSet {
    pub components: Vec<String>,
    pub files: Vec<String>,
    pub functions: Vec<String>,
}

impl ReferenceSet {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.files.is_empty() && self.functions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.components.len() + self.files.len() + self.functions.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogReport {
    pub id: String,
    pub linked: ReferenceSet,
    /// References that matched no node and were left unlinked.
    pub skipped: ReferenceSet,
}

/// A node identified by label and key, e.g. `File src/lib.rs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeKey {
    pub label: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub nodes: BTreeMap<String, i64>,
    pub relationships: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestReport {
    pub project: String,
    pub statements: usize,
    pub change_logs: Vec<ChangeLogReport>,
    /// Project nodes left without a container, or documentation without a target.
    pub unattached: Vec<NodeKey>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_defaults() {
        let manifest = Manifest::from_json(r#"{"project": "evm-logs"}"#).unwrap();
        assert_eq!(manifest.project, "evm-logs");
        assert!(manifest.components.is_empty());
        assert!(manifest.change_logs.is_empty());
    }

    #[test]
    fn test_change_log_type_field() {
        let spec: ChangeLogSpec = serde_json::from_str(
            r#"{"description": "Batch tuning", "type": "ENHANCEMENT", "components": ["ChainService"]}"#,
        )
        .unwrap();
        assert_eq!(spec.change_type.as_deref(), Some("ENHANCEMENT"));
        assert!(spec.id.is_none());
        assert_eq!(spec.components, vec!["ChainService"]);
    }

    #[test]
    fn test_malformed_manifest() {
        let err = Manifest::from_json(r#"{"components": []}"#).unwrap_err();
        assert!(matches!(err, UpdaterError::Manifest(_)));
    }

    #[test]
    fn test_manifest_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"{"project": "p1", "files": [{"path": "src/lib.rs", "component": "Core"}]}"#,
        )
        .unwrap();
        let manifest = Manifest::from_path(&path).unwrap();
        assert_eq!(manifest.files[0].component.as_deref(), Some("Core"));

        let missing = Manifest::from_path(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, UpdaterError::Io(_)));
    }

    #[test]
    fn test_target_kind_keys() {
        assert_eq!(TargetKind::File.key_property(), "path");
        assert_eq!(TargetKind::Function.key_property(), "name");
        let doc: DocumentationSpec = serde_json::from_str(
            r#"{"name": "Guide", "target_kind": "Module", "target": "rpc"}"#,
        )
        .unwrap();
        assert_eq!(doc.target_kind, TargetKind::Module);
    }
}
