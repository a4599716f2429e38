//! Error types for the neo4j-mcp-updater crate.

use neo4j_mcp_core::ErrorKind;
use neo4j_mcp_graph::GraphError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpdaterError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Project not found: {0}")]
    UnknownProject(String),

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UpdaterError>;

impl UpdaterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Graph(e) => e.kind(),
            _ => ErrorKind::InvalidArguments,
        }
    }
}

/// Reject empty or whitespace-only names.
pub(crate) fn require_name(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(UpdaterError::InvalidArguments(format!(
            "{what} must not be empty"
        )));
    }
    Ok(())
}
