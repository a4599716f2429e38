//! The seam between query builders and the database connection.

use async_trait::async_trait;
use serde_json::{Map, Value};

use neo4j_mcp_core::WriteSummary;

use crate::error::Result;

/// One result row, keyed by column name.
pub type Record = Map<String, Value>;

/// A Cypher statement plus its bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Map<String, Value>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Map::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params.extend(params);
        self
    }
}

/// Anything that can run Cypher against a graph.
#[async_trait]
pub trait CypherRunner: Send + Sync {
    /// Run a statement and collect every row.
    async fn fetch(&self, statement: Statement) -> Result<Vec<Record>>;

    /// Run a mutating statement and report what it changed.
    async fn apply(&self, statement: Statement) -> Result<WriteSummary>;

    /// Run statements in one transaction; all or nothing.
    async fn apply_all(&self, statements: Vec<Statement>) -> Result<()>;

    /// Address of the database, for reporting.
    fn address(&self) -> &str;

    /// Configured logical database, if any.
    fn database(&self) -> Option<&str>;
}
