//! Scripted in-memory runner for exercising query builders without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use neo4j_mcp_core::WriteSummary;

use crate::error::{GraphError, Result};
use crate::runner::{CypherRunner, Record, Statement};

#[derive(Debug, Clone)]
enum Reply {
    Rows(Vec<Record>),
    Summary(WriteSummary),
    Error(GraphError),
}

/// Records every statement and answers with canned replies.
///
/// A reply is chosen by the first registered fragment contained in the
/// statement text. Unmatched statements get no rows or an empty summary.
#[derive(Debug)]
pub struct MockRunner {
    replies: Mutex<Vec<(String, Reply)>>,
    executed: Mutex<Vec<Statement>>,
    batches: Mutex<Vec<Vec<Statement>>>,
    address: String,
    database: Option<String>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
            address: "bolt://mock:7687".to_string(),
            database: None,
        }
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    /// Answer statements containing `fragment` with these rows.
    /// Non-object values are replaced by empty records.
    pub fn reply_rows(&self, fragment: &str, rows: Vec<Value>) -> &Self {
        let records = rows
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                _ => Record::new(),
            })
            .collect();
        self.push(fragment, Reply::Rows(records))
    }

    pub fn reply_summary(&self, fragment: &str, summary: WriteSummary) -> &Self {
        self.push(fragment, Reply::Summary(summary))
    }

    pub fn reply_error(&self, fragment: &str, error: GraphError) -> &Self {
        self.push(fragment, Reply::Error(error))
    }

    /// Every statement passed to `fetch` or `apply`, in order.
    pub fn executed(&self) -> Vec<Statement> {
        lock(&self.executed).clone()
    }

    /// Every batch passed to `apply_all`, in order.
    pub fn batches(&self) -> Vec<Vec<Statement>> {
        lock(&self.batches).clone()
    }

    pub fn last(&self) -> Option<Statement> {
        lock(&self.executed).last().cloned()
    }

    fn push(&self, fragment: &str, reply: Reply) -> &Self {
        lock(&self.replies).push((fragment.to_string(), reply));
        self
    }

    fn find(&self, text: &str) -> Option<Reply> {
        lock(&self.replies)
            .iter()
            .find(|(fragment, _)| text.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CypherRunner for MockRunner {
    async fn fetch(&self, statement: Statement) -> Result<Vec<Record>> {
        let reply = self.find(&statement.text);
        lock(&self.executed).push(statement);
        match reply {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Error(e)) => Err(e),
            Some(Reply::Summary(s)) => Ok(s.rows),
            None => Ok(Vec::new()),
        }
    }

    async fn apply(&self, statement: Statement) -> Result<WriteSummary> {
        let reply = self.find(&statement.text);
        lock(&self.executed).push(statement);
        match reply {
            Some(Reply::Summary(s)) => Ok(s),
            Some(Reply::Rows(rows)) => Ok(WriteSummary {
                rows,
                ..Default::default()
            }),
            Some(Reply::Error(e)) => Err(e),
            None => Ok(WriteSummary::default()),
        }
    }

    async fn apply_all(&self, statements: Vec<Statement>) -> Result<()> {
        let failure = statements.iter().find_map(|s| match self.find(&s.text) {
            Some(Reply::Error(e)) => Some(e),
            _ => None,
        });
        lock(&self.batches).push(statements);
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}
