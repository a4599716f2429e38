//! Statement execution: guarded reads, writes with summaries, and planning.

use serde_json::{Map, Value};

use neo4j_mcp_core::{PlanDescription, StatementKind, WriteSummary};

use crate::cypher;
use crate::error::{GraphError, Result};
use crate::runner::{Record, Statement};
use crate::service::{require_text, GraphService};

impl GraphService {
    // ── Statement Execution ──────────────────────────────────────

    /// Run a read-only statement and return its rows.
    ///
    /// Statements the keyword classifier considers mutating are rejected
    /// before reaching the database.
    pub async fn execute_read(&self, query: &str, params: Map<String, Value>) -> Result<Vec<Record>> {
        require_text(query, "query")?;
        let classification = cypher::classify(query);
        if !classification.is_read() {
            let keyword = classification.keyword.unwrap_or_default();
            tracing::warn!(keyword = %keyword, "Rejected write on read path");
            return Err(GraphError::WriteOnReadPath { keyword });
        }
        self.runner()
            .fetch(Statement::new(query).with_params(params))
            .await
    }

    /// Run any statement and summarize its effect.
    pub async fn execute_write(
        &self,
        query: &str,
        params: Map<String, Value>,
    ) -> Result<WriteSummary> {
        require_text(query, "query")?;
        let summary = self
            .runner()
            .apply(Statement::new(query).with_params(params))
            .await?;
        tracing::debug!(
            counts_observed = summary.counts_observed,
            nodes_created = summary.nodes_created,
            nodes_deleted = summary.nodes_deleted,
            relationships_created = summary.relationships_created,
            relationships_deleted = summary.relationships_deleted,
            "Write applied"
        );
        Ok(summary)
    }

    /// Have the engine parse and plan a statement without running it.
    ///
    /// The driver does not surface the plan tree, so the result reports
    /// that planning succeeded together with the local classification.
    /// Planning failures come back as non-retryable query errors.
    pub async fn explain(&self, query: &str) -> Result<PlanDescription> {
        require_text(query, "query")?;
        if let Some(first) = cypher::leading_keyword(query) {
            if first == "EXPLAIN" || first == "PROFILE" {
                return Err(GraphError::invalid(format!(
                    "query must not start with {first}"
                )));
            }
        }

        let classification = cypher::classify(query);
        self.runner()
            .fetch(Statement::new(format!("EXPLAIN {query}")))
            .await?;

        Ok(PlanDescription {
            statement: query.to_string(),
            kind: classification.kind,
            planned: true,
            write_keyword: match classification.kind {
                StatementKind::Read => None,
                _ => classification.keyword,
            },
        })
    }
}
