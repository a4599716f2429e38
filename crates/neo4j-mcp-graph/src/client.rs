//! Neo4j connection management and the pooled graph client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query, Txn};
use tokio::sync::OnceCell;

use neo4j_mcp_core::{Neo4jSettings, StatementKind, WriteSummary};

use crate::convert::{row_to_record, to_query};
use crate::cypher;
use crate::error::{GraphError, Result};
use crate::runner::{CypherRunner, Record, Statement};

/// Node and relationship totals, read from the count store.
const COUNT_SNAPSHOT: &str = "CALL { MATCH (n) RETURN count(n) AS nodes }
     CALL { MATCH ()-[r]->() RETURN count(r) AS relationships }
     RETURN nodes, relationships";

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
    pub max_connections: u32,
    pub fetch_size: usize,
    pub query_timeout: Duration,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::from(&Neo4jSettings::default())
    }
}

impl From<&Neo4jSettings> for GraphConfig {
    fn from(settings: &Neo4jSettings) -> Self {
        Self {
            uri: settings.uri.clone(),
            user: settings.username.clone(),
            password: settings.password.clone(),
            database: settings.database.clone(),
            max_connections: settings.max_connections,
            fetch_size: settings.fetch_size,
            query_timeout: settings.query_timeout(),
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Opening the client only validates the configuration; the pool is created
/// on the first statement, so an unreachable server or bad credentials
/// surface as a `ConnectionError` from that statement. Every statement
/// borrows a pooled connection and returns it when its stream is dropped.
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    config: neo4rs::Config,
    graph: Arc<OnceCell<Graph>>,
    address: String,
    database: Option<String>,
    timeout: Duration,
}

impl GraphClient {
    /// Validate the configuration and prepare a lazily connected client.
    pub fn open(config: &GraphConfig) -> Result<Self> {
        let mut builder = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo_config = builder
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(
            uri = %config.uri,
            database = config.database.as_deref().unwrap_or("<default>"),
            "Neo4j client opened"
        );
        Ok(Self {
            config: neo_config,
            graph: Arc::new(OnceCell::new()),
            address: config.uri.clone(),
            database: config.database.clone(),
            timeout: config.query_timeout,
        })
    }

    /// Close the client. Pooled connections are released once every clone is dropped.
    pub fn close(self) {
        tracing::info!(uri = %self.address, "Neo4j client closed");
    }

    /// Get the underlying neo4rs Graph, connecting on first use.
    ///
    /// The first connection is opened through a transaction, which the driver
    /// does not retry. Any failure or timeout here is a `Connection` error.
    pub async fn inner(&self) -> Result<&Graph> {
        self.graph
            .get_or_try_init(|| async {
                let connect = async {
                    let graph = Graph::connect(self.config.clone()).await?;
                    graph.start_txn().await?.rollback().await?;
                    Ok::<_, neo4rs::Error>(graph)
                };
                let graph = match tokio::time::timeout(self.timeout, connect).await {
                    Ok(Ok(graph)) => graph,
                    Ok(Err(e)) => return Err(GraphError::Connection(e.to_string())),
                    Err(_) => {
                        return Err(GraphError::Connection(format!(
                            "no answer from {} within {}s",
                            self.address,
                            self.timeout.as_secs()
                        )))
                    }
                };
                tracing::info!(uri = %self.address, "Connected to Neo4j");
                Ok(graph)
            })
            .await
    }

    /// Round-trip a trivial statement to check the server and credentials.
    pub async fn verify_connectivity(&self) -> Result<()> {
        self.query_rows(neo4rs::query("RETURN 1 AS ok")).await?;
        Ok(())
    }

    /// Execute a statement without collecting results.
    pub async fn run(&self, query: Query) -> Result<()> {
        let graph = self.inner().await?;
        self.bounded(async { Ok(graph.run(query).await?) }).await
    }

    /// Execute a query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>> {
        let graph = self.inner().await?;
        self.bounded(async {
            let mut stream = graph.execute(query).await?;
            let mut rows = Vec::new();
            while let Some(row) = stream.next().await? {
                rows.push(row);
            }
            Ok(rows)
        })
        .await
    }

    /// Begin a transaction.
    pub async fn start_txn(&self) -> Result<Txn> {
        let graph = self.inner().await?;
        self.bounded(async { Ok(graph.start_txn().await?) }).await
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GraphError::Query {
                message: format!("statement timed out after {}s", self.timeout.as_secs()),
                retryable: true,
            }),
        }
    }

    async fn write_in_txn(&self, txn: &mut Txn, statement: &Statement) -> Result<WriteSummary> {
        let before = count_snapshot(txn).await?;
        let rows = drain(txn, to_query(statement)).await?;
        let after = count_snapshot(txn).await?;

        let mut summary = WriteSummary::from_counts(before, after);
        summary.rows = rows
            .iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>>>()?;
        Ok(summary)
    }
}

/// How a write statement reaches the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteRoute {
    /// Index or constraint change, run on its own.
    Schema,
    /// Batched statements the server only accepts outside an explicit
    /// transaction; no count snapshots.
    AutoCommit,
    /// Explicit transaction between count snapshots.
    Counted,
}

fn write_route(text: &str) -> WriteRoute {
    if cypher::requires_auto_commit(text) {
        WriteRoute::AutoCommit
    } else if cypher::classify(text).kind == StatementKind::Schema {
        WriteRoute::Schema
    } else {
        WriteRoute::Counted
    }
}

async fn drain(txn: &mut Txn, query: Query) -> Result<Vec<neo4rs::Row>> {
    let mut stream = txn.execute(query).await?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next(txn.handle()).await? {
        rows.push(row);
    }
    Ok(rows)
}

async fn count_snapshot(txn: &mut Txn) -> Result<(i64, i64)> {
    let rows = drain(txn, neo4rs::query(COUNT_SNAPSHOT)).await?;
    let row = rows
        .first()
        .ok_or_else(|| GraphError::Serialization("count snapshot returned no rows".into()))?;
    let nodes: i64 = row
        .get("nodes")
        .map_err(|e| GraphError::Serialization(format!("Failed to read node count: {e}")))?;
    let relationships: i64 = row.get("relationships").map_err(|e| {
        GraphError::Serialization(format!("Failed to read relationship count: {e}"))
    })?;
    Ok((nodes, relationships))
}

#[async_trait]
impl CypherRunner for GraphClient {
    async fn fetch(&self, statement: Statement) -> Result<Vec<Record>> {
        tracing::debug!(statement = %statement.text, "fetch");
        let rows = self.query_rows(to_query(&statement)).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn apply(&self, statement: Statement) -> Result<WriteSummary> {
        tracing::debug!(statement = %statement.text, "apply");

        match write_route(&statement.text) {
            WriteRoute::Schema => {
                self.run(to_query(&statement)).await?;
                return Ok(WriteSummary {
                    schema_changed: true,
                    ..Default::default()
                });
            }
            WriteRoute::AutoCommit => {
                let rows = self.query_rows(to_query(&statement)).await?;
                return Ok(WriteSummary {
                    rows: rows
                        .iter()
                        .map(row_to_record)
                        .collect::<Result<Vec<_>>>()?,
                    ..Default::default()
                });
            }
            WriteRoute::Counted => {}
        }

        let mut txn = self.start_txn().await?;
        let outcome = self.bounded(self.write_in_txn(&mut txn, &statement)).await;
        match outcome {
            Ok(summary) => {
                txn.commit().await?;
                Ok(summary)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn apply_all(&self, statements: Vec<Statement>) -> Result<()> {
        tracing::debug!(count = statements.len(), "apply_all");
        let mut txn = self.start_txn().await?;

        let outcome = self
            .bounded(async {
                for statement in &statements {
                    txn.run(to_query(statement)).await?;
                }
                Ok(())
            })
            .await;

        match outcome {
            Ok(()) => {
                txn.commit().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo4j_mcp_core::ErrorKind;

    #[test]
    fn test_config_from_settings() {
        let settings = Neo4jSettings {
            uri: "bolt://graph:7687".into(),
            database: Some("projects".into()),
            query_timeout_secs: 5,
            ..Default::default()
        };
        let config = GraphConfig::from(&settings);
        assert_eq!(config.uri, "bolt://graph:7687");
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.database.as_deref(), Some("projects"));
        assert_eq!(config.query_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_write_routes() {
        assert_eq!(
            write_route("CREATE INDEX idx_person_name FOR (n:Person) ON (n.name)"),
            WriteRoute::Schema
        );
        assert_eq!(
            write_route("UNWIND range(1, 3) AS i CALL { WITH i CREATE (:X) } IN TRANSACTIONS"),
            WriteRoute::AutoCommit
        );
        assert_eq!(
            write_route("MATCH (n:Tmp) CALL { WITH n DETACH DELETE n } IN TRANSACTIONS OF 100 ROWS"),
            WriteRoute::AutoCommit
        );
        assert_eq!(write_route("CREATE (:Person {name: 'Alice'})"), WriteRoute::Counted);
        assert_eq!(write_route("CALL { CREATE (:X) } RETURN 1"), WriteRoute::Counted);
    }

    #[tokio::test]
    async fn test_open_does_not_connect() {
        let config = GraphConfig {
            uri: "bolt://127.0.0.1:1".into(),
            ..Default::default()
        };
        let client = GraphClient::open(&config).unwrap();
        assert_eq!(client.address(), "bolt://127.0.0.1:1");
        assert!(client.database().is_none());
        client.close();
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let config = GraphConfig {
            uri: "bolt://127.0.0.1:1".into(),
            query_timeout: Duration::from_secs(10),
            ..Default::default()
        };
        let client = GraphClient::open(&config).unwrap();

        let started = std::time::Instant::now();
        let err = client.fetch(Statement::new("RETURN 1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionError);
        assert!(!err.retryable());
        assert!(started.elapsed() < Duration::from_secs(10));

        let err = client.verify_connectivity().await.unwrap_err();
        assert!(matches!(err, GraphError::Connection(_)));
        let err = client.apply(Statement::new("CREATE (:X)")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionError);
    }
}
