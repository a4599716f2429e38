//! CLI entry point for the Neo4j MCP server.
//!
//! Speaks MCP over stdin/stdout; logs go to stderr unless `--log-file` is set.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use neo4j_mcp_core::{logging, AppConfig, ConfigOverrides};
use neo4j_mcp_graph::{GraphClient, GraphConfig, GraphService};
use neo4j_mcp_server::{Dispatcher, McpServer};

#[derive(Parser)]
#[command(name = "neo4j-mcp-server")]
#[command(about = "MCP server exposing Neo4j query, schema, and path-finding tools over stdio")]
#[command(version)]
struct Cli {
    /// Config file (default: ./neo4j-mcp.toml when present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bolt URI, e.g. bolt://localhost:7687.
    #[arg(long)]
    uri: Option<String>,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Logical database (default: the server's default database).
    #[arg(long)]
    database: Option<String>,

    /// Log filter when RUST_LOG is unset (e.g. "debug", "neo4j_mcp_graph=trace").
    #[arg(long)]
    log_level: Option<String>,

    /// Append logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            uri: self.uri.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            log_level: self.log_level.clone(),
            log_file: self.log_file.clone(),
            log_json: self.log_json.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.overrides())?;
    logging::init(&config.logging)?;

    tracing::info!(
        uri = %config.neo4j.uri,
        database = config.neo4j.database.as_deref().unwrap_or("<default>"),
        "Starting neo4j-mcp-server"
    );

    let client = GraphClient::open(&GraphConfig::from(&config.neo4j))?;
    let service = GraphService::new(Arc::new(client.clone()));
    let server = McpServer::new(Dispatcher::new(service), config.server.clone());

    let outcome = server.run_stdio().await;
    client.close();
    outcome?;
    Ok(())
}
