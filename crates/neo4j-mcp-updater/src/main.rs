//! CLI entry point for neo4j-graph-updater.
//!
//! Prints JSON results on stdout; logs go to stderr unless `--log-file` is set.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use neo4j_mcp_core::{logging, AppConfig, ConfigOverrides};
use neo4j_mcp_graph::{GraphClient, GraphConfig};
use neo4j_mcp_updater::{Manifest, ProjectGraph};

#[derive(Parser)]
#[command(name = "neo4j-graph-updater")]
#[command(about = "Keep a project's components, files and change logs in a Neo4j knowledge graph")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ./neo4j-mcp.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    uri: Option<String>,

    #[arg(long, global = true)]
    username: Option<String>,

    #[arg(long, global = true)]
    password: Option<String>,

    #[arg(long, global = true)]
    database: Option<String>,

    /// Log filter when RUST_LOG is unset.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create the project root node if it does not exist.
    Init {
        #[arg(long)]
        project: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Import a JSON manifest in one transaction.
    Apply {
        #[arg(long)]
        manifest: PathBuf,
    },
    /// Count a project's nodes and relationships.
    Summary {
        #[arg(long)]
        project: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&ConfigOverrides {
        config_file: cli.config.clone(),
        uri: cli.uri.clone(),
        username: cli.username.clone(),
        password: cli.password.clone(),
        database: cli.database.clone(),
        log_level: cli.log_level.clone(),
        log_file: cli.log_file.clone(),
        log_json: cli.log_json.then_some(true),
    })?;
    logging::init(&config.logging)?;

    let client = GraphClient::open(&GraphConfig::from(&config.neo4j))?;
    client.verify_connectivity().await?;
    let graph = ProjectGraph::new(Arc::new(client.clone()));

    let output = match cli.command {
        Command::Init {
            ref project,
            ref description,
        } => serde_json::to_value(
            graph
                .initialize_project(project, description.as_deref())
                .await?,
        )?,
        Command::Apply { ref manifest } => {
            let manifest = Manifest::from_path(manifest)?;
            serde_json::to_value(graph.apply_manifest(&manifest).await?)?
        }
        Command::Summary { ref project } => {
            serde_json::to_value(graph.project_summary(project).await?)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    client.close();
    Ok(())
}
