//! neo4j-mcp-core: Shared configuration, error kinds, and result types.
//!
//! This crate provides the foundations used by the graph layer, the MCP
//! server, and the project graph updater:
//! - Layered configuration (defaults, file, environment, command line)
//! - The error-kind taxonomy reported to tool callers
//! - Log subscriber setup driven by the `[logging]` section
//! - Serializable result shapes (schema, statistics, paths, write summaries)

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{AppConfig, ConfigOverrides, LoggingSettings, Neo4jSettings, ServerSettings};
pub use error::{ConfigError, ErrorKind, LoggingError};
pub use types::*;
