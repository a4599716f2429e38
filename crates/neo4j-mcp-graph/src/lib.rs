//! Neo4j MCP Graph: query execution and administration for the MCP tools.
//!
//! Every tool call reaches the database through a [`GraphService`], which
//! talks to any [`CypherRunner`]. In production that is a pooled
//! [`GraphClient`]; in tests it is the scripted [`MockRunner`].

pub mod admin;
pub mod client;
pub mod convert;
pub mod cypher;
pub mod error;
pub mod explore;
pub mod mock;
pub mod queries;
pub mod runner;
pub mod schema;
pub mod service;

pub use client::{GraphClient, GraphConfig};
pub use error::{GraphError, Result};
pub use mock::MockRunner;
pub use runner::{CypherRunner, Record, Statement};
pub use service::GraphService;
