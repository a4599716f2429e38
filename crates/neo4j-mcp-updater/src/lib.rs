//! neo4j-mcp-updater: keeps a project's code structure in the graph.
//!
//! Every node written here carries the `ProjectNode` label and a `project`
//! property naming its owner, so several projects share one database
//! without colliding. The project root itself is a plain `Project` node.

pub mod error;
pub mod model;
mod statements;
pub mod updater;

pub use error::{Result, UpdaterError};
pub use model::*;
pub use updater::ProjectGraph;
