//! Index and constraint administration.
//!
//! Statements never use `IF [NOT] EXISTS`: creating an existing object or
//! dropping a missing one fails in the engine and surfaces as an
//! administrative conflict.

use std::str::FromStr;

use neo4j_mcp_core::AdminStatus;

use crate::cypher::{quote_all, quote_identifier};
use crate::error::{GraphError, Result};
use crate::runner::Statement;
use crate::service::{require_text, GraphService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexKind {
    #[default]
    Range,
    Text,
    Point,
    Fulltext,
}

impl FromStr for IndexKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RANGE" | "BTREE" => Ok(Self::Range),
            "TEXT" => Ok(Self::Text),
            "POINT" => Ok(Self::Point),
            "FULLTEXT" => Ok(Self::Fulltext),
            other => Err(GraphError::invalid(format!(
                "unknown index kind {other}; expected RANGE, TEXT, POINT or FULLTEXT"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    Exists,
    NodeKey,
}

impl FromStr for ConstraintKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace(' ', "_").as_str() {
            "UNIQUE" | "UNIQUENESS" => Ok(Self::Unique),
            "EXISTS" | "EXISTENCE" | "NOT_NULL" => Ok(Self::Exists),
            "NODE_KEY" | "KEY" => Ok(Self::NodeKey),
            other => Err(GraphError::invalid(format!(
                "unknown constraint kind {other}; expected UNIQUE, EXISTS or NODE_KEY"
            ))),
        }
    }
}

impl ConstraintKind {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Exists => "exists",
            Self::NodeKey => "node_key",
        }
    }
}

/// Deterministic object name, e.g. `idx_person_name_email`.
pub fn default_name(prefix: &str, label: &str, properties: &[String]) -> String {
    let mut parts = vec![prefix.to_string(), label.to_string()];
    parts.extend(properties.iter().cloned());
    parts
        .join("_")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn property_list(properties: &[String]) -> Result<Vec<String>> {
    Ok(quote_all(properties, "properties")?
        .into_iter()
        .map(|p| format!("n.{p}"))
        .collect())
}

fn require_single(kind: &str, properties: &[String]) -> Result<()> {
    if properties.len() != 1 {
        return Err(GraphError::invalid(format!(
            "{kind} takes exactly one property, got {}",
            properties.len()
        )));
    }
    Ok(())
}

fn resolve_name(name: Option<&str>, prefix: &str, label: &str, properties: &[String]) -> String {
    match name {
        Some(n) if !n.trim().is_empty() => n.to_string(),
        _ => default_name(prefix, label, properties),
    }
}

/// Build the `CREATE ... INDEX` statement and the name it creates.
pub fn index_statement(
    label: &str,
    properties: &[String],
    kind: IndexKind,
    name: Option<&str>,
) -> Result<(String, String)> {
    require_text(label, "label")?;
    let props = property_list(properties)?;
    let name = resolve_name(name, "idx", label, properties);
    let target = format!(
        "{} FOR (n:{})",
        quote_identifier(&name)?,
        quote_identifier(label)?
    );

    let cypher = match kind {
        IndexKind::Range => format!("CREATE INDEX {target} ON ({})", props.join(", ")),
        IndexKind::Text => {
            require_single("TEXT index", properties)?;
            format!("CREATE TEXT INDEX {target} ON ({})", props[0])
        }
        IndexKind::Point => {
            require_single("POINT index", properties)?;
            format!("CREATE POINT INDEX {target} ON ({})", props[0])
        }
        IndexKind::Fulltext => {
            format!("CREATE FULLTEXT INDEX {target} ON EACH [{}]", props.join(", "))
        }
    };
    Ok((name, cypher))
}

/// Build the `CREATE CONSTRAINT` statement and the name it creates.
pub fn constraint_statement(
    label: &str,
    properties: &[String],
    kind: ConstraintKind,
    name: Option<&str>,
) -> Result<(String, String)> {
    require_text(label, "label")?;
    let props = property_list(properties)?;
    let name = resolve_name(name, kind.prefix(), label, properties);
    let subject = if props.len() == 1 {
        props[0].clone()
    } else {
        format!("({})", props.join(", "))
    };

    let requirement = match kind {
        ConstraintKind::Unique => format!("{subject} IS UNIQUE"),
        ConstraintKind::Exists => {
            require_single("EXISTS constraint", properties)?;
            format!("{subject} IS NOT NULL")
        }
        ConstraintKind::NodeKey => format!("{subject} IS NODE KEY"),
    };
    let cypher = format!(
        "CREATE CONSTRAINT {} FOR (n:{}) REQUIRE {requirement}",
        quote_identifier(&name)?,
        quote_identifier(label)?
    );
    Ok((name, cypher))
}

impl GraphService {
    // ── Indexes ──────────────────────────────────────────────────

    pub async fn create_index(
        &self,
        label: &str,
        properties: &[String],
        kind: IndexKind,
        name: Option<&str>,
    ) -> Result<AdminStatus> {
        let (name, cypher) = index_statement(label, properties, kind, name)?;
        self.change_schema("created", name, cypher).await
    }

    pub async fn drop_index(&self, name: &str) -> Result<AdminStatus> {
        require_text(name, "name")?;
        let cypher = format!("DROP INDEX {}", quote_identifier(name)?);
        self.change_schema("dropped", name.to_string(), cypher).await
    }

    // ── Constraints ──────────────────────────────────────────────

    pub async fn create_constraint(
        &self,
        label: &str,
        properties: &[String],
        kind: ConstraintKind,
        name: Option<&str>,
    ) -> Result<AdminStatus> {
        let (name, cypher) = constraint_statement(label, properties, kind, name)?;
        self.change_schema("created", name, cypher).await
    }

    pub async fn drop_constraint(&self, name: &str) -> Result<AdminStatus> {
        require_text(name, "name")?;
        let cypher = format!("DROP CONSTRAINT {}", quote_identifier(name)?);
        self.change_schema("dropped", name.to_string(), cypher).await
    }

    async fn change_schema(&self, status: &str, name: String, cypher: String) -> Result<AdminStatus> {
        self.runner().apply(Statement::new(cypher.clone())).await?;
        tracing::info!(name = %name, status, statement = %cypher, "Schema changed");
        Ok(AdminStatus {
            status: status.to_string(),
            name,
            statement: cypher,
        })
    }
}
