//! Errors from graph operations and their mapping onto tool error kinds.

use neo4j_mcp_core::ErrorKind;

/// Errors from graph operations.
///
/// Driver errors are flattened to text on conversion so the error stays
/// `Clone` and can be scripted by [`crate::MockRunner`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {message}")]
    Query { message: String, retryable: bool },

    #[error("Write statement rejected on the read path (found {keyword})")]
    WriteOnReadPath { keyword: String },

    #[error("Schema conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

impl GraphError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArguments(_) => ErrorKind::InvalidArguments,
            Self::Connection(_) => ErrorKind::ConnectionError,
            Self::Query { .. } | Self::Serialization(_) => ErrorKind::QueryError,
            Self::WriteOnReadPath { .. } => ErrorKind::WriteAttemptedOnReadPath,
            Self::Conflict(_) => ErrorKind::AdministrativeConflict,
        }
    }

    /// Whether the same call may succeed if simply repeated.
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Query { retryable: true, .. })
    }

    /// Classify a driver or server error message.
    ///
    /// Neo4j embeds its status code (`Neo.ClientError.Schema.IndexAlreadyExists`,
    /// `Neo.TransientError.Transaction.DeadlockDetected`, ...) in the message
    /// text, which is all the driver surfaces uniformly.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();

        if message.contains("Neo.TransientError") || message.contains("DeadlockDetected") {
            return Self::Query {
                message: message.to_string(),
                retryable: true,
            };
        }

        if message.contains("Neo.ClientError.Security")
            || lower.contains("authentication")
            || lower.contains("unauthorized")
        {
            return Self::Connection(message.to_string());
        }

        const CONFLICT_MARKERS: &[&str] = &[
            "AlreadyExists",
            "IndexDropFailed",
            "ConstraintDropFailed",
            "DropIndexFailed",
            "DropConstraintFailed",
            "Schema.IndexNotFound",
            "Schema.ConstraintNotFound",
        ];
        if CONFLICT_MARKERS.iter().any(|m| message.contains(m)) {
            return Self::Conflict(message.to_string());
        }

        const CONNECTION_MARKERS: &[&str] = &[
            "connection refused",
            "connection reset",
            "connection closed",
            "broken pipe",
            "io error",
            "unable to connect",
            "failed to connect",
            "dns error",
            "service unavailable",
            "serviceunavailable",
        ];
        if CONNECTION_MARKERS.iter().any(|m| lower.contains(m)) {
            return Self::Connection(message.to_string());
        }

        Self::Query {
            message: message.to_string(),
            retryable: false,
        }
    }
}

impl From<neo4rs::Error> for GraphError {
    fn from(e: neo4rs::Error) -> Self {
        Self::classify(&e.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        let err = GraphError::classify(
            "Neo4j error `Neo.TransientError.Transaction.DeadlockDetected`: lock cycle",
        );
        assert_eq!(err.kind(), ErrorKind::QueryError);
        assert!(err.retryable());
    }

    #[test]
    fn test_syntax_errors_are_not_retryable() {
        let err = GraphError::classify(
            "Neo4j error `Neo.ClientError.Statement.SyntaxError`: Invalid input 'CRATE'",
        );
        assert_eq!(err.kind(), ErrorKind::QueryError);
        assert!(!err.retryable());
    }

    #[test]
    fn test_schema_conflicts() {
        for msg in [
            "Neo.ClientError.Schema.EquivalentSchemaRuleAlreadyExists: An equivalent index already exists",
            "Neo.ClientError.Schema.IndexAlreadyExists: There already exists an index called 'x'",
            "Neo.DatabaseError.Schema.IndexDropFailed: Unable to drop index: No such index 'x'",
            "Neo.DatabaseError.Schema.ConstraintDropFailed: No such constraint 'c'",
        ] {
            assert_eq!(
                GraphError::classify(msg).kind(),
                ErrorKind::AdministrativeConflict,
                "{msg}"
            );
        }
    }

    #[test]
    fn test_connection_failures() {
        let refused = GraphError::classify("an IO error occurred: Connection refused (os error 111)");
        assert_eq!(refused.kind(), ErrorKind::ConnectionError);

        let auth = GraphError::classify(
            "Neo.ClientError.Security.Unauthorized: The client is unauthorized due to authentication failure.",
        );
        assert_eq!(auth.kind(), ErrorKind::ConnectionError);
        assert!(!auth.retryable());
    }

    #[test]
    fn test_serialization_maps_to_query_error() {
        let err = GraphError::Serialization("bad row".into());
        assert_eq!(err.kind(), ErrorKind::QueryError);
        assert!(!err.retryable());
    }
}
