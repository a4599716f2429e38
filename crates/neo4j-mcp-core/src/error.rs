//! Error taxonomy shared by every layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of failure reported back to a tool caller.
///
/// Every error raised anywhere in the stack maps onto exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing required argument, wrong type, or unknown tool.
    InvalidArguments,
    /// The database is unreachable or rejected the credentials.
    ConnectionError,
    /// The engine rejected or failed the statement.
    QueryError,
    /// A mutating statement was submitted through a read-only tool.
    WriteAttemptedOnReadPath,
    /// Creating something that exists, or dropping something that does not.
    AdministrativeConflict,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArguments => "InvalidArguments",
            Self::ConnectionError => "ConnectionError",
            Self::QueryError => "QueryError",
            Self::WriteAttemptedOnReadPath => "WriteAttemptedOnReadPath",
            Self::AdministrativeConflict => "AdministrativeConflict",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while assembling configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    MissingFile(String),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while installing the log subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Cannot open log file {path}: {source}")]
    OpenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot install tracing subscriber: {0}")]
    Install(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_as_name() {
        let json = serde_json::to_string(&ErrorKind::WriteAttemptedOnReadPath).unwrap();
        assert_eq!(json, "\"WriteAttemptedOnReadPath\"");
        assert_eq!(ErrorKind::QueryError.to_string(), "QueryError");
    }
}
