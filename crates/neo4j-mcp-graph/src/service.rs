//! The graph service every tool call goes through.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{GraphError, Result};
use crate::runner::{CypherRunner, Record};

/// Query executor, introspector, explorer, and administrator in one handle.
///
/// Holds no graph state between calls; each method issues its own
/// statements through the shared runner.
#[derive(Clone)]
pub struct GraphService {
    runner: Arc<dyn CypherRunner>,
}

impl GraphService {
    pub fn new(runner: Arc<dyn CypherRunner>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &Arc<dyn CypherRunner> {
        &self.runner
    }

    pub fn address(&self) -> &str {
        self.runner.address()
    }

    pub fn database(&self) -> Option<&str> {
        self.runner.database()
    }
}

// ── Record Field Access ──────────────────────────────────────────

pub(crate) fn get_str(record: &Record, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

pub(crate) fn get_opt_str(record: &Record, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

pub(crate) fn get_i64(record: &Record, key: &str) -> i64 {
    record.get(key).and_then(Value::as_i64).unwrap_or(0)
}

pub(crate) fn get_strings(record: &Record, key: &str) -> Vec<String> {
    match record.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn get_map(record: &Record, key: &str) -> Map<String, Value> {
    match record.get(key) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(record: &Record, key: &str) -> Result<T> {
    let value = record.get(key).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|e| GraphError::Serialization(format!("Failed to decode {key}: {e}")))
}

pub(crate) fn require_text(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GraphError::invalid(format!("{what} must not be empty")));
    }
    Ok(())
}

pub(crate) fn require_positive(value: i64, what: &str) -> Result<()> {
    if value < 1 {
        return Err(GraphError::invalid(format!("{what} must be at least 1, got {value}")));
    }
    Ok(())
}
