//! Tool dispatch: validate, execute, and shape a single tool call.
//!
//! Each call walks `Idle -> Validating -> Executing -> Responding -> Idle`.
//! A call that fails validation goes straight to `Responding`; nothing is
//! sent to the database.

use serde_json::{json, Map, Value};

use neo4j_mcp_core::ErrorKind;
use neo4j_mcp_graph::{GraphError, GraphService};

use crate::protocol::{ToolCallResponse, ToolDescriptor};
use crate::tools::{ToolRegistry, ToolSpec};

/// Failure of one tool call, reported to the caller as a tool error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ToolError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidArguments,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "kind": self.kind,
            "message": self.message,
            "retryable": self.retryable,
        })
    }
}

impl From<GraphError> for ToolError {
    fn from(e: GraphError) -> Self {
        Self {
            kind: e.kind(),
            retryable: e.retryable(),
            message: match e {
                GraphError::InvalidArguments(msg) => msg,
                other => other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    Executing,
    Responding,
}

impl Phase {
    pub fn can_enter(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Idle, Phase::Validating)
                | (Phase::Validating, Phase::Executing)
                | (Phase::Validating, Phase::Responding)
                | (Phase::Executing, Phase::Responding)
                | (Phase::Responding, Phase::Idle)
        )
    }
}

struct CallState<'a> {
    tool: &'a str,
    phase: Phase,
}

impl<'a> CallState<'a> {
    fn new(tool: &'a str) -> Self {
        Self {
            tool,
            phase: Phase::Idle,
        }
    }

    fn enter(&mut self, next: Phase) {
        debug_assert!(self.phase.can_enter(next), "{:?} -> {:?}", self.phase, next);
        tracing::trace!(tool = self.tool, from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }
}

/// Routes tool calls to handlers. Holds no state between calls.
#[derive(Clone)]
pub struct Dispatcher {
    service: GraphService,
    registry: ToolRegistry,
}

impl Dispatcher {
    pub fn new(service: GraphService) -> Self {
        Self {
            service,
            registry: ToolRegistry::new(),
        }
    }

    /// Tool definitions for `tools/list`, sorted by name.
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors()
    }

    /// Run a tool call and shape the outcome as an MCP tool response.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> ToolCallResponse {
        match self.call(name, arguments).await {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => ToolCallResponse::text(text),
                Err(e) => ToolCallResponse::error(
                    ToolError {
                        kind: ErrorKind::QueryError,
                        message: format!("Failed to serialize result: {e}"),
                        retryable: false,
                    }
                    .to_json()
                    .to_string(),
                ),
            },
            Err(e) => {
                tracing::debug!(tool = name, kind = %e.kind, error = %e.message, "Tool call failed");
                ToolCallResponse::error(e.to_json().to_string())
            }
        }
    }

    /// Run a tool call and return the raw result.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let mut state = CallState::new(name);
        state.enter(Phase::Validating);

        let validated = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::invalid(format!("Unknown tool: {name}")))
            .and_then(|spec| validate(spec, arguments).map(|args| (spec, args)));

        let outcome = match validated {
            Ok((spec, args)) => {
                state.enter(Phase::Executing);
                tracing::debug!(tool = name, "Executing tool");
                (spec.handler)(&self.service, Value::Object(args)).await
            }
            Err(e) => Err(e),
        };

        state.enter(Phase::Responding);
        state.enter(Phase::Idle);
        outcome
    }
}

/// Check the argument object against the tool's declared fields.
fn validate(spec: &ToolSpec, arguments: Value) -> Result<Map<String, Value>, ToolError> {
    let args = match arguments {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(ToolError::invalid(format!(
                "{}: arguments must be an object, got {}",
                spec.name,
                json_type(&other)
            )))
        }
    };

    for field in spec.required {
        if args.get(*field).map_or(true, Value::is_null) {
            return Err(ToolError::invalid(format!(
                "{}: missing required argument '{field}'",
                spec.name
            )));
        }
    }

    let declared = spec
        .input_schema
        .get("properties")
        .and_then(Value::as_object);
    if let Some(declared) = declared {
        for (key, value) in &args {
            if value.is_null() {
                continue;
            }
            let expected = declared
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str);
            if let Some(expected) = expected {
                if !matches_type(value, expected) {
                    return Err(ToolError::invalid(format!(
                        "{}: argument '{key}' must be {expected}, got {}",
                        spec.name,
                        json_type(value)
                    )));
                }
            }
        }
    }
    Ok(args)
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
