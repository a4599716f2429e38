//! MCP server loop: newline-delimited JSON-RPC 2.0 over stdio.
//!
//! Lifecycle requests are answered in arrival order on the read loop. Each
//! `tools/call` runs in its own task, so a slow query does not hold up
//! `ping` or other calls, and `notifications/cancelled` aborts it. Responses
//! are written by the read loop as they complete, one line each.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use neo4j_mcp_core::config::ServerSettings;

use crate::dispatch::Dispatcher;
use crate::protocol::{
    CancelledParams, JsonRpcRequest, JsonRpcResponse, ToolCallParams, INTERNAL_ERROR,
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};

/// Tool calls still running, keyed by their encoded request id.
type InFlight = Arc<Mutex<HashMap<String, AbortHandle>>>;

/// Answers MCP requests read from a line-oriented transport.
pub struct McpServer {
    dispatcher: Dispatcher,
    settings: ServerSettings,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher, settings: ServerSettings) -> Self {
        Self {
            dispatcher,
            settings,
        }
    }

    /// Serve stdin/stdout until the client closes its end.
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout()).await
    }

    /// Serve any line-oriented transport until EOF, then finish the tool
    /// calls still running and write their responses.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(server = %self.settings.name, version = %self.settings.version, "MCP server starting on stdio");
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let in_flight = InFlight::default();
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    debug!(request = line, "Received");
                    self.accept(line, &tx, &in_flight).await;
                }
                Some(response) = rx.recv() => write_response(&mut writer, &response).await?,
            }
        }

        drop(tx);
        while let Some(response) = rx.recv().await {
            write_response(&mut writer, &response).await?;
        }
        info!("MCP server shutting down");
        Ok(())
    }

    /// Answer one raw message inline. Notifications get no response.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request = match parse_message(line) {
            Ok(request) => request,
            Err(response) => return Some(response),
        };
        match request.id.clone() {
            None => {
                self.handle_notification(&request, None);
                None
            }
            Some(id) => Some(self.handle_request(id, request).await),
        }
    }

    async fn accept(
        &self,
        line: &str,
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
        in_flight: &InFlight,
    ) {
        let request = match parse_message(line) {
            Ok(request) => request,
            Err(response) => {
                let _ = tx.send(response);
                return;
            }
        };
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request, Some(in_flight));
            return;
        };
        if request.method == "tools/call" && request.jsonrpc == "2.0" {
            self.spawn_call(id, request.params, tx.clone(), in_flight.clone());
        } else {
            let _ = tx.send(self.handle_request(id, request).await);
        }
    }

    fn spawn_call(
        &self,
        id: Value,
        params: Value,
        tx: mpsc::UnboundedSender<JsonRpcResponse>,
        in_flight: InFlight,
    ) {
        let key = id.to_string();
        let dispatcher = self.dispatcher.clone();
        let registry = in_flight.clone();
        let done_key = key.clone();

        // Registered before the task can deregister itself.
        let mut running = lock(&in_flight);
        let handle = tokio::spawn(async move {
            let response = call_tool(&dispatcher, id, params).await;
            lock(&registry).remove(&done_key);
            let _ = tx.send(response);
        });
        running.insert(key, handle.abort_handle());
    }

    fn handle_notification(&self, request: &JsonRpcRequest, in_flight: Option<&InFlight>) {
        match request.method.as_str() {
            "notifications/initialized" => info!("Client confirmed initialization"),
            "notifications/cancelled" => {
                let params: CancelledParams = match serde_json::from_value(request.params.clone()) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(error = %e, "Malformed cancellation");
                        return;
                    }
                };
                let key = params.request_id.to_string();
                let running = in_flight.and_then(|calls| lock(calls).remove(&key));
                match running {
                    Some(handle) => {
                        handle.abort();
                        info!(request_id = %key, reason = params.reason.as_deref().unwrap_or(""), "Cancelled tool call");
                    }
                    None => debug!(request_id = %key, "Cancellation for a request that is not running"),
                }
            }
            other => debug!(method = other, "Ignoring notification"),
        }
    }

    async fn handle_request(&self, id: Value, request: JsonRpcRequest) -> JsonRpcResponse {
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::error(id, INVALID_REQUEST, "jsonrpc must be \"2.0\"");
        }

        match request.method.as_str() {
            "initialize" => {
                if let Some(client) = request.params.get("clientInfo") {
                    info!(client = %client, "Initializing MCP session");
                }
                JsonRpcResponse::success(id, self.initialize_result())
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => match serde_json::to_value(self.dispatcher.tools()) {
                Ok(tools) => JsonRpcResponse::success(id, json!({ "tools": tools })),
                Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
            },
            "tools/call" => call_tool(&self.dispatcher, id, request.params).await,
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        }
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": self.settings.name,
                "version": self.settings.version,
            }
        })
    }
}

/// Decode one line, or the error response it deserves.
fn parse_message(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let raw: Value = serde_json::from_str(line).map_err(|e| {
        JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}"))
    })?;
    let fallback_id = raw.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(raw).map_err(|e| {
        JsonRpcResponse::error(fallback_id, INVALID_REQUEST, format!("Invalid request: {e}"))
    })
}

async fn call_tool(dispatcher: &Dispatcher, id: Value, params: Value) -> JsonRpcResponse {
    let params: ToolCallParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("Invalid tools/call params: {e}"),
            )
        }
    };
    let response = dispatcher.dispatch(&params.name, params.arguments).await;
    match serde_json::to_value(response) {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &JsonRpcResponse,
) -> std::io::Result<()> {
    let encoded = serde_json::to_string(response)?;
    debug!(response = %encoded, "Sending");
    writer.write_all(encoded.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
