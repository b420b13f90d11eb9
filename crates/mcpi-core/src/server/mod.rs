//! MCP server over stdio.
//!
//! One JSON-RPC message per line in, one per line out. Logging goes to
//! stderr; stdout carries protocol traffic only.

pub mod protocol;

use std::io::{BufRead, Write};

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::context::AppContext;
use crate::router::{Router, RouterError, tool_definitions};

use protocol::{
    Content, INVALID_PARAMS, INVALID_REQUEST, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, ServerCapabilities, ServerInfo,
    ToolCallParams, ToolCallResult,
};

pub const SERVER_NAME: &str = "mcpi";

/// Serves the router's tools to one client.
pub struct McpServer<'a> {
    ctx: &'a mut AppContext,
}

impl<'a> McpServer<'a> {
    pub fn new(ctx: &'a mut AppContext) -> Self {
        Self { ctx }
    }

    /// Process requests from `input` until EOF.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> std::io::Result<()> {
        info!("MCP server ready on stdio");
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line) {
                let mut bytes = serde_json::to_vec(&response)?;
                bytes.push(b'\n');
                output.write_all(&bytes)?;
                output.flush()?;
            }
        }
        info!("Client closed stdin, shutting down");
        Ok(())
    }

    /// Handle one raw message. Returns `None` for notifications.
    pub fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparsable message: {}", e);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ));
            }
        };

        if request.is_notification() {
            debug!("Notification {}", request.method);
            return None;
        }
        Some(self.handle_request(request))
    }

    fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.unwrap_or(Value::Null);
        debug!("Request {}", request.method);

        match request.method.as_str() {
            "initialize" => JsonRpcResponse::result(id, initialize_result()),
            "ping" => JsonRpcResponse::result(id, json!({})),
            "tools/list" => JsonRpcResponse::result(id, json!({ "tools": tool_definitions() })),
            "tools/call" => {
                let params: ToolCallParams =
                    match serde_json::from_value(request.params.unwrap_or(Value::Null)) {
                        Ok(params) => params,
                        Err(e) => {
                            return JsonRpcResponse::error(
                                id,
                                INVALID_PARAMS,
                                format!("Invalid tools/call params: {}", e),
                            );
                        }
                    };
                self.call_tool(id, params)
            }
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        }
    }

    fn call_tool(&mut self, id: Value, params: ToolCallParams) -> JsonRpcResponse {
        let mut router = Router::new(&mut *self.ctx);
        match router.handle(&params.name, params.arguments) {
            Ok(response) => {
                let result = ToolCallResult {
                    content: vec![Content::Text {
                        text: response.to_json().to_string(),
                    }],
                    is_error: !response.success,
                };
                JsonRpcResponse::result(id, json!(result))
            }
            Err(RouterError::UnknownTool(name)) => {
                JsonRpcResponse::error(id, INVALID_PARAMS, format!("Unknown tool: {}", name))
            }
        }
    }
}

fn initialize_result() -> Value {
    json!(InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities { tools: json!({}) },
        server_info: ServerInfo {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}
