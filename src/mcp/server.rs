//! MCP Server implementation
//!
//! Implements the Model Context Protocol server for stdio transport.

use std::io::{BufRead, Write};

use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;

/// MCP Server info
const SERVER_NAME: &str = "Agent AutoAbsorb";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for the absorbance reader
pub struct McpServer {
    /// Tool handler
    tool_handler: ToolHandler,

    /// Whether initialized
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(tool_handler: ToolHandler) -> Self {
        Self {
            tool_handler,
            initialized: false,
        }
    }

    /// Whether the client sent `notifications/initialized`
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server on stdio
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();

        let reader = stdin.lock();
        info!("Serving MCP on stdio");

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match self.handle_message(&line).await {
                Ok(Some(response)) => {
                    let response_str = serde_json::to_string(&response)?;
                    writeln!(stdout, "{}", response_str)?;
                    stdout.flush()?;
                }
                Ok(None) => {
                    // Notification, no response needed
                }
                Err(e) => {
                    error!("Error handling message: {}", e);
                }
            }
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle an incoming JSON-RPC message
    pub async fn handle_message(&mut self, message: &str) -> Result<Option<JsonRpcResponse>> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                return Ok(Some(JsonRpcResponse::error(
                    RequestId::Number(0),
                    JsonRpcError::parse_error(e.to_string()),
                )));
            }
        };
        debug!(method = %request.method, "Request");

        if request.method == methods::INITIALIZED {
            self.initialized = true;
            return Ok(None);
        }

        let Some(id) = request.id.clone() else {
            debug!(method = %request.method, "Ignoring notification");
            return Ok(None);
        };

        let response = match request.method.as_str() {
            methods::INITIALIZE => match self.handle_initialize(&request) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
            },
            methods::PING => JsonRpcResponse::success(id, json!({})),
            methods::LIST_TOOLS => {
                let result = self.handle_list_tools()?;
                JsonRpcResponse::success(id, result)
            }
            methods::CALL_TOOL => {
                let result = self.handle_call_tool(&request).await;
                JsonRpcResponse::success(id, result)
            }
            _ => JsonRpcResponse::error(id, JsonRpcError::method_not_found(&request.method)),
        };

        Ok(Some(response))
    }

    /// Handle initialize request
    fn handle_initialize(&self, request: &JsonRpcRequest) -> Result<Value> {
        if let Some(params) = request.params.as_ref() {
            match serde_json::from_value::<InitializeParams>(params.clone()) {
                Ok(params) => info!(
                    client = %params.client_info.name,
                    version = %params.client_info.version,
                    protocol = %params.protocol_version,
                    "Client connected"
                ),
                Err(e) => debug!("Unparsed initialize params: {}", e),
            }
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request
    fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.tool_handler.list_tools(),
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request
    async fn handle_call_tool(&mut self, request: &JsonRpcRequest) -> Value {
        let params: CallToolParams = match request.params.as_ref() {
            Some(p) => match serde_json::from_value(p.clone()) {
                Ok(params) => params,
                Err(e) => {
                    return result_value(CallToolResult::error(format!(
                        "Invalid tool parameters: {}",
                        e
                    )));
                }
            },
            None => return result_value(CallToolResult::error("Missing tool parameters")),
        };

        let result = self
            .tool_handler
            .call_tool(&params.name, params.arguments)
            .await;
        result_value(result)
    }
}

fn result_value(result: CallToolResult) -> Value {
    serde_json::to_value(&result).unwrap_or_else(|e| {
        json!({
            "content": [{"type": "text", "text": format!("Error: {}", e)}],
            "isError": true
        })
    })
}
