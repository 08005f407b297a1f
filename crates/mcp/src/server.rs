// MCP server: JSON-RPC dispatch and the newline-delimited stdio transport

use crate::codec::{Frame, FrameCodec};
use crate::protocol::{
    negotiate_protocol_version, CallToolParams, CallToolResult, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities, ServerInfo,
    ToolsCapability, JSONRPC_VERSION,
};
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use futures_util::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;

/// Maximum size of a single JSON-RPC frame (1 MiB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1_048_576;

pub struct McpServer {
    registry: ToolRegistry,
    server_info: ServerInfo,
    max_line_length: usize,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, server_info: ServerInfo) -> Self {
        Self {
            registry,
            server_info,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Serve over stdin/stdout until stdin closes
    pub async fn start(&self) -> Result<()> {
        tracing::info!(
            "MCP server {} v{} listening on stdio",
            self.server_info.name,
            self.server_info.version
        );
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC messages until the reader hits EOF
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frames = FramedRead::new(reader, FrameCodec::new(self.max_line_length));

        while let Some(frame) = frames.next().await {
            let frame = frame.context("Failed to read from transport")?;
            let response = match frame {
                Frame::Line(line) => self.handle_message(&line).await,
                Frame::Oversized => {
                    tracing::warn!("Dropping frame longer than {} bytes", self.max_line_length);
                    Some(JsonRpcResponse::error(
                        Value::Null,
                        JsonRpcError::parse_error().with_data(Value::String(format!(
                            "message exceeds {} bytes",
                            self.max_line_length
                        ))),
                    ))
                }
                Frame::InvalidUtf8 => {
                    tracing::warn!("Dropping frame that is not valid UTF-8");
                    Some(JsonRpcResponse::error(
                        Value::Null,
                        JsonRpcError::parse_error()
                            .with_data(Value::String("message is not valid UTF-8".to_string())),
                    ))
                }
            };

            if let Some(response) = response {
                write_response(&mut writer, &response).await?;
            }
        }

        tracing::info!("Transport closed, shutting down");
        Ok(())
    }

    /// Handle one raw message; notifications and blank lines produce no response
    pub async fn handle_message(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to parse message: {}", e);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error().with_data(Value::String(e.to_string())),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Invalid JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            tracing::warn!("Unsupported JSON-RPC version {:?}", request.jsonrpc);
            return if request.is_notification() {
                None
            } else {
                Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()))
            };
        }

        self.handle_request(request).await
    }

    /// Dispatch a parsed request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        tracing::debug!(method = %request.method, "Handling request");

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => JsonRpcResponse::success(
                id,
                ListToolsResult {
                    tools: self.registry.list_schemas(),
                },
            ),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            other => {
                tracing::debug!("Method not found: {}", other);
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(other))
            }
        };

        Some(response)
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => tracing::info!("Client initialized"),
            "notifications/cancelled" => {
                tracing::debug!("Ignoring cancellation; requests run to completion")
            }
            other => tracing::debug!("Ignoring notification {}", other),
        }
    }

    fn handle_initialize(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params = match params.map(serde_json::from_value::<InitializeParams>).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing initialize params"))
            }
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)),
                )
            }
        };

        let protocol_version = negotiate_protocol_version(&params.protocol_version);
        match &params.client_info {
            Some(client) => tracing::info!(
                "Initialize from {} v{} (protocol {} -> {})",
                client.name,
                client.version,
                params.protocol_version,
                protocol_version
            ),
            None => tracing::info!(
                "Initialize from unnamed client (protocol {} -> {})",
                params.protocol_version,
                protocol_version
            ),
        }

        JsonRpcResponse::success(
            id,
            InitializeResult {
                protocol_version: protocol_version.to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability { list_changed: false }),
                },
                server_info: self.server_info.clone(),
            },
        )
    }

    async fn handle_call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing tools/call params"));
        };
        let params: CallToolParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)),
                )
            }
        };

        tracing::debug!(tool = %params.name, "Calling tool");

        let result = match self.registry.get(&params.name) {
            Some(tool) => match tool.execute(params.arguments).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!("Tool {} failed: {:#}", params.name, e);
                    CallToolResult::error(format!("{:#}", e))
                }
            },
            None => {
                tracing::warn!("Unknown tool requested: {}", params.name);
                CallToolResult::error(format!("Unknown tool: {}", params.name))
            }
        };

        JsonRpcResponse::success(id, result)
    }
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &JsonRpcResponse) -> Result<()> {
    let mut json = serde_json::to_string(response).context("Failed to serialize response")?;
    json.push('\n');
    writer
        .write_all(json.as_bytes())
        .await
        .context("Failed to write response")?;
    writer.flush().await.context("Failed to flush response")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::LATEST_PROTOCOL_VERSION;
    use fit_common_core::DocumentRouter;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

    fn test_server(root: &Path) -> McpServer {
        let registry = ToolRegistry::with_document_tools(Arc::new(DocumentRouter::new(root)));
        McpServer::new(registry, ServerInfo::default())
    }

    async fn request(server: &McpServer, message: Value) -> Value {
        let response = server
            .handle_message(&message.to_string())
            .await
            .expect("expected a response");
        serde_json::to_value(response).unwrap()
    }

    async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> Value {
        request(
            server,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": {"name": name, "arguments": arguments}
            }),
        )
        .await
    }

    #[tokio::test]
    async fn test_initialize_negotiates_version() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(temp_dir.path());

        let response = request(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "0.0.1"}
                }
            }),
        )
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"], json!({"name": "fit-common", "version": "2.0.0"}));
        assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], false);

        let response = request(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "initialize",
                "params": {"protocolVersion": "2099-01-01", "capabilities": {}}
            }),
        )
        .await;
        assert_eq!(response["result"]["protocolVersion"], LATEST_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(temp_dir.path());

        for method in ["notifications/initialized", "notifications/cancelled", "notifications/other"] {
            let message = json!({"jsonrpc": "2.0", "method": method}).to_string();
            assert!(server.handle_message(&message).await.is_none());
        }
        assert!(server.handle_message("   ").await.is_none());
    }

    #[tokio::test]
    async fn test_null_id_is_handled_as_notification() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(temp_dir.path());

        // MCP request ids must not be null; a null id reads as an absent one
        let message = json!({"jsonrpc": "2.0", "id": null, "method": "ping"}).to_string();
        assert!(server.handle_message(&message).await.is_none());
    }

    #[tokio::test]
    async fn test_tools_list_is_static_catalog() {
        let server = test_server(Path::new("/nonexistent/root"));

        let response = request(&server, json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"})).await;
        let tools = response["result"]["tools"].as_array().unwrap();

        let names: Vec<_> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["load_skill", "read_common", "read_app_doc"]);
        assert_eq!(
            tools[1]["inputSchema"]["properties"]["file"]["enum"],
            json!(["DOMAIN_SPEC", "API_REGISTRY", "PRD", "SPRINT_PLAN"])
        );
    }

    #[tokio::test]
    async fn test_tools_call_returns_document() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("docs")).unwrap();
        std::fs::write(temp_dir.path().join("docs/PRD.md"), "Hello").unwrap();
        let server = test_server(temp_dir.path());

        let response = call_tool(&server, "read_common", json!({"file": "PRD"})).await;

        assert_eq!(response["id"], 7);
        assert_eq!(
            response["result"],
            json!({"content": [{"type": "text", "text": "Hello"}]})
        );
    }

    #[tokio::test]
    async fn test_tools_call_missing_file_is_error_text() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(temp_dir.path());

        let response = call_tool(&server, "read_app_doc", json!({"app": "fit-api", "file": "DATABASE"})).await;

        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error:"), "{text}");
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_error_text() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(temp_dir.path());

        let response = call_tool(&server, "read_secrets", json!({})).await;

        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(response["result"]["content"][0]["text"], "Error: Unknown tool: read_secrets");
    }

    #[tokio::test]
    async fn test_tools_call_without_arguments() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(temp_dir.path());

        let response = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "load_skill"}}),
        )
        .await;

        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error: Invalid arguments for load_skill"), "{text}");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(temp_dir.path());

        let response = serde_json::to_value(server.handle_message("{not json").await.unwrap()).unwrap();
        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["error"]["code"], JsonRpcError::PARSE_ERROR);

        let response = request(&server, json!({"jsonrpc": "2.0", "id": 4})).await;
        assert_eq!(response["id"], 4);
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_REQUEST);

        let response = request(&server, json!({"jsonrpc": "1.0", "id": 5, "method": "ping"})).await;
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_REQUEST);

        let response = request(&server, json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"})).await;
        assert_eq!(response["error"]["code"], JsonRpcError::METHOD_NOT_FOUND);

        let response = request(&server, json!({"jsonrpc": "2.0", "id": 8, "method": "tools/call"})).await;
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_PARAMS);

        let response = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 9, "method": "tools/call", "params": {"arguments": {}}}),
        )
        .await;
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_PARAMS);

        let response = request(&server, json!({"jsonrpc": "2.0", "id": 10, "method": "ping"})).await;
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn test_serve_writes_one_line_per_response() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("skills/fit-api")).unwrap();
        std::fs::write(temp_dir.path().join("skills/fit-api/SKILL.md"), "line one\nline two\n").unwrap();
        let server = test_server(temp_dir.path());

        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2025-03-26", "capabilities": {}}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "load_skill", "arguments": {"skill": "fit-api"}}}),
        ]
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("\n\n");

        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let lines = parse_lines(output);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
        assert_eq!(lines[1]["result"]["content"][0]["text"], "line one\nline two\n");
    }

    fn parse_lines(output: Vec<u8>) -> Vec<Value> {
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_serve_skips_oversized_frames() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(temp_dir.path()).with_max_line_length(64);

        let input = format!(
            "{}\n{}\n{}\n",
            "x".repeat(200),
            "y".repeat(300),
            json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})
        );

        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let lines = parse_lines(output);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert_eq!(lines[1]["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert_eq!(lines[2]["id"], 1);
        assert_eq!(lines[2]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_serve_answers_invalid_utf8_with_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(temp_dir.path());

        let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"p\xffng\"}\n".to_vec();
        input.extend_from_slice(json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}).to_string().as_bytes());
        input.push(b'\n');

        let mut output = Vec::new();
        server.serve(input.as_slice(), &mut output).await.unwrap();

        let lines = parse_lines(output);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], Value::Null);
        assert_eq!(lines[0]["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert_eq!(lines[1]["id"], 2);
        assert_eq!(lines[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_pipelined_request_after_oversized_frame_is_answered() {
        let temp_dir = TempDir::new().unwrap();
        let server = test_server(temp_dir.path()).with_max_line_length(64);

        let (client, transport) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(transport);
        let (client_read, mut client_write) = tokio::io::split(client);

        let client_side = async move {
            // Both frames in one write, and the client keeps its side open
            let input = format!(
                "{}\n{}\n",
                "x".repeat(200),
                json!({"jsonrpc": "2.0", "id": 9, "method": "ping"})
            );
            client_write.write_all(input.as_bytes()).await.unwrap();

            let mut lines = BufReader::new(client_read).lines();
            let mut responses = Vec::new();
            for _ in 0..2 {
                let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
                    .await
                    .expect("response not delivered while the session is open")
                    .unwrap()
                    .unwrap();
                responses.push(serde_json::from_str::<Value>(&line).unwrap());
            }

            client_write.shutdown().await.unwrap();
            responses
        };

        let (served, responses) = tokio::join!(server.serve(server_read, server_write), client_side);
        served.unwrap();

        assert_eq!(responses[0]["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert_eq!(responses[1]["id"], 9);
        assert_eq!(responses[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_stdio_session_over_duplex() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("fit-mobile")).unwrap();
        std::fs::write(temp_dir.path().join("fit-mobile/SCREENS.md"), "# Screens").unwrap();
        let server = test_server(temp_dir.path());

        let (client, transport) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(transport);
        let (mut client_read, mut client_write) = tokio::io::split(client);

        let client_side = async move {
            let messages = [
                json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
                json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "read_app_doc", "arguments": {"app": "fit-mobile", "file": "SCREENS"}}}),
                json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "read_common", "arguments": {"file": "PRD"}}}),
            ];
            for message in messages {
                client_write
                    .write_all(format!("{}\n", message).as_bytes())
                    .await
                    .unwrap();
            }
            client_write.shutdown().await.unwrap();

            let mut output = String::new();
            client_read.read_to_string(&mut output).await.unwrap();
            output
        };

        let (served, output) = tokio::join!(server.serve(server_read, server_write), client_side);
        served.unwrap();

        let responses: Vec<Value> = output.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["result"]["tools"].as_array().unwrap().len(), 3);
        assert_eq!(responses[1]["result"]["content"][0]["text"], "# Screens");
        assert_eq!(responses[2]["result"]["isError"], true);
    }
}
