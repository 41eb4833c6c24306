//! MCP server: request dispatch and the stdio serve loop

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::error::{McpError, McpResult};
use crate::jsonrpc::{
    error_response, success_response, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
    JSONRPC_VERSION,
};
use crate::mcp::{
    Implementation, InitializeRequest, InitializeResponse, ServerCapabilities, ToolsCallRequest,
    ToolsCallResponse, ToolsCapability, ToolsListRequest, ToolsListResponse,
    LATEST_PROTOCOL_VERSION, METHOD_INITIALIZE, METHOD_PING, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
    SUPPORTED_PROTOCOL_VERSIONS,
};
use valtown_client::ValTownClient;

pub const SERVER_NAME: &str = "valtown-mcp";

/// MCP server bridging tool requests to Val Town.
///
/// Owns an injected [`ValTownClient`]; no process-wide state, so several
/// servers can coexist (notably under test).
pub struct McpServer {
    client: ValTownClient,
}

impl McpServer {
    pub fn new(client: ValTownClient) -> Self {
        Self { client }
    }

    /// Process a single JSON-RPC message.
    ///
    /// Returns `Ok(None)` for notifications. A parse failure is an `Err` so
    /// the serve loop can answer with a parse error carrying a synthesized
    /// id.
    pub async fn process_message(&self, body: &[u8]) -> McpResult<Option<JsonRpcResponse>> {
        let request: JsonRpcRequest = serde_json::from_slice(body).map_err(|e| {
            warn!("failed to parse JSON-RPC request: {}", e);
            McpError::Serialization(e)
        })?;

        debug!(method = %request.method, "processing request");

        if request.jsonrpc != JSONRPC_VERSION {
            return Ok(Some(error_response(
                request.id,
                JsonRpcError::invalid_request()
                    .with_data(serde_json::json!({ "message": "Invalid JSON-RPC version" })),
            )));
        }

        // Requests without an id are notifications; nothing to answer.
        if request.id.is_none() {
            debug!(method = %request.method, "notification, ignoring");
            return Ok(None);
        }

        let handled = match request.method.as_str() {
            METHOD_INITIALIZE => self.handle_initialize(&request),
            METHOD_PING => Ok(Self::handle_ping(&request)),
            METHOD_TOOLS_LIST => self.handle_tools_list(&request).await,
            METHOD_TOOLS_CALL => self.handle_tools_call(&request).await,
            other => Ok(error_response(
                request.id.clone(),
                JsonRpcError::method_not_found()
                    .with_data(serde_json::json!({ "method": other })),
            )),
        };

        // Handler errors keep the request's id; only messages that never
        // parsed get a synthesized one (in the serve loop).
        let response = handled.unwrap_or_else(|e| {
            error!(method = %request.method, "request failed: {}", e);
            error_response(request.id.clone(), e.to_jsonrpc_error())
        });

        Ok(Some(response))
    }

    /// Handle the `initialize` handshake: echo a supported protocol version
    /// or answer with the latest one, and advertise the tools capability.
    fn handle_initialize(&self, request: &JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        let params = request.params.as_ref().ok_or_else(|| {
            McpError::InvalidArguments("Missing params for initialize".to_string())
        })?;

        let init: InitializeRequest = serde_json::from_value(params.clone())
            .map_err(|e| McpError::InvalidArguments(format!("Bad initialize params: {}", e)))?;

        if let Some(client_info) = &init.client_info {
            debug!(client = %client_info.name, version = %client_info.version, "client connected");
        }

        let protocol_version =
            if SUPPORTED_PROTOCOL_VERSIONS.contains(&init.protocol_version.as_str()) {
                init.protocol_version
            } else {
                LATEST_PROTOCOL_VERSION.to_string()
            };

        let response = InitializeResponse {
            protocol_version,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: None }),
            },
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Val Town MCP Bridge".to_string()),
            },
            instructions: Some("Forwards tool calls to vals deployed on Val Town".to_string()),
        };

        Ok(success_response(request.id.clone(), serde_json::to_value(response)?))
    }

    fn handle_ping(request: &JsonRpcRequest) -> JsonRpcResponse {
        success_response(request.id.clone(), serde_json::json!({}))
    }

    /// Handle `tools/list`: refetch the remote catalog and relay it.
    ///
    /// A catalog transport failure is the one downstream error allowed to
    /// surface on the channel, as a JSON-RPC error response.
    async fn handle_tools_list(&self, request: &JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        let _params: ToolsListRequest = match &request.params {
            Some(params) => serde_json::from_value(params.clone())
                .map_err(|e| McpError::InvalidArguments(format!("Bad tools/list params: {}", e)))?,
            None => ToolsListRequest::default(),
        };

        let tools = self.client.list_tools().await?;
        info!(tools = tools.len(), "relaying tool catalog");

        let response = ToolsListResponse { tools, next_cursor: None };
        Ok(success_response(request.id.clone(), serde_json::to_value(response)?))
    }

    /// Handle `tools/call`: forward to the per-tool endpoint and relay the
    /// outcome. Downstream failures come back as in-band call results,
    /// never as JSON-RPC errors.
    async fn handle_tools_call(&self, request: &JsonRpcRequest) -> McpResult<JsonRpcResponse> {
        let params = request.params.as_ref().ok_or_else(|| {
            McpError::InvalidArguments("Missing params for tools/call".to_string())
        })?;

        let call: ToolsCallRequest = serde_json::from_value(params.clone())
            .map_err(|e| McpError::InvalidArguments(format!("Bad tools/call params: {}", e)))?;

        info!(tool = %call.name, "forwarding tool invocation");

        // Absent arguments are an empty mapping, never a null body.
        let arguments = call.arguments.unwrap_or_else(|| Value::Object(Default::default()));
        let outcome = self.client.call_tool(&call.name, &arguments).await?;
        if outcome.is_failure() {
            debug!(tool = %call.name, "invocation reported an in-band failure");
        }

        let response = ToolsCallResponse::from(outcome);
        Ok(success_response(request.id.clone(), serde_json::to_value(response)?))
    }
}

/// Serve MCP over stdio, one JSON-RPC message per line.
///
/// Responses are flushed per message so the host transport never waits on
/// a buffer. Runs until stdin closes or an I/O error occurs.
pub async fn serve_stdio(server: McpServer) -> McpResult<()> {
    info!("starting Val Town MCP server (stdio)");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // MCP does not support JSON-RPC batching.
        if trimmed.starts_with('[') {
            warn!("rejecting batch request");
            let response = error_response(
                None,
                JsonRpcError::invalid_request().with_data(
                    serde_json::json!({ "message": "Batch requests are not supported" }),
                ),
            );
            write_response(&mut stdout, &response).await?;
            continue;
        }

        match server.process_message(trimmed.as_bytes()).await {
            Ok(Some(response)) => write_response(&mut stdout, &response).await?,
            Ok(None) => {}
            Err(e) => {
                error!("error processing message: {}", e);
                let rpc_error = match &e {
                    McpError::Serialization(_) => JsonRpcError::parse_error()
                        .with_data(serde_json::json!({ "details": e.to_string() })),
                    _ => e.to_jsonrpc_error(),
                };
                let response = error_response(Some(RequestId::new_uuid()), rpc_error);
                write_response(&mut stdout, &response).await?;
            }
        }
    }

    info!("stdio transport closed");
    Ok(())
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &JsonRpcResponse,
) -> McpResult<()> {
    let mut payload = serde_json::to_vec(response)?;
    payload.push(b'\n');
    stdout.write_all(&payload).await?;
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND};
    use httpmock::prelude::*;
    use serde_json::json;
    use valtown_client::BridgeConfig;

    fn server_for(mock: &MockServer) -> McpServer {
        let config = BridgeConfig::new(
            &mock.url("/catalog"),
            &format!("{}/tools/{{name}}", mock.base_url()),
        )
        .unwrap();
        McpServer::new(ValTownClient::new(config))
    }

    fn unreachable_server() -> McpServer {
        let config =
            BridgeConfig::new("http://127.0.0.1:9/catalog", "http://127.0.0.1:9/tools/{name}")
                .unwrap();
        McpServer::new(ValTownClient::new(config))
    }

    async fn roundtrip(server: &McpServer, request: Value) -> JsonRpcResponse {
        server
            .process_message(request.to_string().as_bytes())
            .await
            .expect("handler error")
            .expect("expected a response")
    }

    #[tokio::test]
    async fn initialize_echoes_a_supported_protocol_version() {
        let mock = MockServer::start_async().await;
        let server = server_for(&mock);

        let response = roundtrip(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "inspector", "version": "1.0.0" }
                }
            }),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn initialize_answers_unknown_versions_with_the_latest() {
        let mock = MockServer::start_async().await;
        let server = server_for(&mock);

        let response = roundtrip(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": { "protocolVersion": "1999-01-01" }
            }),
        )
        .await;

        assert_eq!(response.result.unwrap()["protocolVersion"], LATEST_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn ping_answers_an_empty_object() {
        let mock = MockServer::start_async().await;
        let server = server_for(&mock);

        let response =
            roundtrip(&server, json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" })).await;
        assert_eq!(response.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn unknown_methods_are_method_not_found() {
        let mock = MockServer::start_async().await;
        let server = server_for(&mock);

        let response =
            roundtrip(&server, json!({ "jsonrpc": "2.0", "id": 3, "method": "resources/list" }))
                .await;
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_jsonrpc_version_is_an_invalid_request() {
        let mock = MockServer::start_async().await;
        let server = server_for(&mock);

        let response =
            roundtrip(&server, json!({ "jsonrpc": "1.0", "id": 4, "method": "ping" })).await;
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let mock = MockServer::start_async().await;
        let server = server_for(&mock);

        let outcome = server
            .process_message(
                json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })
                    .to_string()
                    .as_bytes(),
            )
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn unparseable_messages_are_errors_for_the_serve_loop() {
        let mock = MockServer::start_async().await;
        let server = server_for(&mock);

        let outcome = server.process_message(b"{ not json").await;
        assert!(matches!(outcome, Err(McpError::Serialization(_))));
    }

    #[tokio::test]
    async fn tools_list_relays_the_remote_catalog() {
        let mock = MockServer::start_async().await;
        mock.mock_async(|when, then| {
            when.method(GET).path("/catalog");
            then.status(200).json_body(json!({
                "tools": [{ "name": "echo", "description": "Echoes its input" }]
            }));
        })
        .await;
        let server = server_for(&mock);

        let response =
            roundtrip(&server, json!({ "jsonrpc": "2.0", "id": 5, "method": "tools/list" })).await;

        let result = response.result.unwrap();
        assert_eq!(
            result["tools"],
            json!([{ "name": "echo", "description": "Echoes its input" }])
        );
    }

    #[tokio::test]
    async fn tools_list_transport_failure_surfaces_on_the_channel() {
        let server = unreachable_server();

        let response =
            roundtrip(&server, json!({ "jsonrpc": "2.0", "id": 6, "method": "tools/list" })).await;

        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, INTERNAL_ERROR);
        assert!(matches!(response.id, Some(RequestId::Number(6))));
    }

    #[tokio::test]
    async fn tools_call_relays_a_successful_payload() {
        let mock = MockServer::start_async().await;
        let endpoint = mock
            .mock_async(|when, then| {
                when.method(POST).path("/tools/echo").json_body(json!({ "message": "hi" }));
                then.status(200).json_body(json!({ "result": 42 }));
            })
            .await;
        let server = server_for(&mock);

        let response = roundtrip(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": { "name": "echo", "arguments": { "message": "hi" } }
            }),
        )
        .await;

        endpoint.assert_async().await;
        let result = response.result.unwrap();
        assert_eq!(result["structuredContent"], 42);
        assert_eq!(result["content"][0]["text"], "42");
        assert!(result.get("isError").is_none());
    }

    #[tokio::test]
    async fn tools_call_defaults_missing_arguments_to_an_empty_mapping() {
        let mock = MockServer::start_async().await;
        let endpoint = mock
            .mock_async(|when, then| {
                when.method(POST).path("/tools/echo").json_body(json!({}));
                then.status(200).json_body(json!({ "result": "ok" }));
            })
            .await;
        let server = server_for(&mock);

        roundtrip(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 8,
                "method": "tools/call",
                "params": { "name": "echo" }
            }),
        )
        .await;

        endpoint.assert_async().await;
    }

    #[tokio::test]
    async fn tools_call_failures_are_in_band_results_not_channel_errors() {
        let server = unreachable_server();

        let response = roundtrip(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 9,
                "method": "tools/call",
                "params": { "name": "echo" }
            }),
        )
        .await;

        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(
            result["content"][0]["text"],
            "Tool 'echo' is not available or has not been deployed"
        );
        assert_eq!(result["structuredContent"]["kind"], "unreachable");
    }

    #[tokio::test]
    async fn tools_call_remote_errors_stay_in_band() {
        let mock = MockServer::start_async().await;
        mock.mock_async(|when, then| {
            when.method(POST).path("/tools/echo");
            then.status(200).json_body(json!({ "error": "bad input" }));
        })
        .await;
        let server = server_for(&mock);

        let response = roundtrip(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 10,
                "method": "tools/call",
                "params": { "name": "echo", "arguments": {} }
            }),
        )
        .await;

        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Val Town execution error: bad input");
    }

    #[tokio::test]
    async fn tools_call_rejects_invalid_names_as_invalid_params() {
        let mock = MockServer::start_async().await;
        let server = server_for(&mock);

        let response = roundtrip(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 11,
                "method": "tools/call",
                "params": { "name": "not a host" }
            }),
        )
        .await;

        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn tools_call_without_params_is_invalid() {
        let mock = MockServer::start_async().await;
        let server = server_for(&mock);

        let response =
            roundtrip(&server, json!({ "jsonrpc": "2.0", "id": 12, "method": "tools/call" }))
                .await;

        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }
}
