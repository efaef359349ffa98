//! Integration tests for the MCP client over a scripted connector.

use async_trait::async_trait;
use nucleus_core::{BoxError, Error, RetryPolicy};
use nucleus_mcp::{
    ClientState, HealthChecker, McpClient, McpPeer, ServerStatus, TransportConnector, TransportKind,
};
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};

/// A server that only speaks the listed transports.
#[derive(Debug, Default)]
struct ScriptedServer {
    transports: Vec<TransportKind>,
    tried: Mutex<Vec<TransportKind>>,
}

impl ScriptedServer {
    fn speaking(transports: &[TransportKind]) -> Arc<Self> {
        Arc::new(Self {
            transports: transports.to_vec(),
            tried: Mutex::new(Vec::new()),
        })
    }

    fn tried(&self) -> Vec<TransportKind> {
        self.tried.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportConnector for ScriptedServer {
    async fn connect(&self, kind: TransportKind, url: &str) -> Result<Box<dyn McpPeer>, BoxError> {
        self.tried.lock().unwrap().push(kind);
        if self.transports.contains(&kind) {
            Ok(Box::new(EchoPeer))
        } else {
            Err(format!("{url}: HTTP 405 Method Not Allowed").into())
        }
    }
}

#[derive(Debug)]
struct EchoPeer;

#[async_trait]
impl McpPeer for EchoPeer {
    fn server_info(&self) -> Option<Value> {
        Some(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {"listChanged": false}, "resources": {}},
            "serverInfo": {"name": "echo-server", "version": "2.1.0"},
            "instructions": "Echoes its input"
        }))
    }

    async fn list_tools(&self) -> Result<Vec<Value>, BoxError> {
        Ok(vec![json!({
            "name": "echo",
            "description": "Echo a message",
            "inputSchema": {"type": "object", "properties": {"message": {"type": "string"}}, "required": ["message"]}
        })])
    }

    async fn list_prompts(&self) -> Result<Vec<Value>, BoxError> {
        Err("method not found".into())
    }

    async fn list_resources(&self) -> Result<Vec<Value>, BoxError> {
        Ok(vec![json!({"uri": "echo://last", "name": "last", "mimeType": "text/plain"})])
    }

    async fn call_tool(&self, name: &str, arguments: Option<Map<String, Value>>) -> Result<Value, BoxError> {
        let message = arguments.unwrap_or_default().remove("message").unwrap_or(Value::Null);
        match name {
            "echo" => Ok(json!({
                "content": [{"type": "text", "text": message}],
                "isError": false
            })),
            other => Err(format!("unknown tool {other}").into()),
        }
    }

    async fn get_prompt(&self, name: &str, _: Option<Map<String, Value>>) -> Result<Value, BoxError> {
        Err(format!("unknown prompt {name}").into())
    }

    async fn read_resource(&self, uri: &str) -> Result<Value, BoxError> {
        Ok(json!({"contents": [{"uri": uri, "text": "hello"}]}))
    }

    async fn close(self: Box<Self>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// An SSE-only server is reached after Streamable-HTTP is rejected.
#[tokio::test]
async fn test_sse_only_server() {
    let server = ScriptedServer::speaking(&[TransportKind::Sse]);
    let mut client = McpClient::with_connector(server.clone());

    let info = client.connect("http://localhost:4000/sse").await.unwrap();
    assert_eq!(info.transport, TransportKind::Sse);
    assert_eq!(server.tried(), [TransportKind::StreamableHttp, TransportKind::Sse]);

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].input_schema.required, ["message"]);

    let result = client.call_tool("echo", json!({"message": "hi"})).await.unwrap();
    assert_eq!(result["content"][0]["text"], "hi");
}

/// A server speaking both transports is reached over Streamable-HTTP alone.
#[tokio::test]
async fn test_streamable_http_wins() {
    let server = ScriptedServer::speaking(&[TransportKind::Sse, TransportKind::StreamableHttp]);
    let mut client = McpClient::with_connector(server.clone());
    client.connect("http://localhost:4000/mcp").await.unwrap();
    assert_eq!(server.tried(), [TransportKind::StreamableHttp]);
}

#[tokio::test]
async fn test_unreachable_server_reports_every_attempt() {
    let server = ScriptedServer::speaking(&[]);
    let mut client = McpClient::with_connector(server);
    let err = client.connect("http://localhost:4000/mcp").await.unwrap_err();

    assert!(err.is_transport_error());
    let message = err.to_string();
    assert!(message.contains("http://localhost:4000/mcp"), "{message}");
    assert_eq!(client.state(), ClientState::Disconnected);
}

#[tokio::test]
async fn test_capabilities_and_lenient_listings() {
    let mut client = McpClient::with_connector(ScriptedServer::speaking(&[TransportKind::StreamableHttp]));
    client.connect("http://localhost:4000/mcp").await.unwrap();

    let info = client.get_server_capabilities().unwrap();
    assert!(info.supports("tools"));
    assert!(!info.supports("prompts"));
    assert_eq!(info.instructions.as_deref(), Some("Echoes its input"));

    assert!(client.list_prompts().await.unwrap().is_empty());
    let resources = client.list_resources().await.unwrap();
    assert_eq!(resources[0].mime_type.as_deref(), Some("text/plain"));

    let err = client.get_prompt("summary", None).await.unwrap_err();
    assert!(matches!(err, Error::Prompt { ref prompt, .. } if prompt == "summary"));
    let contents = client.read_resource("echo://last").await.unwrap();
    assert_eq!(contents["contents"][0]["text"], "hello");
}

#[tokio::test]
async fn test_reconnect_replaces_connection() {
    let mut client = McpClient::with_connector(ScriptedServer::speaking(&[TransportKind::StreamableHttp]));
    let first = client.connect("http://localhost:4000/mcp").await.unwrap();
    let second = client.connect("http://localhost:4001/mcp").await.unwrap();
    assert_ne!(first.session_id, second.session_id);
    assert_eq!(client.connection_info().unwrap().server_url, "http://localhost:4001/mcp");
}

#[tokio::test]
async fn test_health_check_over_sse() {
    let checker = HealthChecker::with_connector(
        ScriptedServer::speaking(&[TransportKind::Sse]),
        RetryPolicy::new(1, 10),
    );
    let report = checker.check("http://localhost:4000/sse").await;
    assert_eq!(report.status, ServerStatus::Available);
    assert_eq!(report.transport, Some(TransportKind::Sse));
    assert_eq!(report.tool_count, Some(1));
}
