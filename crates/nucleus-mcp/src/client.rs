//! MCP client with transport fallback.
//!
//! `connect` tries each transport of [`TransportKind::PRIORITY`] in turn and
//! keeps the first that completes the handshake. Data operations need a live
//! connection and fail with [`Error::NotConnected`] otherwise.
//!
//! Prompt and resource listings are lenient: a failing server yields an empty
//! list. Tool listing and every call propagate their errors.

use nucleus_core::{BoxError, Error, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::transport::{McpPeer, RmcpConnector, TransportConnector};
use crate::types::{ConnectionInfo, Prompt, Resource, ServerInfo, Tool, TransportKind};

/// Connection state of an [`McpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No live connection.
    Disconnected,
    /// Connected over the given transport.
    Connected(TransportKind),
}

struct Connection {
    peer: Box<dyn McpPeer>,
    info: ConnectionInfo,
}

/// A client for one MCP server at a time.
///
/// # Examples
///
/// ```no_run
/// use nucleus_mcp::McpClient;
///
/// # async fn example() -> nucleus_core::Result<()> {
/// let mut client = McpClient::new();
/// let info = client.connect("http://localhost:3000/mcp").await?;
/// println!("connected over {}", info.transport);
///
/// for tool in client.list_tools().await? {
///     println!("{}: {}", tool.name, tool.description);
/// }
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct McpClient {
    connector: Arc<dyn TransportConnector>,
    connection: Option<Connection>,
}

impl fmt::Debug for McpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpClient")
            .field("state", &self.state())
            .field(
                "connection",
                &self.connection.as_ref().map(|connection| &connection.info),
            )
            .finish_non_exhaustive()
    }
}

impl Default for McpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl McpClient {
    /// Creates a client using the `rmcp` transports.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(Arc::new(RmcpConnector))
    }

    /// Creates a client using `connector` to open transports.
    #[must_use]
    pub fn with_connector(connector: Arc<dyn TransportConnector>) -> Self {
        Self {
            connector,
            connection: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.connection
            .as_ref()
            .map_or(ClientState::Disconnected, |connection| {
                ClientState::Connected(connection.info.transport)
            })
    }

    /// Returns `true` while connected.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Details of the live connection.
    #[must_use]
    pub fn connection_info(&self) -> Option<&ConnectionInfo> {
        self.connection.as_ref().map(|connection| &connection.info)
    }

    /// Connects to `url`, trying Streamable-HTTP first and SSE second.
    ///
    /// An existing connection is closed first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] with one message per failed attempt if no
    /// transport connects; the client is then disconnected.
    pub async fn connect(&mut self, url: &str) -> Result<ConnectionInfo> {
        if self.is_connected() {
            self.disconnect().await?;
        }

        let mut attempts = Vec::with_capacity(TransportKind::PRIORITY.len());
        let mut last_error: Option<BoxError> = None;
        for kind in TransportKind::PRIORITY {
            debug!(%url, transport = %kind, "trying transport");
            match self.connector.connect(kind, url).await {
                Ok(peer) => {
                    let info = ConnectionInfo {
                        server_url: url.to_string(),
                        transport: kind,
                        connected: true,
                        session_id: Some(Uuid::new_v4().to_string()),
                    };
                    info!(%url, transport = %kind, "connected to MCP server");
                    self.connection = Some(Connection {
                        peer,
                        info: info.clone(),
                    });
                    return Ok(info);
                }
                Err(e) => {
                    warn!(%url, transport = %kind, error = %e, "transport failed");
                    attempts.push(format!("{kind}: {e}"));
                    last_error = Some(e);
                }
            }
        }

        Err(Error::Transport {
            url: url.to_string(),
            attempts,
            source: last_error.unwrap_or_else(|| "no transport available".into()),
        })
    }

    /// Closes the connection, if any. The client is disconnected afterwards
    /// even when closing fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if the transport fails to close cleanly.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };
        info!(url = %connection.info.server_url, "disconnecting from MCP server");
        connection.peer.close().await.map_err(|source| Error::Request {
            operation: "disconnect".to_string(),
            source,
        })
    }

    fn peer(&self) -> Result<&dyn McpPeer> {
        self.connection
            .as_ref()
            .map(|connection| connection.peer.as_ref())
            .ok_or(Error::NotConnected)
    }

    /// Server identity and capabilities from the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a connection.
    pub fn get_server_capabilities(&self) -> Result<ServerInfo> {
        let peer = self.peer()?;
        let Some(raw) = peer.server_info() else {
            return Ok(ServerInfo::default());
        };
        serde_json::from_value(raw).map_err(|e| Error::SerializationError {
            message: "malformed initialize result".to_string(),
            source: Some(e),
        })
    }

    /// Lists the server's tools.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a connection and
    /// [`Error::Request`] if the listing fails.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let raw = self
            .peer()?
            .list_tools()
            .await
            .map_err(|source| Error::Request {
                operation: "tools/list".to_string(),
                source,
            })?;
        raw.into_iter().map(Tool::from_wire).collect()
    }

    /// Lists the server's prompts; a failing listing yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a connection.
    pub async fn list_prompts(&self) -> Result<Vec<Prompt>> {
        match self.peer()?.list_prompts().await {
            Ok(raw) => Ok(normalize_lenient(raw, Prompt::from_wire, "prompt")),
            Err(e) => {
                warn!(error = %e, "listing prompts failed, returning none");
                Ok(Vec::new())
            }
        }
    }

    /// Lists the server's resources; a failing listing yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a connection.
    pub async fn list_resources(&self) -> Result<Vec<Resource>> {
        match self.peer()?.list_resources().await {
            Ok(raw) => Ok(normalize_lenient(raw, Resource::from_wire, "resource")),
            Err(e) => {
                warn!(error = %e, "listing resources failed, returning none");
                Ok(Vec::new())
            }
        }
    }

    /// Calls tool `name` with an argument object (or `null`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a connection,
    /// [`Error::InvalidArgument`] if `args` is not an object, and
    /// [`Error::ToolCall`] if the call fails.
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Value> {
        let peer = self.peer()?;
        let arguments = match args {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "tool arguments must be an object, found {other}"
                )));
            }
        };
        debug!(tool = name, "calling tool");
        peer.call_tool(name, arguments)
            .await
            .map_err(|source| Error::ToolCall {
                tool: name.to_string(),
                source,
            })
    }

    /// Fetches prompt `name`; argument values are sent as strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a connection and
    /// [`Error::Prompt`] if the request fails.
    pub async fn get_prompt(&self, name: &str, args: Option<&Map<String, Value>>) -> Result<Value> {
        let peer = self.peer()?;
        let arguments = args.map(|args| {
            args.iter()
                .map(|(key, value)| (key.clone(), Value::String(stringify(value))))
                .collect()
        });
        peer.get_prompt(name, arguments)
            .await
            .map_err(|source| Error::Prompt {
                prompt: name.to_string(),
                source,
            })
    }

    /// Reads resource `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a connection and
    /// [`Error::ResourceRead`] if the read fails.
    pub async fn read_resource(&self, uri: &str) -> Result<Value> {
        self.peer()?
            .read_resource(uri)
            .await
            .map_err(|source| Error::ResourceRead {
                uri: uri.to_string(),
                source,
            })
    }

    /// Connects, reads the server capabilities and disconnects again.
    ///
    /// The client is disconnected afterwards whatever happened; errors from
    /// closing the connection are ignored.
    ///
    /// # Errors
    ///
    /// Returns the connection or capability error.
    pub async fn test_connection(&mut self, url: &str) -> Result<(ConnectionInfo, ServerInfo)> {
        let outcome = match self.connect(url).await {
            Ok(info) => self.get_server_capabilities().map(|server| (info, server)),
            Err(e) => Err(e),
        };
        if let Err(e) = self.disconnect().await {
            debug!(error = %e, "ignoring disconnect failure after connection test");
        }
        outcome
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn normalize_lenient<T>(raw: Vec<Value>, normalize: fn(Value) -> Result<T>, what: &str) -> Vec<T> {
    raw.into_iter()
        .filter_map(|value| match normalize(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "skipping malformed {what}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransportConnector;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakePeer {
        fail_listings: bool,
        prompt_args: Arc<Mutex<Option<Map<String, Value>>>>,
    }

    #[async_trait]
    impl McpPeer for FakePeer {
        fn server_info(&self) -> Option<Value> {
            Some(json!({
                "protocolVersion": "2025-03-26",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "fake", "version": "0.1.0"}
            }))
        }

        async fn list_tools(&self) -> std::result::Result<Vec<Value>, BoxError> {
            if self.fail_listings {
                return Err("connection reset".into());
            }
            Ok(vec![json!({"name": "echo", "inputSchema": {"type": "object"}})])
        }

        async fn list_prompts(&self) -> std::result::Result<Vec<Value>, BoxError> {
            if self.fail_listings {
                return Err("connection reset".into());
            }
            Ok(vec![json!({"name": "greet"}), json!({"description": "no name"})])
        }

        async fn list_resources(&self) -> std::result::Result<Vec<Value>, BoxError> {
            if self.fail_listings {
                return Err("connection reset".into());
            }
            Ok(vec![json!({"uri": "mem://a", "name": "a"})])
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: Option<Map<String, Value>>,
        ) -> std::result::Result<Value, BoxError> {
            if name == "explode" {
                return Err("tool crashed".into());
            }
            Ok(json!({"content": [], "echo": arguments}))
        }

        async fn get_prompt(
            &self,
            _name: &str,
            arguments: Option<Map<String, Value>>,
        ) -> std::result::Result<Value, BoxError> {
            *self.prompt_args.lock().unwrap() = arguments;
            Ok(json!({"messages": []}))
        }

        async fn read_resource(&self, uri: &str) -> std::result::Result<Value, BoxError> {
            Err(format!("{uri} not found").into())
        }

        async fn close(self: Box<Self>) -> std::result::Result<(), BoxError> {
            Err("already closed".into())
        }
    }

    fn connector(accept: Option<TransportKind>, fail_listings: bool) -> MockTransportConnector {
        let mut connector = MockTransportConnector::new();
        connector.expect_connect().returning(move |kind, _| {
            if Some(kind) == accept {
                Ok(Box::new(FakePeer {
                    fail_listings,
                    ..FakePeer::default()
                }))
            } else {
                Err(format!("{kind} rejected: HTTP 404").into())
            }
        });
        connector
    }

    async fn connected(fail_listings: bool) -> McpClient {
        let mut client = McpClient::with_connector(Arc::new(connector(
            Some(TransportKind::StreamableHttp),
            fail_listings,
        )));
        client.connect("http://localhost:3000/mcp").await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_falls_back_to_sse() {
        let mut client = McpClient::with_connector(Arc::new(connector(Some(TransportKind::Sse), false)));
        let info = client.connect("http://localhost:3000/mcp").await.unwrap();
        assert_eq!(info.transport, TransportKind::Sse);
        assert!(info.connected);
        assert!(info.session_id.is_some());
        assert_eq!(client.state(), ClientState::Connected(TransportKind::Sse));
    }

    #[tokio::test]
    async fn test_prefers_streamable_http() {
        let mut connector = MockTransportConnector::new();
        connector
            .expect_connect()
            .withf(|kind, _| *kind == TransportKind::StreamableHttp)
            .times(1)
            .returning(|_, _| Ok(Box::new(FakePeer::default())));
        let mut client = McpClient::with_connector(Arc::new(connector));
        let info = client.connect("http://localhost:3000/mcp").await.unwrap();
        assert_eq!(info.transport, TransportKind::StreamableHttp);
    }

    #[tokio::test]
    async fn test_all_transports_fail() {
        let mut client = McpClient::with_connector(Arc::new(connector(None, false)));
        let err = client.connect("http://localhost:3000/mcp").await.unwrap_err();
        let Error::Transport { attempts, source, .. } = &err else {
            panic!("expected transport error, got {err:?}");
        };
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].starts_with("streamable-http:"));
        assert!(attempts[1].starts_with("sse:"));
        assert!(source.to_string().contains("sse rejected"));
        assert_eq!(client.state(), ClientState::Disconnected);
    }

    #[tokio::test]
    async fn test_operations_need_connection() {
        let client = McpClient::with_connector(Arc::new(MockTransportConnector::new()));
        assert!(client.list_tools().await.unwrap_err().is_not_connected());
        assert!(client.list_prompts().await.unwrap_err().is_not_connected());
        assert!(client.call_tool("echo", Value::Null).await.unwrap_err().is_not_connected());
        assert!(client.get_server_capabilities().unwrap_err().is_not_connected());
    }

    #[tokio::test]
    async fn test_listing_leniency() {
        let client = connected(true).await;
        assert!(client.list_prompts().await.unwrap().is_empty());
        assert!(client.list_resources().await.unwrap().is_empty());
        let err = client.list_tools().await.unwrap_err();
        assert!(err.is_mcp_call_error());
    }

    #[tokio::test]
    async fn test_listings_normalized() {
        let client = connected(false).await;
        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools[0].name, "echo");
        assert_eq!(tools[0].description, "");
        let prompts = client.list_prompts().await.unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(client.list_resources().await.unwrap()[0].uri, "mem://a");
    }

    #[tokio::test]
    async fn test_call_errors_are_tagged() {
        let client = connected(false).await;
        let err = client.call_tool("explode", json!({})).await.unwrap_err();
        assert!(matches!(&err, Error::ToolCall { tool, .. } if tool == "explode"));
        let err = client.read_resource("mem://b").await.unwrap_err();
        assert!(matches!(&err, Error::ResourceRead { uri, .. } if uri == "mem://b"));
        assert!(client.call_tool("echo", json!([1])).await.is_err());
    }

    #[tokio::test]
    async fn test_prompt_arguments_are_strings() {
        let prompt_args = Arc::new(Mutex::new(None));
        let shared = Arc::clone(&prompt_args);
        let mut connector = MockTransportConnector::new();
        connector.expect_connect().returning(move |_, _| {
            Ok(Box::new(FakePeer {
                fail_listings: false,
                prompt_args: Arc::clone(&shared),
            }))
        });
        let mut client = McpClient::with_connector(Arc::new(connector));
        client.connect("http://localhost:3000/mcp").await.unwrap();

        let args = json!({"count": 3, "name": "x", "flag": true});
        client.get_prompt("greet", args.as_object()).await.unwrap();
        let sent = prompt_args.lock().unwrap().clone().unwrap();
        assert_eq!(Value::Object(sent), json!({"count": "3", "name": "x", "flag": "true"}));
    }

    #[tokio::test]
    async fn test_capabilities() {
        let client = connected(false).await;
        let info = client.get_server_capabilities().unwrap();
        assert!(info.supports("tools"));
        assert_eq!(info.protocol_version.as_deref(), Some("2025-03-26"));
    }

    #[tokio::test]
    async fn test_disconnect_always_disconnects() {
        let mut client = connected(false).await;
        assert!(client.disconnect().await.is_err());
        assert!(!client.is_connected());
        assert!(client.disconnect().await.is_ok());
    }

    #[tokio::test]
    async fn test_connection_test_disconnects() {
        let mut client = McpClient::with_connector(Arc::new(connector(Some(TransportKind::Sse), false)));
        let (info, server) = client.test_connection("http://localhost:3000/sse").await.unwrap();
        assert_eq!(info.transport, TransportKind::Sse);
        assert_eq!(server.server_info.unwrap().name, "fake");
        assert!(!client.is_connected());
    }
}
