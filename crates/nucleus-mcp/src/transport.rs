//! Pluggable MCP transports.
//!
//! [`TransportConnector`] opens a connection over one [`TransportKind`] and
//! hands back an [`McpPeer`] that speaks raw protocol JSON. The production
//! connector, [`RmcpConnector`], uses the `rmcp` client transports.

use async_trait::async_trait;
use nucleus_core::BoxError;
use rmcp::model::{CallToolRequestParam, GetPromptRequestParam, ReadResourceRequestParam};
use rmcp::service::RunningService;
use rmcp::transport::{SseClientTransport, StreamableHttpClientTransport};
use rmcp::{RoleClient, ServiceExt};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::TransportKind;

/// An initialized MCP session.
///
/// Results are protocol JSON so that callers can normalize them
/// independently of the SDK version.
#[async_trait]
pub trait McpPeer: Send + Sync {
    /// Initialize result: protocol version, capabilities and server info.
    fn server_info(&self) -> Option<Value>;

    /// All tools, across pages.
    async fn list_tools(&self) -> Result<Vec<Value>, BoxError>;

    /// All prompts, across pages.
    async fn list_prompts(&self) -> Result<Vec<Value>, BoxError>;

    /// All resources, across pages.
    async fn list_resources(&self) -> Result<Vec<Value>, BoxError>;

    /// Calls a tool.
    async fn call_tool(&self, name: &str, arguments: Option<Map<String, Value>>) -> Result<Value, BoxError>;

    /// Fetches a prompt with string arguments.
    async fn get_prompt(&self, name: &str, arguments: Option<Map<String, Value>>) -> Result<Value, BoxError>;

    /// Reads a resource.
    async fn read_resource(&self, uri: &str) -> Result<Value, BoxError>;

    /// Closes the session.
    async fn close(self: Box<Self>) -> Result<(), BoxError>;
}

/// Opens MCP sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Connects to `url` over `kind` and completes the initialize handshake.
    async fn connect(&self, kind: TransportKind, url: &str) -> Result<Box<dyn McpPeer>, BoxError>;
}

/// Connector backed by the `rmcp` Streamable-HTTP and SSE client transports.
#[derive(Debug, Clone, Copy, Default)]
pub struct RmcpConnector;

#[async_trait]
impl TransportConnector for RmcpConnector {
    async fn connect(&self, kind: TransportKind, url: &str) -> Result<Box<dyn McpPeer>, BoxError> {
        let service = match kind {
            TransportKind::StreamableHttp => {
                let transport = StreamableHttpClientTransport::from_uri(url.to_string());
                ().serve(transport).await?
            }
            TransportKind::Sse => {
                let transport = SseClientTransport::start(url.to_string()).await?;
                ().serve(transport).await?
            }
        };
        Ok(Box::new(RmcpPeer { service }))
    }
}

/// A live `rmcp` client session.
struct RmcpPeer {
    service: RunningService<RoleClient, ()>,
}

impl std::fmt::Debug for RmcpPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RmcpPeer")
            .field("service", &"RunningService{..}")
            .finish()
    }
}

fn to_wire<T: Serialize>(value: &T) -> Result<Value, BoxError> {
    Ok(serde_json::to_value(value)?)
}

fn all_to_wire<T: Serialize>(values: &[T]) -> Result<Vec<Value>, BoxError> {
    values.iter().map(to_wire).collect()
}

#[async_trait]
impl McpPeer for RmcpPeer {
    fn server_info(&self) -> Option<Value> {
        self.service
            .peer_info()
            .and_then(|info| serde_json::to_value(info).ok())
    }

    async fn list_tools(&self) -> Result<Vec<Value>, BoxError> {
        all_to_wire(&self.service.list_all_tools().await?)
    }

    async fn list_prompts(&self) -> Result<Vec<Value>, BoxError> {
        all_to_wire(&self.service.list_all_prompts().await?)
    }

    async fn list_resources(&self) -> Result<Vec<Value>, BoxError> {
        all_to_wire(&self.service.list_all_resources().await?)
    }

    async fn call_tool(&self, name: &str, arguments: Option<Map<String, Value>>) -> Result<Value, BoxError> {
        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: std::borrow::Cow::Owned(name.to_owned()),
                arguments,
            })
            .await?;
        to_wire(&result)
    }

    async fn get_prompt(&self, name: &str, arguments: Option<Map<String, Value>>) -> Result<Value, BoxError> {
        let result = self
            .service
            .get_prompt(GetPromptRequestParam {
                name: name.to_owned(),
                arguments,
            })
            .await?;
        to_wire(&result)
    }

    async fn read_resource(&self, uri: &str) -> Result<Value, BoxError> {
        let result = self
            .service
            .read_resource(ReadResourceRequestParam {
                uri: uri.to_owned(),
            })
            .await?;
        to_wire(&result)
    }

    async fn close(self: Box<Self>) -> Result<(), BoxError> {
        self.service.cancel().await?;
        Ok(())
    }
}
