//! MCP capability types.
//!
//! Listings arrive as raw protocol JSON and are normalized here, so missing
//! optional fields get their documented defaults regardless of which server
//! sent them.
//!
//! # Examples
//!
//! ```
//! use nucleus_mcp::types::Tool;
//! use serde_json::json;
//!
//! let tool = Tool::from_wire(json!({"name": "search"})).unwrap();
//! assert_eq!(tool.description, "");
//! assert_eq!(tool.input_schema.schema_type, "object");
//! assert!(tool.input_schema.required.is_empty());
//! ```

use nucleus_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Wire transport of an MCP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    /// Streamable HTTP.
    #[serde(rename = "streamable-http")]
    StreamableHttp,
    /// Server-sent events.
    #[serde(rename = "sse")]
    Sse,
}

impl TransportKind {
    /// Transports in the order `connect` tries them.
    pub const PRIORITY: [Self; 2] = [Self::StreamableHttp, Self::Sse];

    /// Returns the transport name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StreamableHttp => "streamable-http",
            Self::Sse => "sse",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "streamable-http" => Ok(Self::StreamableHttp),
            "sse" => Ok(Self::Sse),
            other => Err(Error::InvalidArgument(format!(
                "unknown transport '{other}' (expected: streamable-http or sse)"
            ))),
        }
    }
}

/// Result of a successful `connect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    /// Endpoint connected to.
    pub server_url: String,
    /// Transport that succeeded.
    pub transport: TransportKind,
    /// Always `true` for a live connection.
    pub connected: bool,
    /// Client-minted identifier of this connection.
    pub session_id: Option<String>,
}

/// Normalized JSON schema of tool input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSchema {
    /// Schema type, `object` unless the server says otherwise.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property schemas.
    pub properties: Map<String, Value>,
    /// Required property names.
    pub required: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

impl InputSchema {
    fn normalize(schema: Option<&Value>) -> Self {
        let Some(schema) = schema else {
            return Self::default();
        };
        Self {
            schema_type: schema
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("object")
                .to_string(),
            properties: schema
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            required: schema
                .get("required")
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// A tool offered by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tool {
    /// Tool name.
    pub name: String,
    /// Display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description, empty when the server gives none.
    pub description: String,
    /// Input schema.
    pub input_schema: InputSchema,
    /// Output schema, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_schema: Option<Value>,
    #[serde(default)]
    output_schema: Option<Value>,
}

impl Tool {
    /// Normalizes a tool listing entry.
    ///
    /// # Errors
    ///
    /// Returns error if the entry has no name.
    pub fn from_wire(value: Value) -> Result<Self> {
        let wire: WireTool = from_wire(value, "tool")?;
        Ok(Self {
            input_schema: InputSchema::normalize(wire.input_schema.as_ref()),
            name: wire.name,
            title: wire.title,
            description: wire.description.unwrap_or_default(),
            output_schema: wire.output_schema,
        })
    }
}

/// A prompt argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument must be given; `false` when unspecified.
    #[serde(default)]
    pub required: bool,
}

/// A prompt offered by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Prompt name.
    pub name: String,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arguments.
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

impl Prompt {
    /// Normalizes a prompt listing entry.
    ///
    /// # Errors
    ///
    /// Returns error if the entry has no name.
    pub fn from_wire(value: Value) -> Result<Self> {
        from_wire(value, "prompt")
    }
}

/// A resource offered by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Resource URI.
    pub uri: String,
    /// Resource name.
    pub name: String,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Resource {
    /// Normalizes a resource listing entry.
    ///
    /// # Errors
    ///
    /// Returns error if the entry has no URI or name.
    pub fn from_wire(value: Value) -> Result<Self> {
        from_wire(value, "resource")
    }
}

/// Server identity and capabilities from the initialize handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Negotiated protocol version.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Advertised capabilities.
    #[serde(default)]
    pub capabilities: Map<String, Value>,
    /// Server implementation name and version.
    #[serde(default)]
    pub server_info: Option<Implementation>,
    /// Usage instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Name and version of an MCP implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Implementation name.
    pub name: String,
    /// Implementation version.
    #[serde(default)]
    pub version: String,
}

impl ServerInfo {
    /// Returns `true` if the server advertises `capability`, e.g. `tools`.
    #[must_use]
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities
            .get(capability)
            .is_some_and(|value| !value.is_null())
    }
}

fn from_wire<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::SerializationError {
        message: format!("malformed {what} listing entry: {e}"),
        source: Some(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_normalization() {
        let tool = Tool::from_wire(json!({
            "name": "search",
            "title": "Search",
            "description": "Find things",
            "inputSchema": {
                "type": "object",
                "properties": {"q": {"type": "string"}},
                "required": ["q", 3]
            },
            "outputSchema": {"type": "object"}
        }))
        .unwrap();
        assert_eq!(tool.title.as_deref(), Some("Search"));
        assert_eq!(tool.input_schema.required, vec!["q"]);
        assert!(tool.input_schema.properties.contains_key("q"));
        assert!(tool.output_schema.is_some());
    }

    #[test]
    fn test_tool_without_name_is_rejected() {
        assert!(Tool::from_wire(json!({"description": "x"})).is_err());
    }

    #[test]
    fn test_prompt_argument_required_defaults_to_false() {
        let prompt = Prompt::from_wire(json!({
            "name": "summarize",
            "arguments": [{"name": "text"}, {"name": "style", "required": true}]
        }))
        .unwrap();
        assert!(!prompt.arguments[0].required);
        assert!(prompt.arguments[1].required);
    }

    #[test]
    fn test_resource_mime_type() {
        let resource = Resource::from_wire(json!({
            "uri": "file:///a.txt", "name": "a", "mimeType": "text/plain"
        }))
        .unwrap();
        assert_eq!(resource.mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_transport_names() {
        assert_eq!(TransportKind::Sse.to_string(), "sse");
        assert_eq!(
            "streamable-http".parse::<TransportKind>().unwrap(),
            TransportKind::StreamableHttp
        );
        assert_eq!(serde_json::to_value(TransportKind::Sse).unwrap(), json!("sse"));
        assert!("ws".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_server_info_capabilities() {
        let info: ServerInfo = serde_json::from_value(json!({
            "protocolVersion": "2025-03-26",
            "capabilities": {"tools": {}, "prompts": null},
            "serverInfo": {"name": "demo", "version": "1.0"}
        }))
        .unwrap();
        assert!(info.supports("tools"));
        assert!(!info.supports("prompts"));
        assert!(!info.supports("resources"));
        assert_eq!(info.server_info.unwrap().name, "demo");
    }
}
