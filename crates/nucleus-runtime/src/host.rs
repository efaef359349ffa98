//! Transport for calls prepared by bound functions.

use async_trait::async_trait;
use nucleus_abi::Method;
use nucleus_core::{Error, NucleusId, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

/// Sends encoded calls to a nucleus and returns the encoded reply.
///
/// All implementations must be `Send + Sync` so a session can be driven from
/// any Tokio task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NucleusHost: Send + Sync {
    /// Calls `endpoint` with a SCALE-encoded `payload`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call cannot be delivered or the nucleus
    /// rejects it.
    async fn request(&self, method: Method, endpoint: &str, payload: &[u8]) -> Result<Vec<u8>>;
}

/// JSON-RPC host using `nucleus_get` and `nucleus_post`.
///
/// # Examples
///
/// ```
/// use nucleus_abi::Method;
/// use nucleus_core::NucleusId;
/// use nucleus_runtime::RpcNucleusHost;
///
/// let host = RpcNucleusHost::new("http://localhost:9944", NucleusId::new("n1"));
/// assert_eq!(host.rpc_method(Method::Get).unwrap(), "nucleus_get");
/// assert!(host.rpc_method(Method::Callback).is_err());
/// ```
#[derive(Debug)]
pub struct RpcNucleusHost {
    http: reqwest::Client,
    rpc_url: String,
    nucleus: NucleusId,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcNucleusHost {
    /// Creates a host for `nucleus` behind `rpc_url`.
    #[must_use]
    pub fn new(rpc_url: impl Into<String>, nucleus: NucleusId) -> Self {
        Self::with_client(reqwest::Client::new(), rpc_url, nucleus)
    }

    /// Creates a host reusing an existing `reqwest` client.
    #[must_use]
    pub fn with_client(http: reqwest::Client, rpc_url: impl Into<String>, nucleus: NucleusId) -> Self {
        Self {
            http,
            rpc_url: rpc_url.into(),
            nucleus,
            next_id: AtomicU64::new(1),
        }
    }

    /// Target nucleus.
    #[must_use]
    pub const fn nucleus(&self) -> &NucleusId {
        &self.nucleus
    }

    /// RPC method that carries calls of `method`.
    ///
    /// # Errors
    ///
    /// Returns error for `init` and `callback`, which only the chain invokes.
    pub fn rpc_method(&self, method: Method) -> Result<&'static str> {
        match method {
            Method::Get => Ok("nucleus_get"),
            Method::Post => Ok("nucleus_post"),
            Method::Init | Method::Callback => Err(Error::InvalidArgument(format!(
                "{method} functions are invoked by the chain, not through RPC"
            ))),
        }
    }

    fn http_error(&self, message: String, source: Option<reqwest::Error>) -> Error {
        Error::Http {
            url: self.rpc_url.clone(),
            message,
            source: source.map(|e| Box::new(e) as _),
        }
    }
}

#[async_trait]
impl NucleusHost for RpcNucleusHost {
    async fn request(&self, method: Method, endpoint: &str, payload: &[u8]) -> Result<Vec<u8>> {
        let rpc_method = self.rpc_method(method)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": rpc_method,
            "params": [self.nucleus.as_str(), endpoint, format!("0x{}", hex::encode(payload))],
        });
        tracing::debug!(rpc_method, endpoint, bytes = payload.len(), "sending nucleus call");

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.http_error(e.to_string(), Some(e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.http_error(format!("unexpected status {status}"), None));
        }
        let reply: RpcResponse = response
            .json()
            .await
            .map_err(|e| self.http_error(format!("invalid response body: {e}"), Some(e)))?;

        decode_reply(reply)
    }
}

fn decode_reply(reply: RpcResponse) -> Result<Vec<u8>> {
    if let Some(error) = reply.error {
        return Err(Error::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    match reply.result {
        Some(Value::String(text)) => hex::decode(text.trim_start_matches("0x")).map_err(|e| {
            Error::SerializationError {
                message: format!("RPC result is not hex: {e}"),
                source: None,
            }
        }),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(Error::SerializationError {
            message: format!("RPC result is not a hex string: {other}"),
            source: None,
        }),
    }
}
