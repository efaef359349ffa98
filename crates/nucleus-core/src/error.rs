//! Error types for Nucleus Explorer.
//!
//! Every crate in the workspace reports failures through [`Error`]. Variants
//! carry the context needed to tell which ABI entry, symbol, server or target a
//! failure belongs to.
//!
//! # Examples
//!
//! ```
//! use nucleus_core::{Error, Result};
//!
//! fn require_url(url: &str) -> Result<()> {
//!     if url.is_empty() {
//!         return Err(Error::ConfigError {
//!             message: "url cannot be empty".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = require_url("").unwrap_err();
//! assert!(err.is_config_error());
//! ```

use thiserror::Error;

/// Boxed error used as the source of transport-level failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for Nucleus Explorer.
#[derive(Error, Debug)]
pub enum Error {
    /// An ABI entry could not be turned into source declarations.
    ///
    /// Raised for unresolvable type references, invalid generic arity,
    /// invalid identifiers and entries depending on a skipped entry.
    #[error("Generation failed for '{entry}': {message}")]
    Generation {
        /// Name of the offending ABI entry
        entry: String,
        /// Description of the failure
        message: String,
    },

    /// Two ABI entries share a name.
    #[error("Duplicate symbol '{name}'")]
    DuplicateSymbol {
        /// The name declared more than once
        name: String,
    },

    /// Generated source text could not be parsed.
    #[error("Parse error at {line}:{column}: {message}")]
    Parse {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// Description of the syntax problem
        message: String,
    },

    /// A generated symbol could not be made live.
    #[error("Binding '{symbol}' failed in {pass} pass: {message}")]
    Binding {
        /// Symbol name
        symbol: String,
        /// Binder pass that rejected the symbol
        pass: String,
        /// Reason for the rejection
        message: String,
    },

    /// Binary encoding or decoding failed.
    #[error("Codec error: {message}")]
    Codec {
        /// Description of the codec failure
        message: String,
    },

    /// Evaluating a bound declaration failed.
    #[error("Evaluation error: {message}")]
    Evaluation {
        /// Description of the failure
        message: String,
    },

    /// A symbol was requested that is not bound in the current session.
    #[error("Symbol not found: {name}")]
    SymbolNotFound {
        /// Requested symbol name
        name: String,
    },

    /// An MCP operation was attempted without an active connection.
    #[error("Not connected to an MCP server")]
    NotConnected,

    /// Every transport failed to connect.
    #[error("Failed to connect to {url}: {}", .attempts.join("; "))]
    Transport {
        /// Endpoint that was probed
        url: String,
        /// One message per failed transport attempt, in attempt order
        attempts: Vec<String>,
        /// Cause of the last attempt
        #[source]
        source: BoxError,
    },

    /// A tool call failed.
    #[error("Tool call '{tool}' failed")]
    ToolCall {
        /// Tool name
        tool: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// Fetching a prompt failed.
    #[error("Prompt '{prompt}' failed")]
    Prompt {
        /// Prompt name
        prompt: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// Reading a resource failed.
    #[error("Reading resource '{uri}' failed")]
    ResourceRead {
        /// Resource URI
        uri: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// An MCP request other than a tool, prompt or resource call failed.
    #[error("MCP request '{operation}' failed")]
    Request {
        /// Operation name
        operation: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// HTTP request to the chain API failed.
    #[error("HTTP request to {url} failed: {message}")]
    Http {
        /// Requested URL
        url: String,
        /// Description of the failure
        message: String,
        /// Underlying cause
        #[source]
        source: Option<BoxError>,
    },

    /// The chain RPC endpoint returned an error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Description of the serialization failure
        message: String,
        /// Underlying serde error
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Invalid argument error.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error.
    #[error("I/O error on {path}")]
    Io {
        /// File path involved
        path: String,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns `true` if this error was raised while generating source.
    ///
    /// Duplicate names count as generation errors.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_core::Error;
    ///
    /// let err = Error::DuplicateSymbol { name: "Point".to_string() };
    /// assert!(err.is_generation_error());
    /// ```
    #[must_use]
    pub const fn is_generation_error(&self) -> bool {
        matches!(self, Self::Generation { .. } | Self::DuplicateSymbol { .. })
    }

    /// Returns `true` if this is a binding error.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_core::Error;
    ///
    /// let err = Error::Binding {
    ///     symbol: "distance".to_string(),
    ///     pass: "functions".to_string(),
    ///     message: "unresolved identifier 'Point'".to_string(),
    /// };
    /// assert!(err.is_binding_error());
    /// ```
    #[must_use]
    pub const fn is_binding_error(&self) -> bool {
        matches!(self, Self::Binding { .. })
    }

    /// Returns `true` if this is a parse error.
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Returns `true` if this is a codec error.
    #[must_use]
    pub const fn is_codec_error(&self) -> bool {
        matches!(self, Self::Codec { .. })
    }

    /// Returns `true` if an operation needed a connection that does not exist.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_core::Error;
    ///
    /// assert!(Error::NotConnected.is_not_connected());
    /// ```
    #[must_use]
    pub const fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }

    /// Returns `true` if every transport failed to connect.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_core::Error;
    ///
    /// let err = Error::Transport {
    ///     url: "http://localhost:3000/mcp".to_string(),
    ///     attempts: vec!["sse: refused".to_string()],
    ///     source: "refused".into(),
    /// };
    /// assert!(err.is_transport_error());
    /// ```
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns `true` for tool, prompt, resource and generic MCP request failures.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_core::Error;
    ///
    /// let err = Error::ToolCall {
    ///     tool: "search".to_string(),
    ///     source: "boom".into(),
    /// };
    /// assert!(err.is_mcp_call_error());
    /// ```
    #[must_use]
    pub const fn is_mcp_call_error(&self) -> bool {
        matches!(
            self,
            Self::ToolCall { .. }
                | Self::Prompt { .. }
                | Self::ResourceRead { .. }
                | Self::Request { .. }
        )
    }

    /// Returns `true` if this is a configuration error.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_core::Error;
    ///
    /// let err = Error::ConfigError {
    ///     message: "Invalid url".to_string(),
    /// };
    /// assert!(err.is_config_error());
    /// ```
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }

    /// Returns `true` for HTTP and RPC failures talking to the chain.
    #[must_use]
    pub const fn is_chain_error(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Rpc { .. })
    }
}

/// Result type alias for Nucleus Explorer operations.
///
/// # Examples
///
/// ```
/// use nucleus_core::{Result, Error};
///
/// fn validate_len(value: usize) -> Result<usize> {
///     if value == 0 {
///         return Err(Error::InvalidArgument("length must be positive".to_string()));
///     }
///     Ok(value)
/// }
///
/// assert!(validate_len(5).is_ok());
/// assert!(validate_len(0).is_err());
/// ```
pub type Result<T> = std::result::Result<T, Error>;
