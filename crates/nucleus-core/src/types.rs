//! Strong domain types for Nucleus Explorer.
//!
//! # Examples
//!
//! ```
//! use nucleus_core::{NucleusId, ServerUrl};
//!
//! let nucleus = NucleusId::new("kGk1FJCoPv4JTxez4aaWgGVaTPvsc2YuStz6ZWni4e61FVUW6");
//! let server = ServerUrl::parse("http://localhost:3000/mcp").unwrap();
//! assert_eq!(server.as_str(), "http://localhost:3000/mcp");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a nucleus registered on chain (newtype over String).
///
/// # Examples
///
/// ```
/// use nucleus_core::NucleusId;
///
/// let id = NucleusId::new("5FHneW46");
/// assert_eq!(id.as_str(), "5FHneW46");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NucleusId(String);

impl NucleusId {
    /// Creates a new nucleus identifier.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `NucleusId` and returns the inner `String`.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_core::NucleusId;
    ///
    /// let id = NucleusId::new("abc");
    /// let inner: String = id.into_inner();
    /// assert_eq!(inner, "abc");
    /// ```
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NucleusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NucleusId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NucleusId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Validated MCP server endpoint.
///
/// Only `http` and `https` endpoints are accepted since both supported
/// transports ride on HTTP.
///
/// # Examples
///
/// ```
/// use nucleus_core::ServerUrl;
///
/// let url = ServerUrl::parse("  https://mcp.example.com/sse ").unwrap();
/// assert_eq!(url.as_str(), "https://mcp.example.com/sse");
///
/// assert!(ServerUrl::parse("").is_err());
/// assert!(ServerUrl::parse("ftp://example.com").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerUrl(String);

impl ServerUrl {
    /// Parses and validates an endpoint, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if the string is empty, has a
    /// scheme other than `http`/`https`, or contains whitespace or control
    /// characters.
    pub fn parse(url: &str) -> crate::Result<Self> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidArgument(
                "server url cannot be empty".to_string(),
            ));
        }

        let host_part = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"))
            .ok_or_else(|| {
                crate::Error::InvalidArgument(format!(
                    "server url must start with http:// or https://: '{trimmed}'"
                ))
            })?;

        if host_part.is_empty() {
            return Err(crate::Error::InvalidArgument(format!(
                "server url has no host: '{trimmed}'"
            )));
        }

        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(crate::Error::InvalidArgument(format!(
                "server url contains whitespace or control characters: '{trimmed}'"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Returns the URL as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ServerUrl {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ServerUrl> for String {
    fn from(url: ServerUrl) -> Self {
        url.0
    }
}

impl std::str::FromStr for ServerUrl {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
