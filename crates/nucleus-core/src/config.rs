//! Configuration for Nucleus Explorer.
//!
//! Configuration lives in a TOML file. When no path is given it is read from
//! the platform configuration directory:
//!
//! - Linux: `~/.config/nucleus-explorer/config.toml`
//! - macOS: `~/Library/Application Support/nucleus-explorer/config.toml`
//! - Windows: `%APPDATA%\nucleus-explorer\config.toml`
//!
//! A missing file yields the defaults.
//!
//! ```toml
//! api_base_url = "https://api.example.org"
//! rpc_url = "https://rpc.example.org"
//! mcp_servers = ["http://localhost:3000/mcp"]
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 1000
//! ```
//!
//! # Examples
//!
//! ```
//! use nucleus_core::ExplorerConfig;
//!
//! let config = ExplorerConfig::default();
//! assert_eq!(config.retry.max_attempts, 3);
//! assert!(config.validate().is_ok());
//! ```

use crate::{Error, Result, ServerUrl};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under the platform configuration directory.
pub const CONFIG_DIR_NAME: &str = "nucleus-explorer";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level explorer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Base URL of the chain REST API serving ABI documents.
    pub api_base_url: String,

    /// JSON-RPC endpoint used to invoke nucleus functions.
    pub rpc_url: String,

    /// MCP servers checked by `mcp status` when none are given.
    pub mcp_servers: Vec<ServerUrl>,

    /// Retry policy for MCP server health checks.
    pub retry: RetryPolicy,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            rpc_url: "http://localhost:9944".to_string(),
            mcp_servers: Vec::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ExplorerConfig {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_core::{ExplorerConfig, RetryPolicy};
    ///
    /// let config = ExplorerConfig::builder()
    ///     .api_base_url("https://api.example.org")
    ///     .retry(RetryPolicy::new(5, 250))
    ///     .build();
    ///
    /// assert_eq!(config.api_base_url, "https://api.example.org");
    /// assert_eq!(config.retry.max_attempts, 5);
    /// ```
    #[must_use]
    pub fn builder() -> ExplorerConfigBuilder {
        ExplorerConfigBuilder::new()
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform configuration directory cannot be
    /// determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| Error::ConfigError {
            message: "failed to determine config directory".to_string(),
        })?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from `path`, or from [`Self::default_path`] when
    /// `path` is `None`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this structure or
    /// fails [`Self::validate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_core::ExplorerConfig;
    ///
    /// let config = ExplorerConfig::from_toml(r#"
    /// rpc_url = "https://rpc.example.org"
    ///
    /// [retry]
    /// max_attempts = 2
    /// "#).unwrap();
    ///
    /// assert_eq!(config.rpc_url, "https://rpc.example.org");
    /// assert_eq!(config.retry.max_attempts, 2);
    /// assert_eq!(config.retry.base_delay_ms, 1000);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigError {
            message: format!("failed to parse config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::ConfigError {
            message: format!("failed to serialize config: {e}"),
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `api_base_url` or `rpc_url` is empty
    /// - `retry.max_attempts` is zero
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_core::ExplorerConfig;
    ///
    /// let mut config = ExplorerConfig::default();
    /// config.retry.max_attempts = 0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::ConfigError {
                message: "api_base_url cannot be empty".to_string(),
            });
        }

        if self.rpc_url.trim().is_empty() {
            return Err(Error::ConfigError {
                message: "rpc_url cannot be empty".to_string(),
            });
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::ConfigError {
                message: "retry.max_attempts must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Bounded retry with linear backoff.
///
/// Attempt `n` (1-based) that fails waits `n * base_delay` before the next
/// attempt; no wait follows the last attempt.
///
/// # Examples
///
/// ```
/// use nucleus_core::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.delay_after(1), Duration::from_secs(1));
/// assert_eq!(policy.delay_after(2), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Creates a retry policy.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Builder for [`ExplorerConfig`].
#[derive(Debug, Default)]
pub struct ExplorerConfigBuilder {
    config: ExplorerConfig,
}

impl ExplorerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the REST API base URL.
    #[must_use]
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    /// Sets the JSON-RPC endpoint.
    #[must_use]
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.config.rpc_url = url.into();
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Adds an MCP server to check.
    #[must_use]
    pub fn mcp_server(mut self, url: ServerUrl) -> Self {
        self.config.mcp_servers.push(url);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ExplorerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ExplorerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_rpc_url_rejected() {
        let config = ExplorerConfig::builder().rpc_url("  ").build();
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_from_toml_with_servers() {
        let config = ExplorerConfig::from_toml(
            r#"
api_base_url = "https://api.example.org"
mcp_servers = ["http://localhost:3000/mcp", "https://b.example.org/sse"]
"#,
        )
        .unwrap();
        assert_eq!(config.mcp_servers.len(), 2);
        assert_eq!(config.mcp_servers[1].as_str(), "https://b.example.org/sse");
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_from_toml_rejects_invalid_server() {
        let result = ExplorerConfig::from_toml(r#"mcp_servers = ["not a url"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExplorerConfig::builder()
            .api_base_url("https://api.example.org")
            .mcp_server(ServerUrl::parse("http://localhost:3000/mcp").unwrap())
            .build();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[retry]"));
        assert_eq!(ExplorerConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExplorerConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, ExplorerConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rpc_url = \"https://rpc.example.org\"").unwrap();
        writeln!(file, "[retry]").unwrap();
        writeln!(file, "base_delay_ms = 50").unwrap();

        let config = ExplorerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.rpc_url, "https://rpc.example.org");
        assert_eq!(config.retry.base_delay_ms, 50);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_retry_delay_is_linear() {
        let policy = RetryPolicy::new(4, 200);
        assert_eq!(policy.delay_after(3), Duration::from_millis(600));
    }
}
