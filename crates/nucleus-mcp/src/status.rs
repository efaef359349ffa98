//! Server health checks.
//!
//! A check connects, lists tools and disconnects. Failed checks are retried
//! according to a [`RetryPolicy`], waiting `base_delay * attempt` between
//! attempts.

use chrono::{DateTime, Utc};
use nucleus_core::RetryPolicy;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::McpClient;
use crate::transport::{RmcpConnector, TransportConnector};
use crate::types::TransportKind;

/// Health of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// A check is in progress.
    Checking,
    /// The server answered a tool listing.
    Available,
    /// Every attempt failed.
    Broken,
}

impl ServerStatus {
    /// Returns the status name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Available => "available",
            Self::Broken => "broken",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Server endpoint.
    pub url: String,
    /// Final status.
    pub status: ServerStatus,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Number of tools listed by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_count: Option<usize>,
    /// Transport used by the successful attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
    /// Error of the last failed attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the check finished.
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// A report for a check that has started but not finished.
    #[must_use]
    pub fn checking(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: ServerStatus::Checking,
            attempts: 0,
            tool_count: None,
            transport: None,
            error: None,
            checked_at: Utc::now(),
        }
    }

    /// Returns `true` if the server is available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == ServerStatus::Available
    }
}

/// Checks MCP servers with retries.
///
/// # Examples
///
/// ```no_run
/// use nucleus_core::RetryPolicy;
/// use nucleus_mcp::HealthChecker;
///
/// # async fn example() {
/// let checker = HealthChecker::new(RetryPolicy::new(2, 500));
/// let report = checker.check("http://localhost:3000/mcp").await;
/// println!("{}: {}", report.url, report.status);
/// # }
/// ```
pub struct HealthChecker {
    connector: Arc<dyn TransportConnector>,
    policy: RetryPolicy,
}

impl fmt::Debug for HealthChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthChecker")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl HealthChecker {
    /// Creates a checker using the `rmcp` transports.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_connector(Arc::new(RmcpConnector), policy)
    }

    /// Creates a checker using `connector` to open transports.
    #[must_use]
    pub fn with_connector(connector: Arc<dyn TransportConnector>, policy: RetryPolicy) -> Self {
        Self { connector, policy }
    }

    /// Retry policy in use.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Checks one server.
    pub async fn check(&self, url: &str) -> HealthReport {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            debug!(%url, attempt, "checking server");
            let mut client = McpClient::with_connector(Arc::clone(&self.connector));
            let outcome = match client.connect(url).await {
                Ok(info) => client
                    .list_tools()
                    .await
                    .map(|tools| (info.transport, tools.len())),
                Err(e) => Err(e),
            };
            if let Err(e) = client.disconnect().await {
                debug!(%url, error = %e, "ignoring disconnect failure");
            }

            match outcome {
                Ok((transport, tool_count)) => {
                    info!(%url, attempt, tool_count, "server available");
                    return HealthReport {
                        url: url.to_string(),
                        status: ServerStatus::Available,
                        attempts: attempt,
                        tool_count: Some(tool_count),
                        transport: Some(transport),
                        error: None,
                        checked_at: Utc::now(),
                    };
                }
                Err(e) => {
                    warn!(%url, attempt, max_attempts, error = %e, "health check failed");
                    last_error = Some(e.to_string());
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    }
                }
            }
        }

        HealthReport {
            url: url.to_string(),
            status: ServerStatus::Broken,
            attempts: max_attempts,
            tool_count: None,
            transport: None,
            error: last_error,
            checked_at: Utc::now(),
        }
    }

    /// Checks each server in order.
    pub async fn check_all<S: AsRef<str> + Sync>(&self, urls: &[S]) -> Vec<HealthReport> {
        self.check_all_with(urls, |_| {}).await
    }

    /// Checks each server in order, passing `progress` a
    /// [`ServerStatus::Checking`] report when a check starts and the final
    /// report when it ends.
    pub async fn check_all_with<S, F>(&self, urls: &[S], mut progress: F) -> Vec<HealthReport>
    where
        S: AsRef<str> + Sync,
        F: FnMut(&HealthReport) + Send,
    {
        let mut reports = Vec::with_capacity(urls.len());
        for url in urls {
            progress(&HealthReport::checking(url.as_ref()));
            let report = self.check(url.as_ref()).await;
            progress(&report);
            reports.push(report);
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{McpPeer, MockTransportConnector};
    use async_trait::async_trait;
    use nucleus_core::BoxError;
    use serde_json::{Map, Value, json};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug)]
    struct ToolsPeer;

    #[async_trait]
    impl McpPeer for ToolsPeer {
        fn server_info(&self) -> Option<Value> {
            None
        }

        async fn list_tools(&self) -> Result<Vec<Value>, BoxError> {
            Ok(vec![json!({"name": "a"}), json!({"name": "b"})])
        }

        async fn list_prompts(&self) -> Result<Vec<Value>, BoxError> {
            Ok(Vec::new())
        }

        async fn list_resources(&self) -> Result<Vec<Value>, BoxError> {
            Ok(Vec::new())
        }

        async fn call_tool(&self, _: &str, _: Option<Map<String, Value>>) -> Result<Value, BoxError> {
            Ok(Value::Null)
        }

        async fn get_prompt(&self, _: &str, _: Option<Map<String, Value>>) -> Result<Value, BoxError> {
            Ok(Value::Null)
        }

        async fn read_resource(&self, _: &str) -> Result<Value, BoxError> {
            Ok(Value::Null)
        }

        async fn close(self: Box<Self>) -> Result<(), BoxError> {
            Ok(())
        }
    }

    /// Rejects every connection until `healthy_after` rounds have passed.
    fn flaky_connector(healthy_after: u32) -> MockTransportConnector {
        let rounds = Arc::new(AtomicU32::new(0));
        let mut connector = MockTransportConnector::new();
        connector.expect_connect().returning(move |kind, _| {
            if kind == TransportKind::StreamableHttp {
                let round = rounds.fetch_add(1, Ordering::SeqCst);
                if round >= healthy_after {
                    return Ok(Box::new(ToolsPeer));
                }
            }
            Err("connection refused".into())
        });
        connector
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_after_retries() {
        let checker = HealthChecker::with_connector(Arc::new(flaky_connector(2)), RetryPolicy::new(3, 1000));
        let start = Instant::now();
        let report = checker.check("http://localhost:3000/mcp").await;

        assert_eq!(report.status, ServerStatus::Available);
        assert_eq!(report.attempts, 3);
        assert_eq!(report.tool_count, Some(2));
        assert_eq!(report.transport, Some(TransportKind::StreamableHttp));
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_after_max_attempts() {
        let checker = HealthChecker::with_connector(Arc::new(flaky_connector(u32::MAX)), RetryPolicy::new(2, 500));
        let start = Instant::now();
        let report = checker.check("http://localhost:3000/mcp").await;

        assert_eq!(report.status, ServerStatus::Broken);
        assert_eq!(report.attempts, 2);
        assert!(report.error.unwrap().contains("connection refused"));
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_all_keeps_order() {
        let checker = HealthChecker::with_connector(Arc::new(flaky_connector(0)), RetryPolicy::new(1, 10));
        let reports = checker.check_all(&["http://a/mcp", "http://b/mcp"]).await;
        let urls: Vec<_> = reports.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["http://a/mcp", "http://b/mcp"]);
        assert!(reports.iter().all(HealthReport::is_available));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_all_reports_progress() {
        let checker = HealthChecker::with_connector(Arc::new(flaky_connector(0)), RetryPolicy::new(1, 10));
        let mut seen = Vec::new();
        let reports = checker
            .check_all_with(&["http://a/mcp", "http://b/mcp"], |report| {
                seen.push((report.url.clone(), report.status));
            })
            .await;

        assert_eq!(reports.len(), 2);
        assert_eq!(
            seen,
            vec![
                ("http://a/mcp".to_string(), ServerStatus::Checking),
                ("http://a/mcp".to_string(), ServerStatus::Available),
                ("http://b/mcp".to_string(), ServerStatus::Checking),
                ("http://b/mcp".to_string(), ServerStatus::Available),
            ]
        );
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(ServerStatus::Broken).unwrap(), json!("broken"));
        assert_eq!(ServerStatus::Checking.to_string(), "checking");
    }
}
