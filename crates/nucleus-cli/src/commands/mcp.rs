//! MCP command implementation.
//!
//! Each command opens its own connection and closes it before printing.

use anyhow::Result;
use nucleus_core::cli::{ExitCode, OutputFormat};
use nucleus_core::{Error, ExplorerConfig, ServerUrl};
use nucleus_mcp::{ConnectionInfo, HealthChecker, HealthReport, McpClient, ServerInfo, ServerStatus};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::common::parse_json_arg;
use crate::actions::McpAction;
use crate::formatters::format_output;

/// Result of `mcp probe`.
#[derive(Debug, Serialize)]
pub struct ProbeResult {
    /// Connection details.
    pub connection: ConnectionInfo,
    /// Server identity and capabilities.
    pub server: ServerInfo,
}

/// Result of the listing commands.
#[derive(Debug, Serialize)]
pub struct Listing<T> {
    /// Server endpoint.
    pub url: String,
    /// Listed items.
    pub items: Vec<T>,
}

/// Summary of `mcp status`.
#[derive(Debug, Serialize)]
pub struct StatusSummary {
    /// Servers answering.
    pub available: usize,
    /// Servers failing every attempt.
    pub broken: usize,
    /// Per-server reports, in the order given.
    pub servers: Vec<HealthReport>,
}

impl StatusSummary {
    /// Summarizes `reports`.
    #[must_use]
    pub fn new(servers: Vec<HealthReport>) -> Self {
        let available = servers.iter().filter(|report| report.is_available()).count();
        Self {
            available,
            broken: servers.len() - available,
            servers,
        }
    }

    /// `SUCCESS` when every server answers, `SERVER_ERROR` when none does,
    /// `PARTIAL` otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        if self.broken == 0 {
            ExitCode::SUCCESS
        } else if self.available == 0 {
            ExitCode::SERVER_ERROR
        } else {
            ExitCode::PARTIAL
        }
    }
}

/// Runs an MCP action.
///
/// # Errors
///
/// Returns an error if the endpoint is invalid, no transport connects, or
/// the request fails.
pub async fn run(action: McpAction, config: &ExplorerConfig, output_format: OutputFormat) -> Result<ExitCode> {
    match action {
        McpAction::Probe { url } => {
            let url = ServerUrl::parse(&url)?;
            let (connection, server) = McpClient::new().test_connection(url.as_str()).await?;
            print(&ProbeResult { connection, server }, output_format)
        }
        McpAction::Tools { url } => {
            let client = connect(&url).await?;
            let items = client.list_tools().await;
            let items = finish(client, items).await?;
            print(&Listing { url, items }, output_format)
        }
        McpAction::Prompts { url } => {
            let client = connect(&url).await?;
            let items = client.list_prompts().await;
            let items = finish(client, items).await?;
            print(&Listing { url, items }, output_format)
        }
        McpAction::Resources { url } => {
            let client = connect(&url).await?;
            let items = client.list_resources().await;
            let items = finish(client, items).await?;
            print(&Listing { url, items }, output_format)
        }
        McpAction::Call { url, tool, args } => {
            let args = parse_json_arg("--args", &args)?;
            let client = connect(&url).await?;
            let result = client.call_tool(&tool, args).await;
            let result: Value = finish(client, result).await?;
            print(&result, output_format)
        }
        McpAction::Status { urls } => status(urls, config, output_format).await,
    }
}

async fn connect(url: &str) -> Result<McpClient> {
    let url = ServerUrl::parse(url)?;
    let mut client = McpClient::new();
    let info = client.connect(url.as_str()).await?;
    info!(url = %info.server_url, transport = %info.transport, "connected");
    Ok(client)
}

/// Disconnects and passes `outcome` through.
async fn finish<T>(mut client: McpClient, outcome: nucleus_core::Result<T>) -> Result<T> {
    if let Err(e) = client.disconnect().await {
        warn!(error = %e, "disconnect failed");
    }
    Ok(outcome?)
}

/// Endpoints to check: the given ones, else those from the configuration.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if an endpoint is invalid or there is
/// nothing to check.
pub fn status_targets(urls: &[String], config: &ExplorerConfig) -> Result<Vec<ServerUrl>> {
    let targets = if urls.is_empty() {
        config.mcp_servers.clone()
    } else {
        urls.iter()
            .map(|url| ServerUrl::parse(url))
            .collect::<nucleus_core::Result<_>>()?
    };
    if targets.is_empty() {
        return Err(Error::InvalidArgument(
            "no servers given and none configured under mcp_servers".to_string(),
        )
        .into());
    }
    Ok(targets)
}

async fn status(urls: Vec<String>, config: &ExplorerConfig, output_format: OutputFormat) -> Result<ExitCode> {
    let targets = status_targets(&urls, config)?;
    let checker = HealthChecker::new(config.retry);
    info!(
        servers = targets.len(),
        max_attempts = config.retry.max_attempts,
        "checking servers"
    );

    let urls: Vec<&str> = targets.iter().map(ServerUrl::as_str).collect();
    let reports = checker
        .check_all_with(&urls, |report| match report.status {
            ServerStatus::Checking | ServerStatus::Available => {
                debug!(url = %report.url, status = %report.status, "status update");
            }
            ServerStatus::Broken => warn!(url = %report.url, attempts = report.attempts, "server broken"),
        })
        .await;
    let summary = StatusSummary::new(reports);
    println!("{}", format_output(&summary, output_format)?);
    Ok(summary.exit_code())
}

fn print<T: Serialize>(data: &T, output_format: OutputFormat) -> Result<ExitCode> {
    println!("{}", format_output(data, output_format)?);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn report(url: &str, status: ServerStatus) -> HealthReport {
        HealthReport {
            url: url.to_string(),
            status,
            attempts: 1,
            tool_count: None,
            transport: None,
            error: None,
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_exit_codes() {
        let all_up = StatusSummary::new(vec![report("http://a", ServerStatus::Available)]);
        assert_eq!(all_up.exit_code(), ExitCode::SUCCESS);

        let mixed = StatusSummary::new(vec![
            report("http://a", ServerStatus::Available),
            report("http://b", ServerStatus::Broken),
        ]);
        assert_eq!((mixed.available, mixed.broken), (1, 1));
        assert_eq!(mixed.exit_code(), ExitCode::PARTIAL);

        let all_down = StatusSummary::new(vec![report("http://b", ServerStatus::Broken)]);
        assert_eq!(all_down.exit_code(), ExitCode::SERVER_ERROR);
    }

    #[test]
    fn test_status_targets_fall_back_to_config() {
        let config = ExplorerConfig::builder()
            .mcp_server(ServerUrl::parse("http://localhost:3000/mcp").unwrap())
            .build();
        let targets = status_targets(&[], &config).unwrap();
        assert_eq!(targets[0].as_str(), "http://localhost:3000/mcp");

        let given = status_targets(&["http://localhost:4000/sse".to_string()], &config).unwrap();
        assert_eq!(given[0].as_str(), "http://localhost:4000/sse");
    }

    #[test]
    fn test_status_targets_rejects_bad_input() {
        assert!(status_targets(&[], &ExplorerConfig::default()).is_err());
        let err = status_targets(&["ftp://x".to_string()], &ExplorerConfig::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidArgument(_))));
    }
}
