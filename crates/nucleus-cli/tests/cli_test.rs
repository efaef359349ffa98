//! Integration tests for the CLI commands.

use clap::Parser;
use nucleus_core::cli::{ExitCode, OutputFormat};
use nucleus_core::{Error, ExplorerConfig};
use nucleus_explorer_cli::runner::{execute_command, exit_code_for};
use nucleus_explorer_cli::{Cli, Commands};
use std::path::Path;
use tempfile::TempDir;

const COUNTER_ABI: &str = r#"{"abi": [
    {"type": "enum", "name": "Mode", "generics": [], "variants": [
        {"name": "Up", "fields": []},
        {"name": "Down", "fields": []}
    ]},
    {"type": "fn", "name": "step", "method": "post", "inputs": [
        {"name": "mode", "ty": {"kind": "path", "path": ["Mode"], "generic_args": []}},
        {"name": "by", "ty": {"kind": "path", "path": ["u16"], "generic_args": []}}
    ], "output": {"kind": "path", "path": ["u64"], "generic_args": []}}
]}"#;

fn write(dir: &TempDir, name: &str, text: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path.display().to_string()
}

async fn run(args: &[&str], config: &ExplorerConfig) -> anyhow::Result<ExitCode> {
    let cli = Cli::try_parse_from(std::iter::once("nucleus-explorer").chain(args.iter().copied()))?;
    let format: OutputFormat = cli.format.parse()?;
    execute_command(cli.command, config, format).await
}

#[tokio::test]
async fn test_abi_workflow_on_file() {
    let dir = TempDir::new().unwrap();
    let abi = write(&dir, "counter.json", COUNTER_ABI);
    let config = ExplorerConfig::default();
    let out = dir.path().join("counter.ts");
    let out_str = out.display().to_string();

    let code = run(&["abi", "generate", "--file", abi.as_str(), "-o", out_str.as_str()], &config).await.unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
    let source = std::fs::read_to_string(&out).unwrap();
    assert!(source.contains("step"));

    let code = run(&["--format", "json", "abi", "bind", "--file", abi.as_str()], &config).await.unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let code = run(
        &["abi", "args", "--file", abi.as_str(), "step", "--set", "by=7"],
        &config,
    )
    .await
    .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let code = run(
        &[
            "--format", "text", "abi", "invoke", "--file", abi.as_str(), "step", "--args",
            r#"{"mode": "Down", "by": 7}"#, "--dry-run",
        ],
        &config,
    )
    .await
    .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
}

#[tokio::test]
async fn test_unknown_function_maps_to_invalid_input() {
    let dir = TempDir::new().unwrap();
    let abi = write(&dir, "counter.json", COUNTER_ABI);
    let err = run(&["abi", "args", "--file", abi.as_str(), "missing"], &ExplorerConfig::default())
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&err), ExitCode::INVALID_INPUT);
}

#[tokio::test]
async fn test_status_without_servers_is_invalid_input() {
    let err = run(&["mcp", "status"], &ExplorerConfig::default()).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidArgument(_))));
    assert_eq!(exit_code_for(&err), ExitCode::INVALID_INPUT);
}

#[tokio::test]
async fn test_bad_mcp_url_is_rejected_before_connecting() {
    let err = run(&["mcp", "tools", "ftp://example.com"], &ExplorerConfig::default())
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&err), ExitCode::INVALID_INPUT);
}

#[test]
fn test_config_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "config.toml",
        r#"
api_base_url = "https://api.example.org"
mcp_servers = ["http://localhost:3000/mcp"]

[retry]
max_attempts = 5
base_delay_ms = 250
"#,
    );
    let cli = Cli::parse_from(["nucleus-explorer", "--config", path.as_str(), "mcp", "status"]);
    assert!(matches!(cli.command, Commands::Mcp { .. }));

    let config = ExplorerConfig::load(cli.config.as_deref()).unwrap();
    assert_eq!(config.api_base_url, "https://api.example.org");
    assert_eq!(config.mcp_servers[0].as_str(), "http://localhost:3000/mcp");
    assert_eq!(config.retry.max_attempts, 5);
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let config = ExplorerConfig::load(Some(Path::new("/nonexistent/nucleus/config.toml"))).unwrap();
    assert_eq!(config, ExplorerConfig::default());
}
