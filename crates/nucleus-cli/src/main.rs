//! Nucleus Explorer CLI.
//!
//! # Examples
//!
//! ```bash
//! # Generate typed source for a deployed nucleus
//! nucleus-explorer abi generate --nucleus n1 --output n1.ts
//!
//! # Check the configured MCP servers
//! nucleus-explorer mcp status
//! ```

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use nucleus_core::ExplorerConfig;
use nucleus_core::cli::{ExitCode, OutputFormat};
use nucleus_explorer_cli::Cli;
use nucleus_explorer_cli::runner::{execute_command, exit_code_for, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            exit_code_for(&e)
        }
    };

    std::process::exit(exit_code.as_i32());
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let output_format = cli.format.parse::<OutputFormat>()?;
    let config = ExplorerConfig::load(cli.config.as_deref())?;
    execute_command(cli.command, &config, output_format).await
}
