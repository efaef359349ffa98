//! Command execution and runtime logic.
//!
//! Contains logging initialization, command dispatch, and the mapping from
//! errors to exit codes.

use anyhow::Result;
use clap::CommandFactory;
use nucleus_core::cli::{ExitCode, OutputFormat};
use nucleus_core::{Error, ExplorerConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::commands;

/// Initializes logging.
///
/// `--verbose` selects debug level; otherwise `RUST_LOG` applies, falling
/// back to info. Logs go to stderr so stdout stays parseable.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

/// Executes `command` and returns its exit code.
///
/// # Errors
///
/// Returns an error if the command fails.
pub async fn execute_command(
    command: Commands,
    config: &ExplorerConfig,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    match command {
        Commands::Abi { action } => commands::abi::run(action, config, output_format).await,
        Commands::Mcp { action } => commands::mcp::run(action, config, output_format).await,
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    }
}

/// Exit code for a failed command.
///
/// # Examples
///
/// ```
/// use nucleus_core::Error;
/// use nucleus_core::cli::ExitCode;
/// use nucleus_explorer_cli::runner::exit_code_for;
///
/// let err = anyhow::Error::from(Error::NotConnected);
/// assert_eq!(exit_code_for(&err), ExitCode::SERVER_ERROR);
/// ```
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let Some(err) = err.downcast_ref::<Error>() else {
        return ExitCode::ERROR;
    };
    if err.is_transport_error() || err.is_not_connected() || err.is_mcp_call_error() {
        ExitCode::SERVER_ERROR
    } else if err.is_chain_error() {
        ExitCode::CHAIN_ERROR
    } else if err.is_config_error() || matches!(err, Error::InvalidArgument(_) | Error::SymbolNotFound { .. }) {
        ExitCode::INVALID_INPUT
    } else {
        ExitCode::ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let chain = anyhow::Error::from(Error::Rpc {
            code: -32000,
            message: "reverted".to_string(),
        });
        assert_eq!(exit_code_for(&chain), ExitCode::CHAIN_ERROR);

        let input = anyhow::Error::from(Error::InvalidArgument("bad".to_string()));
        assert_eq!(exit_code_for(&input), ExitCode::INVALID_INPUT);

        let missing = anyhow::Error::from(Error::SymbolNotFound {
            name: "nope".to_string(),
        });
        assert_eq!(exit_code_for(&missing), ExitCode::INVALID_INPUT);

        let tool = anyhow::Error::from(Error::ToolCall {
            tool: "echo".to_string(),
            source: "boom".into(),
        });
        assert_eq!(exit_code_for(&tool), ExitCode::SERVER_ERROR);

        let codec = anyhow::Error::from(Error::Codec {
            message: "short input".to_string(),
        });
        assert_eq!(exit_code_for(&codec), ExitCode::ERROR);

        assert_eq!(exit_code_for(&anyhow::anyhow!("other")), ExitCode::ERROR);
    }
}
