//! CLI argument definitions and parsing.
//!
//! Defines the command-line interface structure using clap:
//! - `Cli` - Main CLI entry point
//! - `Commands` - Available subcommands

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::actions::{AbiAction, McpAction};

/// Nucleus Explorer - inspect nucleus ABIs and MCP servers.
///
/// Generates typed source from nucleus ABIs, binds it into live codecs,
/// encodes and sends calls, and talks to MCP servers.
#[derive(Parser, Debug)]
#[command(name = "nucleus-explorer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (json, text, pretty)
    #[arg(long = "format", global = true, default_value = "pretty")]
    pub format: String,

    /// Configuration file (default: <config dir>/nucleus-explorer/config.toml)
    #[arg(long, global = true, env = "NUCLEUS_EXPLORER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Work with nucleus ABIs.
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Generate typed source from a local ABI
    /// nucleus-explorer abi generate --file counter.abi.json
    ///
    /// # Fill in arguments and send a call
    /// nucleus-explorer abi invoke --nucleus n1 increment --args '{"by": 2}'
    /// ```
    Abi {
        /// ABI action
        #[command(subcommand)]
        action: AbiAction,
    },

    /// Talk to MCP servers.
    ///
    /// # Examples
    ///
    /// ```bash
    /// nucleus-explorer mcp probe http://localhost:3000/mcp
    /// nucleus-explorer mcp call http://localhost:3000/mcp echo --args '{"message": "hi"}'
    /// ```
    Mcp {
        /// MCP action
        #[command(subcommand)]
        action: McpAction,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell for completion generation
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_abi_generate() {
        let cli = Cli::parse_from(["nucleus-explorer", "abi", "generate", "--file", "a.json"]);
        let Commands::Abi {
            action: AbiAction::Generate { source, output },
        } = cli.command
        else {
            panic!("Expected abi generate");
        };
        assert_eq!(source.file, Some(PathBuf::from("a.json")));
        assert!(source.nucleus.is_none());
        assert!(output.is_none());
    }

    #[test]
    fn test_abi_source_is_required() {
        assert!(Cli::try_parse_from(["nucleus-explorer", "abi", "bind"]).is_err());
        assert!(
            Cli::try_parse_from([
                "nucleus-explorer", "abi", "bind", "--file", "a.json", "--nucleus", "n1"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_cli_parsing_abi_args_edits() {
        let cli = Cli::parse_from([
            "nucleus-explorer", "abi", "args", "--nucleus", "n1", "distance", "--set", "a.x=3",
            "--set", "labels+",
        ]);
        let Commands::Abi {
            action: AbiAction::Args { function, edits, .. },
        } = cli.command
        else {
            panic!("Expected abi args");
        };
        assert_eq!(function, "distance");
        assert_eq!(edits, ["a.x=3", "labels+"]);
    }

    #[test]
    fn test_cli_parsing_mcp_call_defaults() {
        let cli = Cli::parse_from(["nucleus-explorer", "mcp", "call", "http://x/mcp", "echo"]);
        let Commands::Mcp {
            action: McpAction::Call { url, tool, args },
        } = cli.command
        else {
            panic!("Expected mcp call");
        };
        assert_eq!(url, "http://x/mcp");
        assert_eq!(tool, "echo");
        assert_eq!(args, "{}");
    }

    #[test]
    fn test_cli_parsing_mcp_status_without_urls() {
        let cli = Cli::parse_from(["nucleus-explorer", "mcp", "status"]);
        assert!(matches!(
            cli.command,
            Commands::Mcp { action: McpAction::Status { ref urls } } if urls.is_empty()
        ));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "nucleus-explorer", "--verbose", "--format", "json", "--config", "/tmp/c.toml",
            "completions", "zsh",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.format, "json");
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::Completions { shell: Shell::Zsh }));
    }

    #[test]
    fn test_cli_output_format_default() {
        let cli = Cli::parse_from(["nucleus-explorer", "mcp", "tools", "http://x/mcp"]);
        assert_eq!(cli.format, "pretty");
    }

    #[test]
    fn test_cli_debug_assert() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
