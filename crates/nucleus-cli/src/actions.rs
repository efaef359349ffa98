//! Action type definitions for CLI commands.
//!
//! Defines the action enums used by the `abi` and `mcp` commands.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Where an ABI document comes from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct AbiSource {
    /// Read the ABI document from a JSON file
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Fetch the ABI of a deployed nucleus from the chain REST API
    #[arg(long)]
    pub nucleus: Option<String>,
}

/// ABI actions.
#[derive(Subcommand, Debug)]
pub enum AbiAction {
    /// Generate the typed source for an ABI
    Generate {
        #[command(flatten)]
        source: AbiSource,

        /// Write the source to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Bind an ABI and report bound symbols and failures
    Bind {
        #[command(flatten)]
        source: AbiSource,
    },

    /// Show the editable argument tree of a function
    Args {
        #[command(flatten)]
        source: AbiSource,

        /// Function name
        function: String,

        /// Edits in PATH=VALUE format, e.g. `a.x=3`; `PATH+` appends an item
        #[arg(long = "set", num_args = 1)]
        edits: Vec<String>,
    },

    /// Encode a call and send it to the nucleus
    Invoke {
        #[command(flatten)]
        source: AbiSource,

        /// Function name
        function: String,

        /// Arguments as a JSON object keyed by parameter name, or a JSON array
        #[arg(long, default_value = "null")]
        args: String,

        /// Print the encoded request instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
}

/// MCP server actions.
#[derive(Subcommand, Debug)]
pub enum McpAction {
    /// Connect, show transport and capabilities, then disconnect
    Probe {
        /// Server endpoint
        url: String,
    },

    /// List the server's tools
    Tools {
        /// Server endpoint
        url: String,
    },

    /// List the server's prompts
    Prompts {
        /// Server endpoint
        url: String,
    },

    /// List the server's resources
    Resources {
        /// Server endpoint
        url: String,
    },

    /// Call a tool
    Call {
        /// Server endpoint
        url: String,

        /// Tool name
        tool: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Check server health with retries
    Status {
        /// Server endpoints; defaults to `mcp_servers` from the configuration
        urls: Vec<String>,
    },
}
