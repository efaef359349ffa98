//! Command implementations for the Nucleus Explorer CLI.
//!
//! Each command module loads its inputs, runs the operation, and formats
//! output according to the requested format.

pub mod abi;
pub mod common;
pub mod completions;
pub mod mcp;
