//! Nucleus Explorer CLI library.
//!
//! Exposes the argument definitions, commands and formatters of the
//! `nucleus-explorer` binary so they can be tested.

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::missing_errors_doc)]

pub mod actions;
pub mod cli;
pub mod commands;
pub mod formatters;
pub mod runner;

pub use actions::{AbiAction, AbiSource, McpAction};
pub use cli::{Cli, Commands};
