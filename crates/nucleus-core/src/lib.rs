//! Core types, configuration and errors for Nucleus Explorer.
//!
//! This crate provides the foundational pieces used by every other crate in
//! the workspace.
//!
//! # Architecture
//!
//! The core consists of:
//! - Strong domain types (`NucleusId`, `ServerUrl`)
//! - A single error hierarchy with contextual information
//! - Explorer configuration loaded from TOML
//! - The lenient topological ordering shared by generator and binder
//! - CLI output formats and exit codes

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod config;
mod error;
mod types;

pub mod cli;
pub mod order;

pub use config::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, ExplorerConfig, ExplorerConfigBuilder, RetryPolicy};
pub use error::{BoxError, Error, Result};
pub use types::{NucleusId, ServerUrl};
