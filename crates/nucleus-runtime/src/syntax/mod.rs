//! Lexer, syntax tree and parser for generated source.
//!
//! The dialect is the subset of TypeScript that the code generator emits:
//! imports, underscore helpers, interfaces, codec classes, type aliases,
//! codec constants and exported functions whose bodies are `return`, `const`
//! and expression statements.
//!
//! # Examples
//!
//! ```
//! use nucleus_runtime::syntax::{Item, parse_module};
//!
//! let module = parse_module("export const Balance = U128;\nexport const = ;");
//! assert_eq!(module.items.len(), 1);
//! assert_eq!(module.items[0].name(), Some("Balance"));
//! assert_eq!(module.errors.len(), 1);
//! ```

mod ast;
mod lexer;
mod parser;

use serde::Serialize;
use thiserror::Error;

pub use ast::{
    ClassDecl, ClassMember, ConstDecl, Expr, FunctionDecl, ImportDecl, ImportName,
    InterfaceDecl, InterfaceField, Item, Module, Param, Stmt, TypeAliasDecl, TypeAnn,
};
pub use lexer::Token;
pub use parser::{parse_module, parse_type};

/// A syntax error with its 1-based position.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    /// What was expected or found.
    pub message: String,
}

impl From<ParseError> for nucleus_core::Error {
    fn from(err: ParseError) -> Self {
        Self::Parse {
            line: err.line,
            column: err.column,
            message: err.message,
        }
    }
}
