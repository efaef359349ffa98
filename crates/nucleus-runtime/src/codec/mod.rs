//! SCALE codec model and per-session registry.
//!
//! A [`CodecDef`] describes the binary layout of a value; the JSON value
//! model is `serde_json::Value`. Codecs registered in a [`CodecRegistry`] can
//! reference each other lazily by name, so declaration order does not matter
//! once everything is bound.

pub mod library;
mod model;
mod registry;
pub mod scale;

use thiserror::Error;

pub use model::{CodecDef, CodecTemplate, Factory, FactoryArg, Primitive, RegistryEntry};
pub use registry::CodecRegistry;
pub use scale::CodecLookup;

/// Errors raised while building, encoding or decoding codecs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before a value was complete.
    #[error("Unexpected end of input: needed {needed} byte(s), {remaining} remaining")]
    UnexpectedEnd {
        /// Bytes required
        needed: usize,
        /// Bytes left
        remaining: usize,
    },

    /// Bytes were left over after decoding.
    #[error("{0} trailing byte(s) after decoding")]
    TrailingBytes(usize),

    /// A value does not match its codec.
    #[error("Invalid value for {codec}: {message}")]
    InvalidValue {
        /// Codec expression
        codec: String,
        /// What is wrong with the value
        message: String,
    },

    /// A lazy reference names nothing registered.
    #[error("Unresolved codec '{0}'")]
    Unresolved(String),

    /// A template parameter was never substituted.
    #[error("Unbound generic parameter '{0}'")]
    UnboundParam(String),

    /// A generic codec was applied to the wrong number of arguments.
    #[error("'{codec}' expects {expected} generic argument(s), found {found}")]
    Arity {
        /// Codec name
        codec: String,
        /// Declared parameters
        expected: usize,
        /// Supplied arguments
        found: usize,
    },

    /// A factory or codec method received unusable arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Nesting or reference chains exceeded the limit.
    #[error("Codec nesting exceeds {0} levels")]
    TooDeep(usize),
}

impl From<CodecError> for nucleus_core::Error {
    fn from(err: CodecError) -> Self {
        Self::Codec {
            message: err.to_string(),
        }
    }
}
