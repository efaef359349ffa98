//! Nucleus ABI model.
//!
//! Decodes the JSON ABI a nucleus publishes on chain into the TypeIR model
//! ([`AbiEntry`], [`TypeExpr`]) consumed by the code generator.
//!
//! # Examples
//!
//! ```
//! use nucleus_abi::{AbiDocument, AbiEntry, Method};
//!
//! let doc = AbiDocument::from_json(r#"[
//!     {"type": "fn", "name": "get_count", "method": "get",
//!      "inputs": [], "output": {"kind": "path", "path": ["u64"]}}
//! ]"#).unwrap();
//!
//! let AbiEntry::Function(f) = &doc.entries[0] else { unreachable!() };
//! assert_eq!(f.method, Method::Get);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod document;
mod fetch;
mod model;

pub use document::{AbiDocument, EntryIssue};
pub use fetch::AbiClient;
pub use model::{AbiEntry, EnumDef, Field, FunctionDef, Method, StructDef, TypeAliasDef, TypeExpr, Variant};
