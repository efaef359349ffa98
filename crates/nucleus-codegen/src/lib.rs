//! Source generation for nucleus ABIs.
//!
//! Converts the TypeIR entries of an ABI document into declarations of the
//! generated-source dialect: an interface and a codec class per struct, a
//! union type and codec class per enum, a type and codec constant per alias,
//! and an async function per callable entry. Declarations are ordered so that
//! every reference points upward.
//!
//! # Examples
//!
//! ```
//! use nucleus_abi::{AbiEntry, Field, FunctionDef, Method, StructDef, TypeExpr};
//! use nucleus_codegen::AbiGenerator;
//!
//! let entries = vec![
//!     AbiEntry::Struct(StructDef {
//!         name: "Point".to_string(),
//!         fields: vec![
//!             Field::new("x", TypeExpr::named("u32")),
//!             Field::new("y", TypeExpr::named("u32")),
//!         ],
//!         generics: vec![],
//!     }),
//!     AbiEntry::Function(FunctionDef {
//!         name: "distance".to_string(),
//!         method: Method::Get,
//!         inputs: vec![
//!             Field::new("a", TypeExpr::named("Point")),
//!             Field::new("b", TypeExpr::named("Point")),
//!         ],
//!         output: Some(TypeExpr::named("u32")),
//!     }),
//! ];
//!
//! let source = AbiGenerator::new().unwrap().generate(&entries).unwrap();
//! assert!(source.is_clean());
//! assert!(source.text.contains("_encode(Point, a), _encode(Point, b)"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod generator;
pub mod render;
pub mod template_engine;
pub mod types;

pub use generator::AbiGenerator;
pub use render::CODEC_LIBRARY;
pub use types::{Declaration, GeneratedSource, GenerationIssue, IssueKind};

/// Generates source for `entries` with a default generator.
///
/// # Errors
///
/// Returns error if the templates cannot be registered or the header cannot
/// be rendered.
pub fn generate(entries: &[nucleus_abi::AbiEntry]) -> nucleus_core::Result<GeneratedSource> {
    AbiGenerator::new()?.generate(entries)
}
