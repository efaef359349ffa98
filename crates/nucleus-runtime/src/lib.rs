//! Runtime binding of generated nucleus source.
//!
//! Generated source is parsed into a syntax tree, bound in five passes into
//! a per-session [`codec::CodecRegistry`] and [`SymbolTable`], and evaluated by
//! a small interpreter when a function is called. Function arguments can be
//! edited through [`args::ArgumentForm`] before the call is sent through a
//! [`NucleusHost`].
//!
//! # Architecture
//!
//! - `syntax`: `logos` lexer and recursive-descent parser
//! - `codec`: SCALE codec model, library and registry
//! - `binder`: helper, import, class, constant and function passes
//! - `eval`: expression and function-body interpreter
//! - `args`: editable argument trees
//! - `host`: call transport, including JSON-RPC
//! - `session`: owns everything bound from one source
//!
//! # Examples
//!
//! ```
//! use nucleus_runtime::Session;
//! use serde_json::json;
//!
//! let session = Session::bind_source(r#"
//!     import { Struct, U8, U16 } from "@nucleus/codec";
//!     function _encode(codec, value) { return codec.encode(value); }
//!     function _call(method, name, output, args) { return Nucleus.request(method, name, output, args); }
//!     export class Pixel extends Struct { x: U16; y: U16; shade: U8; }
//!     export async function paint(p: Pixel): null {
//!         return _call("post", "paint", Null, [_encode(Pixel, p)]);
//!     }
//! "#);
//!
//! assert!(session.report().is_clean());
//! let call = session
//!     .prepare_call("paint", &json!({"p": {"x": 1, "y": 2, "shade": 3}}))
//!     .unwrap();
//! assert_eq!(call.payload, vec![1, 0, 2, 0, 3]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod args;
pub mod binder;
pub mod codec;
pub mod eval;
pub mod host;
pub mod session;
pub mod symbols;
pub mod syntax;

pub use args::{ArgNode, ArgumentForm, InterfaceTable};
pub use binder::{BindReport, Binder, BindingFailure, Pass};
pub use codec::{CodecDef, CodecError, CodecRegistry};
pub use eval::CallRequest;
pub use host::{NucleusHost, RpcNucleusHost};
pub use session::Session;
pub use symbols::{BoundFunction, Symbol, SymbolTable};
