//! Tree-walking evaluation of codec expressions and function bodies.

use indexmap::IndexMap;
use nucleus_abi::Method;
use nucleus_core::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::codec::{
    CodecDef, CodecRegistry, CodecTemplate, Factory, FactoryArg, Primitive, RegistryEntry,
    library,
};
use crate::symbols::{Symbol, SymbolTable};
use crate::syntax::{Expr, FunctionDecl, Stmt};

/// Name of the host object generated helpers call into.
pub const HOST_OBJECT: &str = "Nucleus";

const MAX_CALL_DEPTH: usize = 64;

/// A request built by a bound function, ready to send to a nucleus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    /// Calling convention.
    pub method: Method,
    /// Endpoint name.
    pub endpoint: String,
    /// Concatenated SCALE-encoded arguments.
    #[serde(serialize_with = "serialize_hex")]
    pub payload: Vec<u8>,
    /// Codec of the reply.
    pub output: CodecDef,
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
}

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtValue {
    /// Plain JSON data.
    Data(Value),
    /// Encoded bytes.
    Bytes(Vec<u8>),
    /// An array of runtime values.
    List(Vec<RtValue>),
    /// An object of runtime values.
    Record(IndexMap<String, RtValue>),
    /// A concrete codec.
    Codec(CodecDef),
    /// A generic codec.
    Template(CodecTemplate),
    /// A library factory.
    Factory(Factory),
    /// A function.
    Function(Arc<FunctionDecl>),
    /// The nucleus host object.
    Host,
    /// A prepared nucleus call.
    Call(CallRequest),
}

impl RtValue {
    /// Short kind label used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Record(_) => "record",
            Self::Codec(_) => "codec",
            Self::Template(_) => "generic codec",
            Self::Factory(_) => "factory",
            Self::Function(_) => "function",
            Self::Host => "host",
            Self::Call(_) => "call",
        }
    }

    /// Converts a codec-like value into a registry entry.
    ///
    /// # Errors
    ///
    /// Returns error for values that are not codecs.
    pub fn into_entry(self) -> Result<RegistryEntry> {
        match self {
            Self::Codec(def) => Ok(RegistryEntry::Codec(def)),
            Self::Template(template) => Ok(RegistryEntry::Template(template)),
            Self::Factory(factory) => Ok(RegistryEntry::Factory(factory)),
            other => Err(evaluation(format!(
                "expected a codec, found {}",
                other.kind()
            ))),
        }
    }

    /// Converts data values into JSON.
    ///
    /// # Errors
    ///
    /// Returns error for codecs, functions and other non-data values.
    pub fn into_json(self) -> Result<Value> {
        match self {
            Self::Data(value) => Ok(value),
            Self::Bytes(bytes) => Ok(Value::String(format!("0x{}", hex::encode(bytes)))),
            Self::List(items) => items
                .into_iter()
                .map(Self::into_json)
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Self::Record(fields) => fields
                .into_iter()
                .map(|(key, value)| value.into_json().map(|v| (key, v)))
                .collect::<Result<serde_json::Map<_, _>>>()
                .map(Value::Object),
            other => Err(evaluation(format!("{} is not data", other.kind()))),
        }
    }
}

fn evaluation(message: impl Into<String>) -> Error {
    Error::Evaluation {
        message: message.into(),
    }
}

/// How identifiers that resolve to nothing are treated.
#[derive(Debug, Clone, Copy)]
pub enum Unresolved<'a> {
    /// Fail evaluation.
    Fail,
    /// Turn every unknown name into a lazy codec reference.
    Defer,
    /// Turn only these names into lazy codec references.
    DeferOnly(&'a HashSet<String>),
}

/// Evaluates expressions against the bound symbols of one session.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    registry: &'a CodecRegistry,
    symbols: &'a SymbolTable,
    generics: &'a [String],
    unresolved: Unresolved<'a>,
}

type Scope = HashMap<String, RtValue>;

impl<'a> Evaluator<'a> {
    /// Creates a strict evaluator.
    #[must_use]
    pub const fn new(registry: &'a CodecRegistry, symbols: &'a SymbolTable) -> Self {
        Self {
            registry,
            symbols,
            generics: &[],
            unresolved: Unresolved::Fail,
        }
    }

    /// Treats `generics` as template parameters.
    #[must_use]
    pub const fn with_generics(mut self, generics: &'a [String]) -> Self {
        self.generics = generics;
        self
    }

    /// Sets how unknown identifiers are treated.
    #[must_use]
    pub const fn with_unresolved(mut self, unresolved: Unresolved<'a>) -> Self {
        self.unresolved = unresolved;
        self
    }

    /// Evaluates a standalone expression.
    ///
    /// # Errors
    ///
    /// Returns error if a name cannot be resolved or an operation does not
    /// apply to its operands.
    pub fn eval(&self, expr: &Expr) -> Result<RtValue> {
        self.eval_in(expr, &Scope::new(), 0)
    }

    /// Calls `function` with positional arguments.
    ///
    /// # Errors
    ///
    /// Returns error if the body fails to evaluate or calls nest too deeply.
    pub fn call(&self, function: &FunctionDecl, args: Vec<RtValue>) -> Result<RtValue> {
        self.call_at(function, args, 0)
    }

    fn call_at(&self, function: &FunctionDecl, args: Vec<RtValue>, depth: usize) -> Result<RtValue> {
        if depth > MAX_CALL_DEPTH {
            return Err(evaluation(format!(
                "call depth exceeds {MAX_CALL_DEPTH} in '{}'",
                function.name
            )));
        }

        let mut args = args.into_iter();
        let mut scope: Scope = function
            .params
            .iter()
            .map(|param| {
                (
                    param.name.clone(),
                    args.next().unwrap_or(RtValue::Data(Value::Null)),
                )
            })
            .collect();

        for stmt in &function.body {
            match stmt {
                Stmt::Let { name, value } => {
                    let value = self.eval_in(value, &scope, depth)?;
                    scope.insert(name.clone(), value);
                }
                Stmt::Return(Some(value)) => return self.eval_in(value, &scope, depth),
                Stmt::Return(None) => return Ok(RtValue::Data(Value::Null)),
                Stmt::Expr(value) => {
                    self.eval_in(value, &scope, depth)?;
                }
            }
        }
        Ok(RtValue::Data(Value::Null))
    }

    fn eval_in(&self, expr: &Expr, scope: &Scope, depth: usize) -> Result<RtValue> {
        match expr {
            Expr::Ident(name) => self.lookup(name, scope),
            Expr::Number(text) => serde_json::from_str::<Value>(text)
                .map(RtValue::Data)
                .map_err(|e| evaluation(format!("invalid number '{text}': {e}"))),
            Expr::Str(text) => Ok(RtValue::Data(Value::String(text.clone()))),
            Expr::Bool(flag) => Ok(RtValue::Data(Value::Bool(*flag))),
            Expr::Null => Ok(RtValue::Data(Value::Null)),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval_in(item, scope, depth))
                .collect::<Result<Vec<_>>>()
                .map(RtValue::List),
            Expr::Object(entries) => entries
                .iter()
                .map(|(key, value)| Ok((key.clone(), self.eval_in(value, scope, depth)?)))
                .collect::<Result<IndexMap<_, _>>>()
                .map(RtValue::Record),
            Expr::Member { object, property } => {
                let receiver = self.eval_in(object, scope, depth)?;
                member(receiver, property)
            }
            Expr::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval_in(arg, scope, depth))
                    .collect::<Result<Vec<_>>>()?;
                if let Expr::Member { object, property } = callee.as_ref() {
                    let receiver = self.eval_in(object, scope, depth)?;
                    return self.call_method(receiver, property, args);
                }
                match self.eval_in(callee, scope, depth)? {
                    RtValue::Function(function) => self.call_at(&function, args, depth + 1),
                    other => Err(evaluation(format!("{} is not callable", other.kind()))),
                }
            }
            Expr::Await(inner) => self.eval_in(inner, scope, depth),
        }
    }

    fn lookup(&self, name: &str, scope: &Scope) -> Result<RtValue> {
        if let Some(value) = scope.get(name) {
            return Ok(value.clone());
        }
        if self.generics.iter().any(|g| g == name) {
            return Ok(RtValue::Codec(CodecDef::Param(name.to_string())));
        }
        match self.symbols.get(name) {
            Some(Symbol::Helper(decl)) => return Ok(RtValue::Function(Arc::clone(decl))),
            Some(Symbol::Function(function)) => {
                return Ok(RtValue::Function(Arc::clone(function.decl())));
            }
            Some(Symbol::Codec(_)) | None => {}
        }
        if let Some(entry) = self.registry.get(name) {
            return Ok(entry_value(entry.clone()));
        }
        if let Some(entry) = library::lookup(name) {
            return Ok(entry_value(entry));
        }
        if name == HOST_OBJECT {
            return Ok(RtValue::Host);
        }

        let defer = match self.unresolved {
            Unresolved::Fail => false,
            Unresolved::Defer => true,
            Unresolved::DeferOnly(names) => names.contains(name),
        };
        if defer {
            Ok(RtValue::Codec(CodecDef::reference(name)))
        } else {
            Err(Error::SymbolNotFound {
                name: name.to_string(),
            })
        }
    }

    fn call_method(&self, receiver: RtValue, method: &str, args: Vec<RtValue>) -> Result<RtValue> {
        match (method, receiver) {
            ("with", RtValue::Factory(factory)) => {
                let args = args
                    .into_iter()
                    .map(factory_arg)
                    .collect::<Result<Vec<_>>>()?;
                Ok(RtValue::Codec(factory.apply(args)?))
            }
            ("with", RtValue::Template(template)) => {
                let args = codec_args(args)?;
                Ok(RtValue::Codec(template.instantiate(&args)?))
            }
            ("with", RtValue::Codec(CodecDef::Ref { name, args: bound })) if bound.is_empty() => {
                Ok(RtValue::Codec(CodecDef::Ref {
                    name,
                    args: codec_args(args)?,
                }))
            }
            ("with", RtValue::Codec(CodecDef::Primitive(primitive))) => {
                resize_integer(primitive, &args).map(RtValue::Codec)
            }
            ("encode", RtValue::Codec(def)) => {
                let [value] = one_arg(args, "encode")?;
                let bytes = self.registry.encode_with(&def, &value.into_json()?)?;
                Ok(RtValue::Bytes(bytes))
            }
            ("decode", RtValue::Codec(def)) => {
                let bytes = match one_arg(args, "decode")? {
                    [RtValue::Bytes(bytes)] => bytes,
                    [RtValue::Data(Value::String(text))] => {
                        hex::decode(text.trim_start_matches("0x"))
                            .map_err(|e| evaluation(format!("invalid hex: {e}")))?
                    }
                    [other] => {
                        return Err(evaluation(format!("cannot decode {}", other.kind())));
                    }
                };
                Ok(RtValue::Data(self.registry.decode_with(&def, &bytes)?))
            }
            ("request", RtValue::Host) => request(args).map(RtValue::Call),
            (method, receiver) => Err(evaluation(format!(
                "'{method}' is not a method of {}",
                describe(&receiver)
            ))),
        }
    }
}

fn describe(value: &RtValue) -> String {
    match value {
        RtValue::Codec(def) => format!("codec {def}"),
        RtValue::Template(template) => format!("generic codec {}", template.name),
        RtValue::Factory(factory) => format!("factory {}", factory.name()),
        other => other.kind().to_string(),
    }
}

fn entry_value(entry: RegistryEntry) -> RtValue {
    match entry {
        RegistryEntry::Codec(def) => RtValue::Codec(def),
        RegistryEntry::Template(template) => RtValue::Template(template),
        RegistryEntry::Factory(factory) => RtValue::Factory(factory),
    }
}

fn member(receiver: RtValue, property: &str) -> Result<RtValue> {
    match receiver {
        RtValue::Data(Value::Object(mut map)) => Ok(RtValue::Data(
            map.remove(property).unwrap_or(Value::Null),
        )),
        RtValue::Record(mut fields) => Ok(fields
            .shift_remove(property)
            .unwrap_or(RtValue::Data(Value::Null))),
        other => Err(evaluation(format!(
            "'{property}' is not a property of {}",
            describe(&other)
        ))),
    }
}

fn one_arg(args: Vec<RtValue>, method: &str) -> Result<[RtValue; 1]> {
    <[RtValue; 1]>::try_from(args).map_err(|args| {
        evaluation(format!(
            "{method} expects 1 argument, found {}",
            args.len()
        ))
    })
}

fn codec_arg(value: RtValue) -> Result<CodecDef> {
    match value {
        RtValue::Codec(def) => Ok(def),
        RtValue::Template(template) => Err(evaluation(format!(
            "generic codec {} must be applied with .with(..)",
            template.name
        ))),
        other => Err(evaluation(format!(
            "expected a codec argument, found {}",
            describe(&other)
        ))),
    }
}

fn codec_args(args: Vec<RtValue>) -> Result<Vec<CodecDef>> {
    args.into_iter().map(codec_arg).collect()
}

fn factory_arg(value: RtValue) -> Result<FactoryArg> {
    match value {
        RtValue::Data(Value::Number(number)) => number
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(FactoryArg::Length)
            .ok_or_else(|| evaluation(format!("{number} is not a length"))),
        RtValue::Record(fields) => fields
            .into_iter()
            .map(|(name, value)| Ok((name, codec_arg(value)?)))
            .collect::<Result<IndexMap<_, _>>>()
            .map(FactoryArg::Fields),
        RtValue::List(items) => items
            .into_iter()
            .map(|item| match item {
                RtValue::Data(Value::String(name)) => Ok(name),
                other => Err(evaluation(format!(
                    "expected a variant name, found {}",
                    other.kind()
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(FactoryArg::Names),
        other => codec_arg(other).map(FactoryArg::Codec),
    }
}

/// `U32.with(bits)` selects the integer codec of the same signedness with
/// the given width.
fn resize_integer(primitive: Primitive, args: &[RtValue]) -> Result<CodecDef> {
    let Some((_, signed)) = primitive.integer() else {
        return Err(evaluation(format!("{} is not generic", primitive.name())));
    };
    let bits = match args {
        [RtValue::Data(Value::Number(bits))] => bits.as_u64().and_then(|b| u32::try_from(b).ok()),
        _ => None,
    };
    bits.and_then(|bits| Primitive::from_integer(bits, signed))
        .map(CodecDef::Primitive)
        .ok_or_else(|| {
            evaluation(format!(
                "{}.with expects a bit width of 8, 16, 32, 64 or 128",
                primitive.name()
            ))
        })
}

fn request(args: Vec<RtValue>) -> Result<CallRequest> {
    let [method, endpoint, output, payload] = <[RtValue; 4]>::try_from(args).map_err(|args| {
        evaluation(format!(
            "{HOST_OBJECT}.request expects 4 arguments, found {}",
            args.len()
        ))
    })?;

    let method: Method = match method {
        RtValue::Data(Value::String(text)) => text.parse()?,
        other => return Err(evaluation(format!("invalid call method: {}", other.kind()))),
    };
    let RtValue::Data(Value::String(endpoint)) = endpoint else {
        return Err(evaluation("call endpoint must be a string"));
    };
    let output = codec_arg(output)?;

    let parts = match payload {
        RtValue::List(items) => items,
        RtValue::Bytes(bytes) => vec![RtValue::Bytes(bytes)],
        other => return Err(evaluation(format!("invalid call payload: {}", other.kind()))),
    };
    let mut bytes = Vec::new();
    for part in parts {
        match part {
            RtValue::Bytes(encoded) => bytes.extend_from_slice(&encoded),
            other => {
                return Err(evaluation(format!(
                    "call arguments must be encoded, found {}",
                    other.kind()
                )));
            }
        }
    }

    Ok(CallRequest {
        method,
        endpoint,
        payload: bytes,
        output,
    })
}
