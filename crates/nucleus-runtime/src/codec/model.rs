//! Codec descriptors.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use super::CodecError;

/// A fixed-size or self-describing primitive codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Primitive {
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// Unsigned 128-bit integer.
    U128,
    /// Signed 8-bit integer.
    I8,
    /// Signed 16-bit integer.
    I16,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// Signed 128-bit integer.
    I128,
    /// One byte, `0` or `1`.
    Bool,
    /// Length-prefixed UTF-8.
    Text,
    /// 20-byte hash.
    H160,
    /// 32-byte hash.
    H256,
    /// 32-byte account id.
    AccountId,
    /// Length-prefixed raw bytes.
    Bytes,
}

impl Primitive {
    /// Library name of the codec.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "U8",
            Self::U16 => "U16",
            Self::U32 => "U32",
            Self::U64 => "U64",
            Self::U128 => "U128",
            Self::I8 => "I8",
            Self::I16 => "I16",
            Self::I32 => "I32",
            Self::I64 => "I64",
            Self::I128 => "I128",
            Self::Bool => "Bool",
            Self::Text => "Text",
            Self::H160 => "H160",
            Self::H256 => "H256",
            Self::AccountId => "AccountId",
            Self::Bytes => "Bytes",
        }
    }

    /// Bit width and signedness of integer codecs.
    #[must_use]
    pub const fn integer(self) -> Option<(u32, bool)> {
        match self {
            Self::U8 => Some((8, false)),
            Self::U16 => Some((16, false)),
            Self::U32 => Some((32, false)),
            Self::U64 => Some((64, false)),
            Self::U128 => Some((128, false)),
            Self::I8 => Some((8, true)),
            Self::I16 => Some((16, true)),
            Self::I32 => Some((32, true)),
            Self::I64 => Some((64, true)),
            Self::I128 => Some((128, true)),
            _ => None,
        }
    }

    /// The integer codec with the given width and signedness.
    #[must_use]
    pub const fn from_integer(bits: u32, signed: bool) -> Option<Self> {
        Some(match (bits, signed) {
            (8, false) => Self::U8,
            (16, false) => Self::U16,
            (32, false) => Self::U32,
            (64, false) => Self::U64,
            (128, false) => Self::U128,
            (8, true) => Self::I8,
            (16, true) => Self::I16,
            (32, true) => Self::I32,
            (64, true) => Self::I64,
            (128, true) => Self::I128,
            _ => return None,
        })
    }

    /// Byte length of fixed-size hash codecs.
    #[must_use]
    pub const fn fixed_bytes(self) -> Option<usize> {
        match self {
            Self::H160 => Some(20),
            Self::H256 | Self::AccountId => Some(32),
            _ => None,
        }
    }
}

/// Structural description of a codec.
///
/// `Ref` and `Param` are placeholders: a `Ref` is resolved by name when data
/// is encoded or decoded, a `Param` is replaced when a template is
/// instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "codec", content = "of", rename_all = "snake_case")]
pub enum CodecDef {
    /// A primitive codec.
    Primitive(Primitive),
    /// Encodes nothing.
    Null,
    /// Named fields, encoded in order.
    Struct(IndexMap<String, CodecDef>),
    /// Variants by index, each with a payload codec.
    Enum(IndexMap<String, CodecDef>),
    /// Length-prefixed sequence.
    Vec(Box<CodecDef>),
    /// Optional value.
    Option(Box<CodecDef>),
    /// `Ok` or `Err` value.
    Result(Box<CodecDef>, Box<CodecDef>),
    /// Fixed sequence of heterogeneous codecs.
    Tuple(Vec<CodecDef>),
    /// Fixed-length sequence without a length prefix.
    FixedArray(usize, Box<CodecDef>),
    /// Fixed-length raw bytes.
    FixedBytes(usize),
    /// Length-prefixed key/value pairs.
    BTreeMap(Box<CodecDef>, Box<CodecDef>),
    /// Compact-encoded unsigned integer.
    Compact(Box<CodecDef>),
    /// A codec registered under `name`, applied to `args` when generic.
    Ref {
        /// Registered name.
        name: String,
        /// Generic arguments.
        args: Vec<CodecDef>,
    },
    /// A template parameter.
    Param(String),
}

impl CodecDef {
    /// A lazy reference to a registered, non-generic codec.
    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Ref {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Replaces template parameters found in `bindings`.
    #[must_use]
    pub fn substitute(&self, bindings: &IndexMap<String, Self>) -> Self {
        let sub = |def: &Self| Box::new(def.substitute(bindings));
        match self {
            Self::Param(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Struct(fields) => Self::Struct(substitute_map(fields, bindings)),
            Self::Enum(variants) => Self::Enum(substitute_map(variants, bindings)),
            Self::Vec(inner) => Self::Vec(sub(inner)),
            Self::Option(inner) => Self::Option(sub(inner)),
            Self::Result(ok, err) => Self::Result(sub(ok), sub(err)),
            Self::Tuple(items) => Self::Tuple(items.iter().map(|i| i.substitute(bindings)).collect()),
            Self::FixedArray(len, inner) => Self::FixedArray(*len, sub(inner)),
            Self::BTreeMap(key, value) => Self::BTreeMap(sub(key), sub(value)),
            Self::Compact(inner) => Self::Compact(sub(inner)),
            Self::Ref { name, args } => Self::Ref {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            Self::Primitive(_) | Self::Null | Self::FixedBytes(_) => self.clone(),
        }
    }

    /// Calls `visit` with every lazy reference, outermost first.
    pub fn visit_refs(&self, visit: &mut dyn FnMut(&str)) {
        match self {
            Self::Ref { name, args } => {
                visit(name);
                for arg in args {
                    arg.visit_refs(visit);
                }
            }
            Self::Struct(fields) | Self::Enum(fields) => {
                for def in fields.values() {
                    def.visit_refs(visit);
                }
            }
            Self::Vec(inner) | Self::Option(inner) | Self::FixedArray(_, inner) | Self::Compact(inner) => {
                inner.visit_refs(visit);
            }
            Self::Result(a, b) | Self::BTreeMap(a, b) => {
                a.visit_refs(visit);
                b.visit_refs(visit);
            }
            Self::Tuple(items) => {
                for item in items {
                    item.visit_refs(visit);
                }
            }
            Self::Primitive(_) | Self::Null | Self::FixedBytes(_) | Self::Param(_) => {}
        }
    }
}

fn substitute_map(
    map: &IndexMap<String, CodecDef>,
    bindings: &IndexMap<String, CodecDef>,
) -> IndexMap<String, CodecDef> {
    map.iter()
        .map(|(key, def)| (key.clone(), def.substitute(bindings)))
        .collect()
}

impl fmt::Display for CodecDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => f.write_str(primitive.name()),
            Self::Null => f.write_str("Null"),
            Self::Struct(fields) => write!(f, "Struct.with({{ {} }})", fields_text(fields)),
            Self::Enum(variants) => write!(f, "Enum.with({{ {} }})", fields_text(variants)),
            Self::Vec(inner) => write!(f, "Vec.with({inner})"),
            Self::Option(inner) => write!(f, "Option.with({inner})"),
            Self::Result(ok, err) => write!(f, "Result.with({ok}, {err})"),
            Self::Tuple(items) => write!(f, "Tuple.with({})", list_text(items)),
            Self::FixedArray(len, inner) => write!(f, "FixedArray.with({len}, {inner})"),
            Self::FixedBytes(len) => write!(f, "FixedBytes.with({len})"),
            Self::BTreeMap(key, value) => write!(f, "BTreeMap.with({key}, {value})"),
            Self::Compact(inner) => write!(f, "Compact.with({inner})"),
            Self::Ref { name, args } if args.is_empty() => f.write_str(name),
            Self::Ref { name, args } => write!(f, "{name}.with({})", list_text(args)),
            Self::Param(name) => f.write_str(name),
        }
    }
}

fn fields_text(fields: &IndexMap<String, CodecDef>) -> String {
    fields
        .iter()
        .map(|(name, def)| format!("{name}: {def}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn list_text(items: &[CodecDef]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A generic codec, instantiated with `Name.with(A, B)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodecTemplate {
    /// Registered name.
    pub name: String,
    /// Parameter names.
    pub params: Vec<String>,
    /// Body containing [`CodecDef::Param`] placeholders.
    pub body: CodecDef,
}

impl CodecTemplate {
    /// Substitutes `args` for the parameters.
    ///
    /// # Errors
    ///
    /// Returns error if the number of arguments differs from the number of
    /// parameters.
    pub fn instantiate(&self, args: &[CodecDef]) -> Result<CodecDef, CodecError> {
        if args.len() != self.params.len() {
            return Err(CodecError::Arity {
                codec: self.name.clone(),
                expected: self.params.len(),
                found: args.len(),
            });
        }
        let bindings: IndexMap<String, CodecDef> = self
            .params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        Ok(self.body.substitute(&bindings))
    }
}

/// A library constructor applied with `.with(..)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Factory {
    /// `Vec.with(T)`
    Vec,
    /// `Option.with(T)`
    Option,
    /// `Result.with(T, E)`
    Result,
    /// `Tuple.with(A, B, ..)`
    Tuple,
    /// `FixedArray.with(len, T)`
    FixedArray,
    /// `FixedBytes.with(len)`
    FixedBytes,
    /// `BTreeMap.with(K, V)`
    BTreeMap,
    /// `Compact.with(T)`
    Compact,
    /// `Struct.with({ a: A })`, also the base of struct classes.
    Struct,
    /// `Enum.with({ A: T })` or `Enum.with(["A", "B"])`, also the base of
    /// enum classes.
    Enum,
}

/// An argument to a factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryArg {
    /// A codec.
    Codec(CodecDef),
    /// A length or bit width.
    Length(usize),
    /// Named codecs, for structs and enums.
    Fields(IndexMap<String, CodecDef>),
    /// Variant names of a unit enum.
    Names(Vec<String>),
}

impl Factory {
    /// Library name of the factory.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vec => "Vec",
            Self::Option => "Option",
            Self::Result => "Result",
            Self::Tuple => "Tuple",
            Self::FixedArray => "FixedArray",
            Self::FixedBytes => "FixedBytes",
            Self::BTreeMap => "BTreeMap",
            Self::Compact => "Compact",
            Self::Struct => "Struct",
            Self::Enum => "Enum",
        }
    }

    /// Builds the codec described by `args`.
    ///
    /// # Errors
    ///
    /// Returns error if the arguments do not match the factory's shape.
    pub fn apply(self, args: Vec<FactoryArg>) -> Result<CodecDef, CodecError> {
        let mut args = args.into_iter();
        let def = match self {
            Self::Vec => CodecDef::Vec(Box::new(self.codec(args.next())?)),
            Self::Option => CodecDef::Option(Box::new(self.codec(args.next())?)),
            Self::Compact => CodecDef::Compact(Box::new(self.codec(args.next())?)),
            Self::Result => {
                let ok = self.codec(args.next())?;
                CodecDef::Result(Box::new(ok), Box::new(self.codec(args.next())?))
            }
            Self::BTreeMap => {
                let key = self.codec(args.next())?;
                CodecDef::BTreeMap(Box::new(key), Box::new(self.codec(args.next())?))
            }
            Self::Tuple => {
                let items = args
                    .by_ref()
                    .map(|arg| self.codec(Some(arg)))
                    .collect::<Result<Vec<_>, _>>()?;
                if items.is_empty() {
                    CodecDef::Null
                } else {
                    CodecDef::Tuple(items)
                }
            }
            Self::FixedArray => {
                let len = self.length(args.next())?;
                CodecDef::FixedArray(len, Box::new(self.codec(args.next())?))
            }
            Self::FixedBytes => CodecDef::FixedBytes(self.length(args.next())?),
            Self::Struct => match args.next() {
                Some(FactoryArg::Fields(fields)) => CodecDef::Struct(fields),
                other => return Err(self.invalid(other.as_ref(), "a field object")),
            },
            Self::Enum => match args.next() {
                Some(FactoryArg::Fields(variants)) => CodecDef::Enum(variants),
                Some(FactoryArg::Names(names)) => CodecDef::Enum(
                    names.into_iter().map(|name| (name, CodecDef::Null)).collect(),
                ),
                other => return Err(self.invalid(other.as_ref(), "a variant object or name list")),
            },
        };

        let extra = args.count();
        if extra > 0 {
            return Err(CodecError::InvalidArgument(format!(
                "{}.with received {extra} unexpected argument(s)",
                self.name()
            )));
        }
        Ok(def)
    }

    fn codec(self, arg: Option<FactoryArg>) -> Result<CodecDef, CodecError> {
        match arg {
            Some(FactoryArg::Codec(def)) => Ok(def),
            other => Err(self.invalid(other.as_ref(), "a codec")),
        }
    }

    fn length(self, arg: Option<FactoryArg>) -> Result<usize, CodecError> {
        match arg {
            Some(FactoryArg::Length(len)) => Ok(len),
            other => Err(self.invalid(other.as_ref(), "a length")),
        }
    }

    fn invalid(self, found: Option<&FactoryArg>, expected: &str) -> CodecError {
        let found = match found {
            None => "nothing",
            Some(FactoryArg::Codec(_)) => "a codec",
            Some(FactoryArg::Length(_)) => "a number",
            Some(FactoryArg::Fields(_)) => "an object",
            Some(FactoryArg::Names(_)) => "a list",
        };
        CodecError::InvalidArgument(format!(
            "{}.with expected {expected}, found {found}",
            self.name()
        ))
    }
}

/// A value stored in a codec registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "entry", content = "value", rename_all = "snake_case")]
pub enum RegistryEntry {
    /// A concrete codec.
    Codec(CodecDef),
    /// A generic codec.
    Template(CodecTemplate),
    /// A library factory.
    Factory(Factory),
}

impl fmt::Display for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(def) => write!(f, "{def}"),
            Self::Template(template) => {
                write!(f, "<{}> {}", template.params.join(", "), template.body)
            }
            Self::Factory(factory) => write!(f, "{}.with", factory.name()),
        }
    }
}
