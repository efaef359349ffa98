//! TypeIR model for nucleus ABI documents.
//!
//! The ABI describes a nucleus in a Rust-like type vocabulary: structs, enums,
//! type aliases and callable functions, whose field types are [`TypeExpr`]
//! trees.
//!
//! # Examples
//!
//! ```
//! use nucleus_abi::{AbiEntry, TypeExpr};
//!
//! let entry: AbiEntry = serde_json::from_str(r#"{
//!     "type": "struct",
//!     "name": "Point",
//!     "fields": [
//!         {"name": "x", "ty": {"kind": "path", "path": ["u32"], "generic_args": []}},
//!         {"name": "y", "ty": {"kind": "path", "path": ["u32"], "generic_args": []}}
//!     ],
//!     "generics": []
//! }"#).unwrap();
//!
//! assert_eq!(entry.name(), "Point");
//! assert_eq!(entry.kind(), "struct");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A type expression in the ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    /// A (possibly qualified) named type with generic arguments, e.g.
    /// `alloc::vec::Vec<u8>`.
    Path {
        /// Path segments; the last one is the type name.
        path: Vec<String>,
        /// Generic arguments in declaration order.
        #[serde(default)]
        generic_args: Vec<TypeExpr>,
    },
    /// A tuple; the empty tuple is the unit type.
    Tuple {
        /// Element types.
        #[serde(default)]
        items: Vec<TypeExpr>,
    },
    /// A fixed-length array.
    Array {
        /// Element type.
        elem: Box<TypeExpr>,
        /// Number of elements.
        len: u64,
    },
    /// A reference to another type with its own generic parameter names.
    Alias {
        /// Aliased type.
        target: Box<TypeExpr>,
        /// Generic parameter names.
        #[serde(default)]
        generics: Vec<String>,
    },
}

impl TypeExpr {
    /// Creates a single-segment path without generic arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_abi::TypeExpr;
    ///
    /// let ty = TypeExpr::named("u32");
    /// assert_eq!(ty.to_string(), "u32");
    /// ```
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Path {
            path: vec![name.into()],
            generic_args: Vec::new(),
        }
    }

    /// Creates a single-segment path with generic arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_abi::TypeExpr;
    ///
    /// let ty = TypeExpr::generic("Vec", vec![TypeExpr::named("u8")]);
    /// assert_eq!(ty.to_string(), "Vec<u8>");
    /// ```
    #[must_use]
    pub fn generic(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Path {
            path: vec![name.into()],
            generic_args: args,
        }
    }

    /// Creates a tuple type.
    #[must_use]
    pub const fn tuple(items: Vec<Self>) -> Self {
        Self::Tuple { items }
    }

    /// Creates the unit type `()`.
    #[must_use]
    pub const fn unit() -> Self {
        Self::Tuple { items: Vec::new() }
    }

    /// Creates a fixed-length array type.
    #[must_use]
    pub fn array(elem: Self, len: u64) -> Self {
        Self::Array {
            elem: Box::new(elem),
            len,
        }
    }

    /// Returns `true` for the empty tuple.
    #[must_use]
    pub const fn is_unit(&self) -> bool {
        matches!(self, Self::Tuple { items } if items.is_empty())
    }

    /// Returns the last path segment for path types.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Path { path, .. } => path.last().map(String::as_str),
            _ => None,
        }
    }

    /// Calls `visit` for every path type in this expression, outermost first.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleus_abi::TypeExpr;
    ///
    /// let ty = TypeExpr::generic("Vec", vec![TypeExpr::named("Point")]);
    /// let mut names = Vec::new();
    /// ty.visit_paths(&mut |name, _args| names.push(name.to_string()));
    /// assert_eq!(names, vec!["Vec", "Point"]);
    /// ```
    pub fn visit_paths(&self, visit: &mut dyn FnMut(&str, &[Self])) {
        match self {
            Self::Path { path, generic_args } => {
                if let Some(name) = path.last() {
                    visit(name, generic_args);
                }
                for arg in generic_args {
                    arg.visit_paths(visit);
                }
            }
            Self::Tuple { items } => {
                for item in items {
                    item.visit_paths(visit);
                }
            }
            Self::Array { elem, .. } => elem.visit_paths(visit),
            Self::Alias { target, .. } => target.visit_paths(visit),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path { path, generic_args } => {
                write!(f, "{}", path.join("::"))?;
                if !generic_args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in generic_args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Self::Tuple { items } => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Array { elem, len } => write!(f, "[{elem}; {len}]"),
            Self::Alias { target, .. } => write!(f, "{target}"),
        }
    }
}

/// A named field of a struct, enum variant or function input.
///
/// An empty name marks a positional field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, empty for positional fields.
    #[serde(default)]
    pub name: String,
    /// Field type.
    #[serde(rename = "ty", alias = "type")]
    pub ty: TypeExpr,
}

impl Field {
    /// Creates a field.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Returns `true` if the field has no name.
    #[must_use]
    pub fn is_positional(&self) -> bool {
        self.name.is_empty()
    }
}

/// Calling convention of an ABI function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Constructor-like entry point run by the chain on deployment.
    Init,
    /// Read-only query.
    Get,
    /// State-mutating call.
    Post,
    /// Entry point invoked by the chain itself.
    Callback,
}

impl Method {
    /// Returns the lowercase method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Get => "get",
            Self::Post => "post",
            Self::Callback => "callback",
        }
    }

    /// Returns `true` if users may invoke the function through RPC.
    #[must_use]
    pub const fn is_user_callable(&self) -> bool {
        matches!(self, Self::Get | Self::Post)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = nucleus_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "callback" => Ok(Self::Callback),
            other => Err(nucleus_core::Error::InvalidArgument(format!(
                "unknown method '{other}' (expected: init, get, post, or callback)"
            ))),
        }
    }
}

/// Struct declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    /// Type name.
    pub name: String,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Generic parameter names.
    #[serde(default)]
    pub generics: Vec<String>,
}

/// Enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Variant name.
    pub name: String,
    /// Payload fields; empty for unit variants.
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// Enum declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    /// Type name.
    pub name: String,
    /// Variants in discriminant order.
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Generic parameter names.
    #[serde(default)]
    pub generics: Vec<String>,
}

/// Callable function declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Function name, also the on-chain endpoint name.
    pub name: String,
    /// Calling convention.
    pub method: Method,
    /// Parameters in order.
    #[serde(default)]
    pub inputs: Vec<Field>,
    /// Return type; `None` for functions returning nothing.
    #[serde(default)]
    pub output: Option<TypeExpr>,
}

/// Type alias declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAliasDef {
    /// Alias name.
    pub name: String,
    /// Generic parameter names.
    #[serde(default)]
    pub generics: Vec<String>,
    /// Aliased type.
    pub target: TypeExpr,
}

/// One entry of an ABI document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AbiEntry {
    /// A struct type.
    Struct(StructDef),
    /// An enum type.
    Enum(EnumDef),
    /// A callable function.
    #[serde(rename = "fn")]
    Function(FunctionDef),
    /// A type alias.
    TypeAlias(TypeAliasDef),
}

impl AbiEntry {
    /// Returns the entry name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Struct(def) => &def.name,
            Self::Enum(def) => &def.name,
            Self::Function(def) => &def.name,
            Self::TypeAlias(def) => &def.name,
        }
    }

    /// Returns the serialized tag of the entry kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Struct(_) => "struct",
            Self::Enum(_) => "enum",
            Self::Function(_) => "fn",
            Self::TypeAlias(_) => "type_alias",
        }
    }

    /// Returns the generic parameter names; functions have none.
    #[must_use]
    pub fn generics(&self) -> &[String] {
        match self {
            Self::Struct(def) => &def.generics,
            Self::Enum(def) => &def.generics,
            Self::TypeAlias(def) => &def.generics,
            Self::Function(_) => &[],
        }
    }

    /// Returns `true` for struct, enum and alias entries.
    #[must_use]
    pub const fn is_type(&self) -> bool {
        !matches!(self, Self::Function(_))
    }

    /// Returns every type expression the entry mentions, in declaration order.
    #[must_use]
    pub fn type_exprs(&self) -> Vec<&TypeExpr> {
        match self {
            Self::Struct(def) => def.fields.iter().map(|f| &f.ty).collect(),
            Self::Enum(def) => def
                .variants
                .iter()
                .flat_map(|v| v.fields.iter().map(|f| &f.ty))
                .collect(),
            Self::Function(def) => def
                .inputs
                .iter()
                .map(|f| &f.ty)
                .chain(def.output.iter())
                .collect(),
            Self::TypeAlias(def) => vec![&def.target],
        }
    }
}
