//! Types for code generation.
//!
//! Defines the generator output, the per-entry issues it reports and the
//! contexts handed to the Handlebars templates.
//!
//! # Examples
//!
//! ```
//! use nucleus_codegen::{GenerationIssue, IssueKind};
//!
//! let issue = GenerationIssue::new("Line", IssueKind::UnresolvedType {
//!     reference: "Missing".to_string(),
//! });
//! assert_eq!(issue.to_string(), "Line: unresolved type 'Missing'");
//! ```

use serde::Serialize;
use std::fmt;

/// Why an ABI entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// Another entry with the same name was declared earlier.
    DuplicateSymbol,
    /// The entry (or one of its parameters) has a name that cannot be declared.
    InvalidIdentifier {
        /// Offending name
        name: String,
    },
    /// A referenced type is neither a built-in, an in-scope generic, nor
    /// another entry.
    UnresolvedType {
        /// Referenced type name
        reference: String,
    },
    /// A generic type was used with the wrong number of arguments.
    GenericArity {
        /// Generic type name
        name: String,
        /// Declared number of parameters
        expected: usize,
        /// Number of arguments supplied
        found: usize,
    },
    /// A referenced entry was itself skipped.
    DependsOnSkipped {
        /// Skipped entry name
        dependency: String,
    },
    /// A type expression has no usable shape, such as an empty path.
    InvalidType {
        /// Description of the problem
        message: String,
    },
    /// Rendering the declaration template failed.
    Template {
        /// Template error message
        message: String,
    },
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSymbol => f.write_str("duplicate symbol"),
            Self::InvalidIdentifier { name } => write!(f, "invalid identifier '{name}'"),
            Self::UnresolvedType { reference } => write!(f, "unresolved type '{reference}'"),
            Self::GenericArity {
                name,
                expected,
                found,
            } => write!(
                f,
                "'{name}' expects {expected} generic argument(s), found {found}"
            ),
            Self::DependsOnSkipped { dependency } => {
                write!(f, "depends on skipped entry '{dependency}'")
            }
            Self::InvalidType { message } => write!(f, "invalid type: {message}"),
            Self::Template { message } => write!(f, "template rendering failed: {message}"),
        }
    }
}

/// A skipped ABI entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationIssue {
    /// Entry name.
    pub entry: String,
    /// Reason.
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl GenerationIssue {
    /// Creates an issue for `entry`.
    #[must_use]
    pub fn new(entry: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            entry: entry.into(),
            kind,
        }
    }
}

impl fmt::Display for GenerationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entry, self.kind)
    }
}

impl From<GenerationIssue> for nucleus_core::Error {
    fn from(issue: GenerationIssue) -> Self {
        match issue.kind {
            IssueKind::DuplicateSymbol => Self::DuplicateSymbol { name: issue.entry },
            kind => Self::Generation {
                entry: issue.entry,
                message: kind.to_string(),
            },
        }
    }
}

/// One rendered declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    /// Entry name.
    pub name: String,
    /// Entry kind tag (`struct`, `enum`, `fn`, `type_alias`).
    pub kind: String,
    /// Rendered source text.
    pub text: String,
}

/// Result of generating source for an ABI document.
///
/// # Examples
///
/// ```
/// use nucleus_codegen::GeneratedSource;
///
/// let source = GeneratedSource::default();
/// assert!(source.is_clean());
/// assert_eq!(source.declaration_count(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedSource {
    /// Complete source text: header followed by declarations in `order`.
    pub text: String,
    /// Emitted entry names in emission order.
    pub order: Vec<String>,
    /// Codec library names imported by the header.
    pub imports: Vec<String>,
    /// Rendered declarations in emission order.
    pub declarations: Vec<Declaration>,
    /// Entries that were skipped.
    pub issues: Vec<GenerationIssue>,
}

impl GeneratedSource {
    /// Returns `true` if no entry was skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of emitted declarations.
    #[must_use]
    pub fn declaration_count(&self) -> usize {
        self.declarations.len()
    }

    /// Position of `name` in the emission order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    /// Returns the issue reported for `entry`, if any.
    #[must_use]
    pub fn issue_for(&self, entry: &str) -> Option<&GenerationIssue> {
        self.issues.iter().find(|issue| issue.entry == entry)
    }
}

/// Template context for the source header.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderContext {
    /// Human-readable origin of the ABI.
    pub source: String,
    /// Codec library module path.
    pub library: String,
    /// Imported codec names.
    pub imports: Vec<String>,
    /// Whether `imports` is non-empty.
    pub has_imports: bool,
}

/// A struct field or enum variant line.
#[derive(Debug, Clone, Serialize)]
pub struct MemberContext {
    /// Property key, quoted when not a plain identifier.
    pub key: String,
    /// Type annotation.
    pub ts_type: String,
    /// Codec expression.
    pub codec: String,
}

/// Template context for a struct entry.
#[derive(Debug, Clone, Serialize)]
pub struct StructContext {
    /// Type name.
    pub name: String,
    /// Generic parameter list including angle brackets, or empty.
    pub generics: String,
    /// Fields.
    pub fields: Vec<MemberContext>,
}

/// Template context for an enum entry.
#[derive(Debug, Clone, Serialize)]
pub struct EnumContext {
    /// Type name.
    pub name: String,
    /// Generic parameter list including angle brackets, or empty.
    pub generics: String,
    /// Union type annotation of all variants.
    pub union: String,
    /// Variants.
    pub variants: Vec<MemberContext>,
}

/// Template context for a type alias entry.
#[derive(Debug, Clone, Serialize)]
pub struct AliasContext {
    /// Alias name.
    pub name: String,
    /// Generic parameter list including angle brackets, or empty.
    pub generics: String,
    /// Type annotation of the target.
    pub ts_type: String,
    /// Codec expression of the target.
    pub codec: String,
}

/// A function parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParamContext {
    /// Parameter name.
    pub name: String,
    /// Type annotation.
    pub ts_type: String,
    /// Codec expression.
    pub codec: String,
}

/// Template context for a function entry.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionContext {
    /// Function and endpoint name.
    pub name: String,
    /// Calling convention.
    pub method: String,
    /// Parameters.
    pub params: Vec<ParamContext>,
    /// Return type annotation.
    pub return_type: String,
    /// Codec expression decoding the result.
    pub output_codec: String,
}
