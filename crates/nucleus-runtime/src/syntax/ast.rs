//! Syntax tree of the generated-source dialect.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::ParseError;

/// A parsed source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Module {
    /// Top-level items in source order.
    pub items: Vec<Item>,
    /// Items that failed to parse.
    pub errors: Vec<ParseError>,
}

impl Module {
    /// Iterates over the function declarations.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(function) => Some(function),
            _ => None,
        })
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "item", rename_all = "snake_case")]
pub enum Item {
    /// `import { A, B as C } from "module";`
    Import(ImportDecl),
    /// `export async function name(..) { .. }`
    Function(FunctionDecl),
    /// `export class Name extends Base { .. }`
    Class(ClassDecl),
    /// `export const Name = expr;`
    Const(ConstDecl),
    /// `export interface Name { .. }`
    Interface(InterfaceDecl),
    /// `export type Name = annotation;`
    TypeAlias(TypeAliasDecl),
}

impl Item {
    /// Declared name; imports have none.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Import(_) => None,
            Self::Function(f) => Some(&f.name),
            Self::Class(c) => Some(&c.name),
            Self::Const(c) => Some(&c.name),
            Self::Interface(i) => Some(&i.name),
            Self::TypeAlias(t) => Some(&t.name),
        }
    }
}

/// One imported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportName {
    /// Name exported by the module.
    pub imported: String,
    /// Local binding, equal to `imported` unless aliased with `as`.
    pub local: String,
}

/// An import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportDecl {
    /// Imported names.
    pub names: Vec<ImportName>,
    /// Module specifier.
    pub module: String,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Annotation, if present.
    pub ty: Option<TypeAnn>,
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDecl {
    /// Function name.
    pub name: String,
    /// Declared with `export`.
    pub exported: bool,
    /// Declared with `async`.
    pub is_async: bool,
    /// Parameters in order.
    pub params: Vec<Param>,
    /// Return annotation.
    pub return_type: Option<TypeAnn>,
    /// Body statements.
    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    /// Free identifiers of the body, in first-use order.
    ///
    /// Parameters and locals declared before their use are bound.
    #[must_use]
    pub fn free_identifiers(&self) -> Vec<String> {
        let mut bound: Vec<String> = self.params.iter().map(|p| p.name.clone()).collect();
        let mut free = Vec::new();
        for stmt in &self.body {
            match stmt {
                Stmt::Let { name, value } => {
                    value.collect_identifiers(&bound, &mut free);
                    bound.push(name.clone());
                }
                Stmt::Return(Some(value)) | Stmt::Expr(value) => {
                    value.collect_identifiers(&bound, &mut free);
                }
                Stmt::Return(None) => {}
            }
        }
        free
    }
}

/// A class member, `name: expr;`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassMember {
    /// Member name.
    pub name: String,
    /// Codec expression.
    pub value: Expr,
}

/// A class declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassDecl {
    /// Class name.
    pub name: String,
    /// Generic parameters.
    pub generics: Vec<String>,
    /// Base class named after `extends`.
    pub base: String,
    /// Members in declaration order.
    pub members: Vec<ClassMember>,
}

/// A constant declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstDecl {
    /// Constant name.
    pub name: String,
    /// Generic parameters.
    pub generics: Vec<String>,
    /// Annotation, if present.
    pub ty: Option<TypeAnn>,
    /// Right-hand side.
    pub value: Expr,
}

/// A field of an interface or object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceField {
    /// Field name.
    pub name: String,
    /// Declared with `?`.
    pub optional: bool,
    /// Field type.
    pub ty: TypeAnn,
}

/// An interface declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceDecl {
    /// Interface name.
    pub name: String,
    /// Generic parameters.
    pub generics: Vec<String>,
    /// Fields in declaration order.
    pub fields: Vec<InterfaceField>,
}

/// A type alias declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeAliasDecl {
    /// Alias name.
    pub name: String,
    /// Generic parameters.
    pub generics: Vec<String>,
    /// Aliased type.
    pub ty: TypeAnn,
}

/// A type annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeAnn {
    /// `Name` or `Name<A, B>`.
    Named {
        /// Type name.
        name: String,
        /// Generic arguments.
        args: Vec<TypeAnn>,
    },
    /// `T[]`.
    Array {
        /// Element type.
        elem: Box<TypeAnn>,
    },
    /// `[A, B]`.
    Tuple {
        /// Element types.
        items: Vec<TypeAnn>,
    },
    /// `{ a: A; b?: B }`.
    Object {
        /// Fields in order.
        fields: Vec<InterfaceField>,
    },
    /// `A | B`.
    Union {
        /// Alternatives in order.
        variants: Vec<TypeAnn>,
    },
    /// A string or number literal type, kept as written.
    Literal {
        /// Source text of the literal.
        text: String,
    },
    /// `null`.
    Null,
}

impl TypeAnn {
    /// A plain named type.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Replaces named types found in `bindings`.
    #[must_use]
    pub fn substitute(&self, bindings: &HashMap<String, Self>) -> Self {
        match self {
            Self::Named { name, args } if args.is_empty() => {
                bindings.get(name).cloned().unwrap_or_else(|| self.clone())
            }
            Self::Named { name, args } => Self::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            Self::Array { elem } => Self::Array {
                elem: Box::new(elem.substitute(bindings)),
            },
            Self::Tuple { items } => Self::Tuple {
                items: items.iter().map(|i| i.substitute(bindings)).collect(),
            },
            Self::Object { fields } => Self::Object {
                fields: fields
                    .iter()
                    .map(|f| InterfaceField {
                        name: f.name.clone(),
                        optional: f.optional,
                        ty: f.ty.substitute(bindings),
                    })
                    .collect(),
            },
            Self::Union { variants } => Self::Union {
                variants: variants.iter().map(|v| v.substitute(bindings)).collect(),
            },
            Self::Literal { .. } | Self::Null => self.clone(),
        }
    }
}

impl fmt::Display for TypeAnn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    write!(f, "<{}>", join(args))?;
                }
                Ok(())
            }
            Self::Array { elem } => match elem.as_ref() {
                Self::Union { .. } => write!(f, "({elem})[]"),
                _ => write!(f, "{elem}[]"),
            },
            Self::Tuple { items } => write!(f, "[{}]", join(items)),
            Self::Object { fields } => {
                f.write_str("{ ")?;
                for field in fields {
                    let optional = if field.optional { "?" } else { "" };
                    write!(f, "{}{optional}: {}; ", field.name, field.ty)?;
                }
                f.write_str("}")
            }
            Self::Union { variants } => {
                let parts: Vec<String> = variants.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(" | "))
            }
            Self::Literal { text } => f.write_str(text),
            Self::Null => f.write_str("null"),
        }
    }
}

fn join(items: &[TypeAnn]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A statement in a function body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// `const name = value;` or `let name = value;`
    Let {
        /// Local name.
        name: String,
        /// Initializer.
        value: Expr,
    },
    /// `return value;`
    Return(Option<Expr>),
    /// An expression evaluated for effect.
    Expr(Expr),
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// A variable reference.
    Ident(String),
    /// A number literal as written.
    Number(String),
    /// A string literal.
    Str(String),
    /// `true` or `false`.
    Bool(bool),
    /// `null`.
    Null,
    /// `[a, b]`
    Array(Vec<Expr>),
    /// `{ a: x, b: y }`
    Object(Vec<(String, Expr)>),
    /// `object.property`
    Member {
        /// Receiver.
        object: Box<Expr>,
        /// Property name.
        property: String,
    },
    /// `callee(args)`
    Call {
        /// Called expression.
        callee: Box<Expr>,
        /// Arguments in order.
        args: Vec<Expr>,
    },
    /// `await value`
    Await(Box<Expr>),
}

impl Expr {
    /// Identifiers referenced by the expression, in first-use order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        let mut found = Vec::new();
        self.collect_identifiers(&[], &mut found);
        found
    }

    fn collect_identifiers(&self, bound: &[String], found: &mut Vec<String>) {
        match self {
            Self::Ident(name) => {
                if !bound.contains(name) && !found.contains(name) {
                    found.push(name.clone());
                }
            }
            Self::Array(items) => {
                for item in items {
                    item.collect_identifiers(bound, found);
                }
            }
            Self::Object(entries) => {
                for (_, value) in entries {
                    value.collect_identifiers(bound, found);
                }
            }
            Self::Member { object, .. } => object.collect_identifiers(bound, found),
            Self::Call { callee, args } => {
                callee.collect_identifiers(bound, found);
                for arg in args {
                    arg.collect_identifiers(bound, found);
                }
            }
            Self::Await(inner) => inner.collect_identifiers(bound, found),
            Self::Number(_) | Self::Str(_) | Self::Bool(_) | Self::Null => {}
        }
    }

    /// Returns `true` for a factory application such as `Vec.with(U8)`.
    #[must_use]
    pub fn is_factory_call(&self) -> bool {
        matches!(
            self,
            Self::Call { callee, .. }
                if matches!(callee.as_ref(), Self::Member { property, .. } if property == "with")
        )
    }
}
