//! Table of bound symbols.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::binder::Pass;
use crate::syntax::{FunctionDecl, Param, TypeAnn};

/// A callable nucleus function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundFunction {
    decl: Arc<FunctionDecl>,
}

impl BoundFunction {
    /// Wraps a parsed declaration.
    #[must_use]
    pub fn new(decl: FunctionDecl) -> Self {
        Self {
            decl: Arc::new(decl),
        }
    }

    /// Function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// Parameters with their annotations, as declared.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.decl.params
    }

    /// Return annotation.
    #[must_use]
    pub fn return_type(&self) -> Option<&TypeAnn> {
        self.decl.return_type.as_ref()
    }

    /// The parsed declaration.
    #[must_use]
    pub fn decl(&self) -> &Arc<FunctionDecl> {
        &self.decl
    }

    /// Signature text, e.g. `distance(a: Point, b: Point): u32`.
    #[must_use]
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params()
            .iter()
            .map(|param| match &param.ty {
                Some(ty) => format!("{}: {ty}", param.name),
                None => param.name.clone(),
            })
            .collect();
        let mut text = format!("{}({})", self.name(), params.join(", "));
        if let Some(ty) = self.return_type() {
            text.push_str(&format!(": {ty}"));
        }
        text
    }
}

/// A bound symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// An underscore helper called from generated function bodies.
    Helper(Arc<FunctionDecl>),
    /// A codec held in the registry under the same name, bound by `Pass`.
    Codec(Pass),
    /// An exported nucleus function.
    Function(BoundFunction),
}

impl Symbol {
    /// Short kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Helper(_) => "helper",
            Self::Codec(Pass::Imports) => "import",
            Self::Codec(Pass::Classes) => "class",
            Self::Codec(_) => "constant",
            Self::Function(_) => "function",
        }
    }
}

/// Symbols in registration order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: IndexMap<String, Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` unless it is already bound; returns whether it was added.
    pub fn insert(&mut self, name: impl Into<String>, symbol: Symbol) -> bool {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, symbol);
        true
    }

    /// Symbol bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    /// Returns `true` if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Position of `name` in registration order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.get_index_of(name)
    }

    /// Bound names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Symbols in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.entries.iter().map(|(name, symbol)| (name.as_str(), symbol))
    }

    /// Bound nucleus functions in registration order.
    pub fn functions(&self) -> impl Iterator<Item = &BoundFunction> {
        self.entries.values().filter_map(|symbol| match symbol {
            Symbol::Function(function) => Some(function),
            _ => None,
        })
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;

    #[test]
    fn test_signature_text() {
        let module = parse_module("export function f(a: u32[], b): Option<u8> { return null; }");
        let function = BoundFunction::new(module.functions().next().unwrap().clone());
        assert_eq!(function.signature(), "f(a: u32[], b): Option<u8>");
    }

    #[test]
    fn test_insert_keeps_first() {
        let mut table = SymbolTable::new();
        assert!(table.insert("A", Symbol::Codec(Pass::Classes)));
        assert!(!table.insert("A", Symbol::Codec(Pass::Constants)));
        assert_eq!(table.get("A").map(Symbol::kind), Some("class"));
        assert_eq!(table.position("A"), Some(0));
    }
}
