//! Five-pass binding of a parsed module.
//!
//! Passes run in the order of [`Pass::ALL`]: underscore helpers, codec
//! imports, codec classes, codec constants and finally exported functions.
//! Each pass only sees what earlier passes bound, so a function whose body
//! names a class fails when the class pass has not run yet.
//!
//! Binding is best effort: a symbol that cannot be bound becomes a
//! [`BindingFailure`] in the [`BindReport`] and its siblings carry on.
//!
//! # Examples
//!
//! ```
//! use nucleus_runtime::binder::Binder;
//!
//! let source = r#"
//!     import { Struct, U32 } from "@nucleus/codec";
//!     export class Point extends Struct { x: U32; y: U32; }
//! "#;
//! let bound = Binder::from_source(source).bind();
//! assert!(bound.report.is_clean());
//! assert_eq!(bound.registry.encode("Point", &serde_json::json!({"x": 1, "y": 2})).unwrap().len(), 8);
//! ```

use indexmap::IndexMap;
use nucleus_codegen::{CODEC_LIBRARY, GenerationIssue};
use nucleus_core::order::lenient_topological_order;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::codec::{CodecDef, CodecRegistry, CodecTemplate, Factory, RegistryEntry, library};
use crate::eval::{Evaluator, HOST_OBJECT, RtValue, Unresolved};
use crate::symbols::{BoundFunction, Symbol, SymbolTable};
use crate::syntax::{
    ClassDecl, ConstDecl, FunctionDecl, ImportDecl, Item, Module, ParseError, parse_module,
};

/// A binder pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    /// Underscore helper functions.
    Helpers,
    /// Codec library imports.
    Imports,
    /// Struct and enum codec classes.
    Classes,
    /// Codec constants and type aliases.
    Constants,
    /// Exported nucleus functions.
    Functions,
}

impl Pass {
    /// Every pass, in binding order.
    pub const ALL: [Self; 5] = [
        Self::Helpers,
        Self::Imports,
        Self::Classes,
        Self::Constants,
        Self::Functions,
    ];

    /// Lowercase pass name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Helpers => "helpers",
            Self::Imports => "imports",
            Self::Classes => "classes",
            Self::Constants => "constants",
            Self::Functions => "functions",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A symbol that could not be bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingFailure {
    /// Symbol name.
    pub symbol: String,
    /// Pass that rejected it.
    pub pass: Pass,
    /// Reason.
    pub reason: String,
}

impl fmt::Display for BindingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} pass): {}", self.symbol, self.pass, self.reason)
    }
}

impl From<BindingFailure> for nucleus_core::Error {
    fn from(failure: BindingFailure) -> Self {
        Self::Binding {
            symbol: failure.symbol,
            pass: failure.pass.to_string(),
            message: failure.reason,
        }
    }
}

/// A lazy codec reference that names nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedRef {
    /// Codec holding the reference.
    pub codec: String,
    /// Missing name.
    pub reference: String,
}

/// Outcome of binding a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BindReport {
    /// Bound symbol names, in binding order.
    pub bound: Vec<String>,
    /// Symbols that failed to bind.
    pub failures: Vec<BindingFailure>,
    /// Items the parser skipped.
    pub parse_errors: Vec<ParseError>,
    /// ABI entries the generator skipped.
    pub generation_issues: Vec<GenerationIssue>,
    /// Dangling lazy references found by the link check.
    pub unresolved: Vec<UnresolvedRef>,
}

impl BindReport {
    /// Returns `true` if nothing was skipped or left dangling.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
            && self.parse_errors.is_empty()
            && self.generation_issues.is_empty()
            && self.unresolved.is_empty()
    }

    /// Failure recorded for `symbol`, if any.
    #[must_use]
    pub fn failure_for(&self, symbol: &str) -> Option<&BindingFailure> {
        self.failures.iter().find(|failure| failure.symbol == symbol)
    }
}

/// Everything a finished binder produced.
#[derive(Debug, Clone)]
pub struct Bindings {
    /// The parsed module.
    pub module: Module,
    /// Live codecs.
    pub registry: CodecRegistry,
    /// Bound symbols.
    pub symbols: SymbolTable,
    /// What was bound and what was skipped.
    pub report: BindReport,
}

/// Binds a module pass by pass.
#[derive(Debug)]
pub struct Binder {
    module: Module,
    registry: CodecRegistry,
    symbols: SymbolTable,
    report: BindReport,
    completed: HashSet<Pass>,
}

impl Binder {
    /// Creates a binder for a parsed module.
    #[must_use]
    pub fn new(module: Module) -> Self {
        let report = BindReport {
            parse_errors: module.errors.clone(),
            ..BindReport::default()
        };
        Self {
            module,
            registry: CodecRegistry::new(),
            symbols: SymbolTable::new(),
            report,
            completed: HashSet::new(),
        }
    }

    /// Parses `source` and creates a binder for it.
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        Self::new(parse_module(source))
    }

    /// Runs every pass in order and finishes.
    #[must_use]
    pub fn bind(mut self) -> Bindings {
        self.run_all();
        self.finish()
    }

    /// Runs every pass that has not run yet, in order.
    pub fn run_all(&mut self) {
        for pass in Pass::ALL {
            self.run_pass(pass);
        }
    }

    /// Runs one pass. A pass runs at most once.
    pub fn run_pass(&mut self, pass: Pass) {
        if !self.completed.insert(pass) {
            debug!(%pass, "pass already ran");
            return;
        }

        let before = self.report.bound.len();
        let failures = self.report.failures.len();
        let items = std::mem::take(&mut self.module.items);
        match pass {
            Pass::Helpers => self.bind_helpers(&items),
            Pass::Imports => self.bind_imports(&items),
            Pass::Classes => self.bind_classes(&items),
            Pass::Constants => self.bind_constants(&items),
            Pass::Functions => self.bind_functions(&items),
        }
        self.module.items = items;

        info!(
            %pass,
            bound = self.report.bound.len() - before,
            failed = self.report.failures.len() - failures,
            "binder pass finished"
        );
    }

    /// Codecs bound so far.
    #[must_use]
    pub const fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// Symbols bound so far.
    #[must_use]
    pub const fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Report so far.
    #[must_use]
    pub const fn report(&self) -> &BindReport {
        &self.report
    }

    /// Runs the link check and hands out the results.
    #[must_use]
    pub fn finish(mut self) -> Bindings {
        self.report.unresolved = self
            .registry
            .unresolved_refs()
            .into_iter()
            .map(|(codec, reference)| {
                warn!(%codec, %reference, "dangling codec reference");
                UnresolvedRef { codec, reference }
            })
            .collect();

        Bindings {
            module: self.module,
            registry: self.registry,
            symbols: self.symbols,
            report: self.report,
        }
    }

    fn fail(&mut self, symbol: &str, pass: Pass, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(symbol, %pass, %reason, "symbol skipped");
        self.report.failures.push(BindingFailure {
            symbol: symbol.to_string(),
            pass,
            reason,
        });
    }

    fn bind_symbol(&mut self, name: &str, pass: Pass, symbol: Symbol) -> bool {
        if !self.symbols.insert(name, symbol) {
            self.fail(name, pass, format!("'{name}' is already bound"));
            return false;
        }
        debug!(symbol = name, %pass, "bound");
        self.report.bound.push(name.to_string());
        true
    }

    fn bind_codec(&mut self, name: &str, pass: Pass, entry: RegistryEntry) {
        if self.bind_symbol(name, pass, Symbol::Codec(pass)) {
            self.registry.register(name, entry);
        }
    }

    fn bind_helpers(&mut self, items: &[Item]) {
        for item in items {
            if let Item::Function(function) = item
                && function.name.starts_with('_')
            {
                self.bind_symbol(
                    &function.name,
                    Pass::Helpers,
                    Symbol::Helper(Arc::new(function.clone())),
                );
            }
        }
    }

    fn bind_imports(&mut self, items: &[Item]) {
        for item in items {
            if let Item::Import(import) = item {
                self.bind_import(import);
            }
        }
    }

    fn bind_import(&mut self, import: &ImportDecl) {
        for name in &import.names {
            if import.module != CODEC_LIBRARY {
                self.fail(
                    &name.local,
                    Pass::Imports,
                    format!("module '{}' is not available", import.module),
                );
                continue;
            }
            match library::lookup(&name.imported) {
                Some(entry) => self.bind_codec(&name.local, Pass::Imports, entry),
                None => self.fail(
                    &name.local,
                    Pass::Imports,
                    format!("'{}' is not exported by {CODEC_LIBRARY}", name.imported),
                ),
            }
        }
    }

    fn bind_classes(&mut self, items: &[Item]) {
        for item in items {
            if let Item::Class(class) = item {
                match self.class_entry(class) {
                    Ok(entry) => self.bind_codec(&class.name, Pass::Classes, entry),
                    Err(reason) => self.fail(&class.name, Pass::Classes, reason),
                }
            }
        }
    }

    fn class_entry(&self, class: &ClassDecl) -> Result<RegistryEntry, String> {
        let base = self
            .registry
            .get(&class.base)
            .cloned()
            .or_else(|| library::lookup(&class.base));
        let factory = match base {
            Some(RegistryEntry::Factory(factory @ (Factory::Struct | Factory::Enum))) => factory,
            Some(_) => return Err(format!("'{}' is not Struct or Enum", class.base)),
            None => return Err(format!("unknown base class '{}'", class.base)),
        };

        let evaluator = Evaluator::new(&self.registry, &self.symbols)
            .with_generics(&class.generics)
            .with_unresolved(Unresolved::Defer);
        let mut members = IndexMap::with_capacity(class.members.len());
        for member in &class.members {
            let value = evaluator
                .eval(&member.value)
                .map_err(|e| format!("member '{}': {e}", member.name))?;
            let RtValue::Codec(def) = value else {
                return Err(format!(
                    "member '{}' is a {}, not a codec",
                    member.name,
                    value.kind()
                ));
            };
            members.insert(member.name.clone(), def);
        }

        let body = match factory {
            Factory::Enum => CodecDef::Enum(members),
            _ => CodecDef::Struct(members),
        };
        Ok(generic_entry(&class.name, &class.generics, body))
    }

    fn bind_constants(&mut self, items: &[Item]) {
        let constants: Vec<&ConstDecl> = items
            .iter()
            .filter_map(|item| match item {
                Item::Const(constant) => Some(constant),
                _ => None,
            })
            .collect();
        let names: HashSet<&str> = constants.iter().map(|c| c.name.as_str()).collect();

        let graph: Vec<(&str, Vec<&str>)> = constants
            .iter()
            .map(|constant| {
                let deps = constant
                    .value
                    .identifiers()
                    .into_iter()
                    .filter(|id| !constant.generics.contains(id))
                    .filter_map(|id| names.get(id.as_str()).copied())
                    .collect();
                (constant.name.as_str(), deps)
            })
            .collect();
        let sorted = lenient_topological_order(&graph);
        if sorted.had_stall() {
            warn!(flushed = ?sorted.flushed, "cyclic constants, binding remainder lazily");
        }

        // First declaration wins; later duplicates fail as already bound.
        let mut by_name: IndexMap<&str, &ConstDecl> = IndexMap::with_capacity(constants.len());
        for constant in &constants {
            by_name.entry(constant.name.as_str()).or_insert(*constant);
        }
        let mut pending: HashSet<String> = names.iter().map(|n| (*n).to_string()).collect();
        for name in sorted.order {
            pending.remove(name);
            let Some(constant) = by_name.get(name) else {
                continue;
            };
            match self.constant_entry(constant, &pending) {
                Ok(entry) => self.bind_codec(name, Pass::Constants, entry),
                Err(reason) => self.fail(name, Pass::Constants, reason),
            }
        }
    }

    fn constant_entry(
        &self,
        constant: &ConstDecl,
        pending: &HashSet<String>,
    ) -> Result<RegistryEntry, String> {
        let branch = if constant.value.is_factory_call() {
            "factory"
        } else if !constant.generics.is_empty() {
            "generic"
        } else if matches!(constant.value, crate::syntax::Expr::Ident(_)) {
            "alias"
        } else {
            "expression"
        };
        debug!(constant = %constant.name, branch, "evaluating constant");

        let value = Evaluator::new(&self.registry, &self.symbols)
            .with_generics(&constant.generics)
            .with_unresolved(Unresolved::DeferOnly(pending))
            .eval(&constant.value)
            .map_err(|e| e.to_string())?;
        match value {
            RtValue::Codec(def) => Ok(generic_entry(&constant.name, &constant.generics, def)),
            other @ (RtValue::Template(_) | RtValue::Factory(_)) if constant.generics.is_empty() => {
                other.into_entry().map_err(|e| e.to_string())
            }
            other => Err(format!("evaluates to a {}, not a codec", other.kind())),
        }
    }

    fn bind_functions(&mut self, items: &[Item]) {
        for item in items {
            let Item::Function(function) = item else {
                continue;
            };
            if function.name.starts_with('_') {
                continue;
            }
            if !function.exported {
                debug!(function = %function.name, "skipping non-exported function");
                continue;
            }
            match self.unresolved_identifier(function) {
                Some(name) => self.fail(
                    &function.name,
                    Pass::Functions,
                    format!("'{name}' is not defined"),
                ),
                None => {
                    self.bind_symbol(
                        &function.name,
                        Pass::Functions,
                        Symbol::Function(BoundFunction::new(function.clone())),
                    );
                }
            }
        }
    }

    fn unresolved_identifier(&self, function: &FunctionDecl) -> Option<String> {
        function.free_identifiers().into_iter().find(|name| {
            !(self.symbols.contains(name)
                || self.registry.contains(name)
                || library::contains(name)
                || name == HOST_OBJECT)
        })
    }
}

fn generic_entry(name: &str, generics: &[String], body: CodecDef) -> RegistryEntry {
    if generics.is_empty() {
        RegistryEntry::Codec(body)
    } else {
        RegistryEntry::Template(CodecTemplate {
            name: name.to_string(),
            params: generics.to_vec(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Primitive;
    use serde_json::json;

    const HEADER: &str = r#"
        import { Struct, Enum, Vec, Option, Tuple, Null, U8, U32, Text } from "@nucleus/codec";
        function _encode(codec, value) { return codec.encode(value); }
        function _call(method, name, output, args) { return Nucleus.request(method, name, output, args); }
    "#;

    fn bind(body: &str) -> Bindings {
        Binder::from_source(&format!("{HEADER}\n{body}")).bind()
    }

    #[test]
    fn test_pass_names() {
        let names: Vec<&str> = Pass::ALL.iter().map(Pass::as_str).collect();
        assert_eq!(names, ["helpers", "imports", "classes", "constants", "functions"]);
    }

    #[test]
    fn test_helpers_and_imports() {
        let bound = bind("");
        assert!(bound.report.is_clean(), "{:?}", bound.report);
        assert_eq!(bound.symbols.get("_encode").map(Symbol::kind), Some("helper"));
        assert_eq!(bound.symbols.get("U32").map(Symbol::kind), Some("import"));
        assert!(bound.registry.contains("Vec"));
    }

    #[test]
    fn test_import_failures() {
        let bound = Binder::from_source(
            r#"import { U8, Missing } from "@nucleus/codec";
               import { Other } from "./local";"#,
        )
        .bind();
        assert!(bound.symbols.contains("U8"));
        assert!(bound.report.failure_for("Missing").is_some());
        let other = bound.report.failure_for("Other").unwrap();
        assert_eq!(other.pass, Pass::Imports);
        assert!(other.reason.contains("./local"));
    }

    #[test]
    fn test_import_alias() {
        let bound = Binder::from_source(r#"import { U32 as Word } from "@nucleus/codec";"#).bind();
        assert_eq!(bound.registry.encode("Word", &json!(1)).unwrap(), vec![1, 0, 0, 0]);
        assert!(!bound.symbols.contains("U32"));
    }

    #[test]
    fn test_enum_class() {
        let bound = bind("export class Shape extends Enum { Empty: Null; Circle: U32; Named: Struct.with({ label: Text }); }");
        assert!(bound.report.is_clean(), "{:?}", bound.report);
        assert_eq!(bound.registry.encode("Shape", &json!("Empty")).unwrap(), vec![0]);
        assert_eq!(
            bound.registry.encode("Shape", &json!({"Circle": 2})).unwrap(),
            vec![1, 2, 0, 0, 0]
        );
        assert_eq!(
            bound.registry.decode("Shape", &[2, 8, b'h', b'i']).unwrap(),
            json!({"Named": {"label": "hi"}})
        );
    }

    #[test]
    fn test_class_forward_reference_is_lazy() {
        let bound = bind(
            "export class Line extends Struct { from: Point; to: Point; }
             export class Point extends Struct { x: U8; y: U8; }",
        );
        assert!(bound.report.is_clean(), "{:?}", bound.report);
        let bytes = bound
            .registry
            .encode("Line", &json!({"from": {"x": 1, "y": 2}, "to": {"x": 3, "y": 4}}))
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_class_with_bad_base() {
        let bound = bind("export class Weird extends U32 { a: U8; }");
        let failure = bound.report.failure_for("Weird").unwrap();
        assert_eq!(failure.pass, Pass::Classes);
        assert!(!bound.registry.contains("Weird"));
    }

    #[test]
    fn test_generic_class_is_template() {
        let bound = bind(
            "export class Pair<T> extends Struct { left: T; right: T; }
             export const Bytes2 = Pair.with(U8);",
        );
        assert!(matches!(bound.registry.get("Pair"), Some(RegistryEntry::Template(_))));
        assert_eq!(bound.registry.encode("Bytes2", &json!({"left": 1, "right": 2})).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_generic_constant() {
        let bound = bind(
            "export const Twice<T> = Tuple.with(T, T);
             export const Words = Twice.with(U32);",
        );
        assert!(bound.report.is_clean(), "{:?}", bound.report);
        assert_eq!(bound.registry.encode("Words", &json!([1, 2])).unwrap().len(), 8);
    }

    #[test]
    fn test_alias_constant() {
        let bound = bind("export const Amount = U32;");
        assert_eq!(
            bound.registry.get("Amount"),
            Some(&RegistryEntry::Codec(CodecDef::Primitive(Primitive::U32)))
        );
    }

    #[test]
    fn test_constant_naming_unknown_symbol_fails() {
        let bound = bind("export const Broken = Vec.with(Nowhere);");
        let failure = bound.report.failure_for("Broken").unwrap();
        assert!(failure.reason.contains("Nowhere"));
    }

    #[test]
    fn test_function_with_undefined_identifier() {
        let bound = bind(
            r#"export async function lost(a: u8): u8 { return _call("get", "lost", U8, [_encode(Ghost, a)]); }"#,
        );
        let failure = bound.report.failure_for("lost").unwrap();
        assert_eq!(failure.pass, Pass::Functions);
        assert_eq!(failure.reason, "'Ghost' is not defined");
    }

    #[test]
    fn test_duplicate_symbol_keeps_first() {
        let bound = bind("export const Id = U8;\nexport const Id = U32;");
        assert_eq!(
            bound.registry.get("Id"),
            Some(&RegistryEntry::Codec(CodecDef::Primitive(Primitive::U8)))
        );
        assert!(bound.report.failure_for("Id").is_some());
        assert_eq!(bound.registry.encode("Id", &json!(1)).unwrap(), vec![1]);
    }

    #[test]
    fn test_parse_errors_reported() {
        let bound = bind("export const = ;\nexport const Fine = U8;");
        assert_eq!(bound.report.parse_errors.len(), 1);
        assert!(bound.registry.contains("Fine"));
        assert!(!bound.report.is_clean());
    }

    #[test]
    fn test_run_pass_once() {
        let mut binder = Binder::from_source(&format!("{HEADER}\nexport const A = U8;"));
        binder.run_pass(Pass::Imports);
        binder.run_pass(Pass::Constants);
        binder.run_pass(Pass::Constants);
        assert!(binder.report().failures.is_empty());
        assert_eq!(binder.symbols().position("A"), binder.symbols().len().checked_sub(1));
    }

    #[test]
    fn test_binding_failure_into_error() {
        let err: nucleus_core::Error = BindingFailure {
            symbol: "f".to_string(),
            pass: Pass::Functions,
            reason: "'X' is not defined".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Binding 'f' failed in functions pass: 'X' is not defined");
    }
}
