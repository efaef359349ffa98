//! Editable argument trees for bound functions.
//!
//! Each parameter annotation becomes an [`ArgNode`]: primitive leaves, growable
//! lists of text items, fixed tuples and nested objects for interfaces found in
//! the [`InterfaceTable`]. Edits go through [`ArgumentForm`], which re-flattens
//! the whole tree into a JSON argument object after every change.
//!
//! # Examples
//!
//! ```
//! use nucleus_runtime::args::{ArgumentForm, InterfaceTable};
//! use nucleus_runtime::syntax::parse_module;
//! use serde_json::json;
//!
//! let module = parse_module(
//!     "export interface Point { x: u32; y: u32; }
//!      export function shift(p: Point, by: u32[]) { return null; }",
//! );
//! let table = InterfaceTable::from_module(&module);
//! let shift = module.functions().next().unwrap();
//!
//! let mut form = ArgumentForm::new(&shift.params, &table);
//! form.set("p.x", json!("7")).unwrap();
//! form.set("by.0", json!("3")).unwrap();
//! form.push_item("by").unwrap();
//! assert_eq!(form.value(), json!({"p": {"x": 7, "y": 0}, "by": [3]}));
//! ```

use indexmap::IndexMap;
use nucleus_core::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::syntax::{InterfaceDecl, Item, Module, Param, TypeAliasDecl, TypeAnn, parse_type};

const MAX_DEPTH: usize = 8;

const NUMERIC_TYPES: &[&str] = &[
    "u8", "u16", "u32", "u64", "u128", "i8", "i16", "i32", "i64", "i128", "number", "bigint",
];

/// Interfaces and type aliases available to the resolver.
#[derive(Debug, Clone, Default)]
pub struct InterfaceTable {
    interfaces: IndexMap<String, InterfaceDecl>,
    aliases: IndexMap<String, TypeAliasDecl>,
}

impl InterfaceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the interfaces and type aliases of `module`.
    #[must_use]
    pub fn from_module(module: &Module) -> Self {
        let mut table = Self::new();
        for item in &module.items {
            match item {
                Item::Interface(decl) => table.insert_interface(decl.clone()),
                Item::TypeAlias(decl) => table.insert_alias(decl.clone()),
                _ => {}
            }
        }
        table
    }

    /// Adds an interface; the first declaration of a name wins.
    pub fn insert_interface(&mut self, decl: InterfaceDecl) {
        self.interfaces.entry(decl.name.clone()).or_insert(decl);
    }

    /// Adds a type alias; the first declaration of a name wins.
    pub fn insert_alias(&mut self, decl: TypeAliasDecl) {
        self.aliases.entry(decl.name.clone()).or_insert(decl);
    }

    /// Interface named `name`.
    #[must_use]
    pub fn interface(&self, name: &str) -> Option<&InterfaceDecl> {
        self.interfaces.get(name)
    }

    /// Type alias named `name`.
    #[must_use]
    pub fn alias(&self, name: &str) -> Option<&TypeAliasDecl> {
        self.aliases.get(name)
    }

    /// Returns `true` if `name` is an interface or an alias.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.interfaces.contains_key(name) || self.aliases.contains_key(name)
    }

    /// Number of interfaces and aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interfaces.len() + self.aliases.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How a leaf value is entered and flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafKind {
    /// Integer or float, defaults to `0`.
    Number,
    /// Free text, defaults to `""`.
    Text,
    /// Defaults to `false`.
    Boolean,
    /// Raw JSON, defaults to `null`.
    Json,
}

impl LeafKind {
    fn of(ty: &TypeAnn) -> Self {
        match ty {
            TypeAnn::Named { name, args } if args.is_empty() => match name.as_str() {
                n if NUMERIC_TYPES.contains(&n) => Self::Number,
                "string" | "String" => Self::Text,
                "bool" | "boolean" => Self::Boolean,
                _ => Self::Json,
            },
            _ => Self::Json,
        }
    }

    fn default_value(self) -> Value {
        match self {
            Self::Number => Value::from(0),
            Self::Text => Value::String(String::new()),
            Self::Boolean => Value::Bool(false),
            Self::Json => Value::Null,
        }
    }

    fn flatten(self, value: &Value) -> Value {
        let Value::String(text) = value else {
            return value.clone();
        };
        match self {
            Self::Text => value.clone(),
            Self::Number => parse_number(text.trim()),
            Self::Boolean => match text.trim() {
                "true" => Value::Bool(true),
                "false" | "" => Value::Bool(false),
                _ => value.clone(),
            },
            Self::Json => serde_json::from_str(text).unwrap_or_else(|_| value.clone()),
        }
    }
}

/// Numeric text becomes a JSON number unless it does not fit in 64 bits.
fn parse_number(text: &str) -> Value {
    if text.is_empty() {
        return Value::from(0);
    }
    if let Ok(n) = text.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(n) = text.parse::<u64>() {
        return Value::from(n);
    }
    let integral = text
        .strip_prefix('-')
        .unwrap_or(text)
        .chars()
        .all(|c| c.is_ascii_digit());
    if integral {
        return Value::String(text.to_string());
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map_or_else(|| Value::String(text.to_string()), Value::Number)
}

/// One slot of a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TupleSlot {
    /// Element type as written.
    pub ty: String,
    /// Slot contents.
    pub node: ArgNode,
}

/// An editable argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ArgNode {
    /// A single value.
    Leaf {
        /// Type as written.
        ty: String,
        /// Input kind.
        kind: LeafKind,
        /// Current value.
        value: Value,
    },
    /// A growable list of text items; never empty.
    List {
        /// Element type as written.
        elem_ty: String,
        /// How items are flattened.
        elem_kind: LeafKind,
        /// Item texts.
        items: Vec<String>,
    },
    /// A fixed-size tuple.
    Tuple {
        /// Slots in order.
        slots: Vec<TupleSlot>,
    },
    /// A nested object.
    Object {
        /// Type as written.
        ty: String,
        /// Fields in declaration order.
        fields: IndexMap<String, ArgNode>,
    },
}

impl ArgNode {
    /// Builds the node for an annotation.
    #[must_use]
    pub fn resolve(ty: &TypeAnn, table: &InterfaceTable) -> Self {
        resolve(ty, table, 0)
    }

    fn leaf(ty: &TypeAnn, kind: LeafKind) -> Self {
        Self::Leaf {
            ty: ty.to_string(),
            kind,
            value: kind.default_value(),
        }
    }

    fn list(elem: &TypeAnn) -> Self {
        Self::List {
            elem_ty: elem.to_string(),
            elem_kind: LeafKind::of(elem),
            items: vec![String::new()],
        }
    }

    /// Flattens the node into JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Leaf { kind, value, .. } => kind.flatten(value),
            Self::List {
                elem_kind, items, ..
            } => Value::Array(
                items
                    .iter()
                    .filter(|item| !item.trim().is_empty())
                    .map(|item| elem_kind.flatten(&Value::String(item.clone())))
                    .collect(),
            ),
            Self::Tuple { slots } => {
                Value::Array(slots.iter().map(|slot| slot.node.to_value()).collect())
            }
            Self::Object { fields, .. } => Value::Object(
                fields
                    .iter()
                    .map(|(name, node)| (name.clone(), node.to_value()))
                    .collect(),
            ),
        }
    }

    fn child_mut(&mut self, segment: &str) -> Option<&mut Self> {
        match self {
            Self::Object { fields, .. } => fields.get_mut(segment),
            Self::Tuple { slots } => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| slots.get_mut(index))
                .map(|slot| &mut slot.node),
            Self::Leaf { .. } | Self::List { .. } => None,
        }
    }

    fn child(&self, segment: &str) -> Option<&Self> {
        match self {
            Self::Object { fields, .. } => fields.get(segment),
            Self::Tuple { slots } => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| slots.get(index))
                .map(|slot| &slot.node),
            Self::Leaf { .. } | Self::List { .. } => None,
        }
    }
}

fn resolve(ty: &TypeAnn, table: &InterfaceTable, depth: usize) -> ArgNode {
    if depth > MAX_DEPTH {
        return ArgNode::leaf(ty, LeafKind::Json);
    }
    match ty {
        TypeAnn::Named { name, args } => match (name.as_str(), args.as_slice()) {
            ("Array" | "Vec", [elem]) => ArgNode::list(elem),
            (_, []) if LeafKind::of(ty) != LeafKind::Json => ArgNode::leaf(ty, LeafKind::of(ty)),
            _ => resolve_custom(ty, name, args, table, depth),
        },
        TypeAnn::Array { elem } => ArgNode::list(elem),
        TypeAnn::Tuple { items } => ArgNode::Tuple {
            slots: items
                .iter()
                .map(|item| TupleSlot {
                    ty: item.to_string(),
                    node: resolve(item, table, depth + 1),
                })
                .collect(),
        },
        TypeAnn::Object { fields } => ArgNode::Object {
            ty: ty.to_string(),
            fields: fields
                .iter()
                .map(|field| (field.name.clone(), resolve(&field.ty, table, depth + 1)))
                .collect(),
        },
        TypeAnn::Union { .. } | TypeAnn::Literal { .. } | TypeAnn::Null => {
            ArgNode::leaf(ty, LeafKind::Json)
        }
    }
}

fn resolve_custom(
    ty: &TypeAnn,
    name: &str,
    args: &[TypeAnn],
    table: &InterfaceTable,
    depth: usize,
) -> ArgNode {
    if let Some(interface) = table.interface(name) {
        let bindings = bind_generics(&interface.generics, args);
        return ArgNode::Object {
            ty: ty.to_string(),
            fields: interface
                .fields
                .iter()
                .map(|field| {
                    let field_ty = field.ty.substitute(&bindings);
                    (field.name.clone(), resolve(&field_ty, table, depth + 1))
                })
                .collect(),
        };
    }
    if let Some(alias) = table.alias(name) {
        let bindings = bind_generics(&alias.generics, args);
        return resolve(&alias.ty.substitute(&bindings), table, depth + 1);
    }
    ArgNode::leaf(ty, LeafKind::Json)
}

fn bind_generics(params: &[String], args: &[TypeAnn]) -> HashMap<String, TypeAnn> {
    params.iter().cloned().zip(args.iter().cloned()).collect()
}

/// Parses a type annotation and builds its node.
///
/// # Errors
///
/// Returns error if `ty` is not a valid annotation.
pub fn resolve_type_str(ty: &str, table: &InterfaceTable) -> Result<ArgNode> {
    let ann = parse_type(ty)?;
    Ok(ArgNode::resolve(&ann, table))
}

type ChangeHandler = Box<dyn FnMut(&Value) + Send>;

/// Editable arguments of one function.
pub struct ArgumentForm {
    fields: IndexMap<String, ArgNode>,
    on_change: Option<ChangeHandler>,
}

impl fmt::Debug for ArgumentForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentForm")
            .field("fields", &self.fields)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl ArgumentForm {
    /// Builds the form for `params`. Unannotated parameters take raw JSON.
    #[must_use]
    pub fn new(params: &[Param], table: &InterfaceTable) -> Self {
        let fields = params
            .iter()
            .map(|param| {
                let node = param.ty.as_ref().map_or_else(
                    || ArgNode::leaf(&TypeAnn::named("unknown"), LeafKind::Json),
                    |ty| ArgNode::resolve(ty, table),
                );
                (param.name.clone(), node)
            })
            .collect();
        Self {
            fields,
            on_change: None,
        }
    }

    /// Calls `handler` with the flattened arguments after every edit.
    #[must_use]
    pub fn on_change(mut self, handler: impl FnMut(&Value) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(handler));
        self
    }

    /// Top-level nodes by parameter name.
    #[must_use]
    pub const fn fields(&self) -> &IndexMap<String, ArgNode> {
        &self.fields
    }

    /// Node at a dotted path such as `a.x` or `pair.1`.
    #[must_use]
    pub fn node(&self, path: &str) -> Option<&ArgNode> {
        let mut segments = path.split('.');
        let mut node = self.fields.get(segments.next()?)?;
        for segment in segments {
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// Sets the leaf or list item at `path`.
    ///
    /// The last segment of a list item path is the item index.
    ///
    /// # Errors
    ///
    /// Returns error if `path` names nothing editable.
    pub fn set(&mut self, path: &str, value: Value) -> Result<()> {
        let (parent, last) = path.rsplit_once('.').unwrap_or(("", path));
        if !parent.is_empty()
            && let ArgNode::List { items, .. } = self.node_mut(parent)?
        {
            let slot = last
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get_mut(index))
                .ok_or_else(|| missing(path))?;
            *slot = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            self.notify();
            return Ok(());
        }

        match self.node_mut(path)? {
            ArgNode::Leaf { value: current, .. } => *current = value,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "'{path}' is not a single value"
                )));
            }
        }
        self.notify();
        Ok(())
    }

    /// Appends an empty item to the list at `path`, returning its index.
    ///
    /// # Errors
    ///
    /// Returns error if `path` is not a list.
    pub fn push_item(&mut self, path: &str) -> Result<usize> {
        let items = self.list_mut(path)?;
        items.push(String::new());
        let index = items.len() - 1;
        self.notify();
        Ok(index)
    }

    /// Removes item `index` from the list at `path`. A list never becomes
    /// empty: removing the last item leaves one empty item.
    ///
    /// # Errors
    ///
    /// Returns error if `path` is not a list or `index` is out of range.
    pub fn remove_item(&mut self, path: &str, index: usize) -> Result<()> {
        let items = self.list_mut(path)?;
        if index >= items.len() {
            return Err(Error::InvalidArgument(format!(
                "'{path}' has no item {index}"
            )));
        }
        items.remove(index);
        if items.is_empty() {
            items.push(String::new());
        }
        self.notify();
        Ok(())
    }

    /// Flattened arguments keyed by parameter name.
    #[must_use]
    pub fn value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, node)| (name.clone(), node.to_value()))
                .collect(),
        )
    }

    fn node_mut(&mut self, path: &str) -> Result<&mut ArgNode> {
        let mut segments = path.split('.');
        let mut node = segments
            .next()
            .and_then(|first| self.fields.get_mut(first))
            .ok_or_else(|| missing(path))?;
        for segment in segments {
            node = node.child_mut(segment).ok_or_else(|| missing(path))?;
        }
        Ok(node)
    }

    fn list_mut(&mut self, path: &str) -> Result<&mut Vec<String>> {
        match self.node_mut(path)? {
            ArgNode::List { items, .. } => Ok(items),
            _ => Err(Error::InvalidArgument(format!("'{path}' is not a list"))),
        }
    }

    fn notify(&mut self) {
        if self.on_change.is_some() {
            let value = self.value();
            if let Some(handler) = self.on_change.as_mut() {
                handler(&value);
            }
        }
    }
}

fn missing(path: &str) -> Error {
    Error::InvalidArgument(format!("no argument at '{path}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn form(source: &str) -> ArgumentForm {
        let module = parse_module(source);
        let table = InterfaceTable::from_module(&module);
        let function = module.functions().next().unwrap();
        ArgumentForm::new(&function.params, &table)
    }

    fn list_items(form: &ArgumentForm, path: &str) -> Vec<String> {
        match form.node(path) {
            Some(ArgNode::List { items, .. }) => items.clone(),
            other => panic!("not a list: {other:?}"),
        }
    }

    #[test]
    fn test_leaf_defaults() {
        let form = form("function f(a: u64, b: string, c: boolean, d: Mystery, e) { return null; }");
        assert_eq!(
            form.value(),
            json!({"a": 0, "b": "", "c": false, "d": null, "e": null})
        );
    }

    #[test]
    fn test_list_forms() {
        for ty in ["u8[]", "Array<u8>", "Vec<u8>"] {
            let node = resolve_type_str(ty, &InterfaceTable::new()).unwrap();
            assert_eq!(
                node,
                ArgNode::List {
                    elem_ty: "u8".to_string(),
                    elem_kind: LeafKind::Number,
                    items: vec![String::new()],
                },
                "{ty}"
            );
        }
    }

    #[test]
    fn test_list_add_remove_keeps_order() {
        let mut form = form("function f(tags: string[]) { return null; }");
        for (index, text) in ["a", "b", "c", "d"].iter().enumerate() {
            if index > 0 {
                form.push_item("tags").unwrap();
            }
            form.set(&format!("tags.{index}"), json!(text)).unwrap();
        }
        form.remove_item("tags", 1).unwrap();
        assert_eq!(list_items(&form, "tags"), ["a", "c", "d"]);
        assert_eq!(form.value(), json!({"tags": ["a", "c", "d"]}));
    }

    #[test]
    fn test_list_never_empty() {
        let mut form = form("function f(xs: u32[]) { return null; }");
        form.set("xs.0", json!("5")).unwrap();
        form.remove_item("xs", 0).unwrap();
        assert_eq!(list_items(&form, "xs"), [""]);
        assert_eq!(form.value(), json!({"xs": []}));
        assert!(form.remove_item("xs", 3).is_err());
    }

    #[test]
    fn test_tuple_slots() {
        let node = resolve_type_str("[u32, string, bool]", &InterfaceTable::new()).unwrap();
        let ArgNode::Tuple { slots } = node else {
            panic!("expected tuple");
        };
        let types: Vec<&str> = slots.iter().map(|slot| slot.ty.as_str()).collect();
        assert_eq!(types, ["u32", "string", "bool"]);
    }

    #[test]
    fn test_tuple_edit() {
        let mut form = form("function f(pair: [u8, boolean]) { return null; }");
        form.set("pair.1", json!("true")).unwrap();
        assert_eq!(form.value(), json!({"pair": [0, true]}));
        assert!(form.push_item("pair").is_err());
        assert!(form.set("pair.2", json!(1)).is_err());
    }

    #[test]
    fn test_nested_interfaces() {
        let mut form = form(
            "export interface Point { x: u32; y: u32; }
             export interface Segment { from: Point; to: Point; label?: string; }
             export function draw(s: Segment) { return null; }",
        );
        form.set("s.to.y", json!("9")).unwrap();
        assert_eq!(
            form.value(),
            json!({"s": {"from": {"x": 0, "y": 0}, "to": {"x": 0, "y": 9}, "label": ""}})
        );
    }

    #[test]
    fn test_generic_interface_and_alias() {
        let form = form(
            "export interface Pair<T> { left: T; right: T; }
             export type Flags = Pair<boolean>;
             export function f(p: Pair<u8>, q: Flags) { return null; }",
        );
        assert_eq!(
            form.value(),
            json!({"p": {"left": 0, "right": 0}, "q": {"left": false, "right": false}})
        );
    }

    #[test]
    fn test_recursive_interface_is_bounded() {
        let form = form(
            "export interface Node { value: u8; next: Node; }
             export function f(n: Node) { return null; }",
        );
        let mut depth = 0;
        let mut value = &form.value()["n"];
        while let Some(next) = value.get("next") {
            depth += 1;
            value = next;
        }
        assert!(depth <= MAX_DEPTH + 1);
        assert_eq!(*value, Value::Null);
    }

    #[test]
    fn test_flatten_parsing() {
        let mut form = form("function f(n: u128, big: u128[], raw: Option<u8>, name: string) { return null; }");
        form.set("n", json!("12")).unwrap();
        form.set("big.0", json!("340282366920938463463374607431768211455")).unwrap();
        form.set("raw", json!("[1, 2]")).unwrap();
        form.set("name", json!("42")).unwrap();
        assert_eq!(
            form.value(),
            json!({
                "n": 12,
                "big": ["340282366920938463463374607431768211455"],
                "raw": [1, 2],
                "name": "42",
            })
        );
    }

    #[test]
    fn test_enum_union_is_json_leaf() {
        let form = form(
            "export type Shape = { Circle: u32 } | { Empty: null };
             export function f(s: Shape) { return null; }",
        );
        assert!(matches!(
            form.node("s"),
            Some(ArgNode::Leaf { kind: LeafKind::Json, .. })
        ));
    }

    #[test]
    fn test_on_change_receives_whole_tree() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut form = form("function f(a: u8, b: u8[]) { return null; }")
            .on_change(move |value| sink.lock().unwrap().push(value.clone()));

        form.set("a", json!("1")).unwrap();
        form.set("b.0", json!("2")).unwrap();
        form.push_item("b").unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], json!({"a": 1, "b": []}));
        assert_eq!(seen[2], json!({"a": 1, "b": [2]}));
    }

    #[test]
    fn test_unknown_path() {
        let mut form = form("function f(a: u8) { return null; }");
        assert!(form.set("zzz", json!(1)).is_err());
        assert!(form.set("a.b", json!(1)).is_err());
    }
}
