//! Integration tests for argument forms over generated source.

use nucleus_abi::AbiDocument;
use nucleus_runtime::args::{ArgNode, InterfaceTable, resolve_type_str};
use nucleus_runtime::{ArgumentForm, Session};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

fn path(name: &str) -> Value {
    json!({"kind": "path", "path": [name], "generic_args": []})
}

fn session(values: Vec<Value>) -> Session {
    let doc = AbiDocument::from_elements(values);
    assert!(doc.issues.is_empty(), "fixture must decode: {:?}", doc.issues);
    Session::from_document(&doc).unwrap()
}

fn list_items(form: &ArgumentForm, path: &str) -> Vec<String> {
    match form.node(path) {
        Some(ArgNode::List { items, .. }) => items.clone(),
        other => panic!("not a list: {other:?}"),
    }
}

/// Struct parameters become nested editable objects.
#[test]
fn test_point_arguments_are_nested_objects() {
    let session = session(vec![
        json!({"type": "struct", "name": "Point", "generics": [], "fields": [
            {"name": "x", "ty": path("u32")},
            {"name": "y", "ty": path("u32")}
        ]}),
        json!({"type": "fn", "name": "distance", "method": "get",
            "inputs": [{"name": "a", "ty": path("Point")}, {"name": "b", "ty": path("Point")}],
            "output": path("u32")}),
    ]);

    let mut form = session.argument_form("distance").unwrap();
    assert_eq!(
        form.value(),
        json!({"a": {"x": 0, "y": 0}, "b": {"x": 0, "y": 0}})
    );

    form.set("b.x", json!("3")).unwrap();
    form.set("b.y", json!("4")).unwrap();
    let call = session.prepare_call("distance", &form.value()).unwrap();
    assert_eq!(&call.payload[8..], &[3, 0, 0, 0, 4, 0, 0, 0]);
}

/// Adding N items then removing one keeps the others in order.
#[test]
fn test_array_add_then_remove() {
    let session = session(vec![json!({"type": "fn", "name": "tag", "method": "post",
        "inputs": [{"name": "labels", "ty": {"kind": "path", "path": ["Vec"],
            "generic_args": [path("String")]}}]})]);
    let mut form = session.argument_form("tag").unwrap();

    let n = 5;
    for index in 0..n {
        if index > 0 {
            assert_eq!(form.push_item("labels").unwrap(), index);
        }
        form.set(&format!("labels.{index}"), json!(format!("l{index}"))).unwrap();
    }
    form.remove_item("labels", 2).unwrap();

    assert_eq!(list_items(&form, "labels"), ["l0", "l1", "l3", "l4"]);

    for _ in 0..4 {
        form.remove_item("labels", 0).unwrap();
    }
    assert_eq!(list_items(&form, "labels"), [""]);
    assert_eq!(form.value(), json!({"labels": []}));
}

/// A tuple type yields one fixed slot per element.
#[test]
fn test_tuple_slots_match_element_types() {
    let node = resolve_type_str("[u32, string, bool]", &InterfaceTable::new()).unwrap();
    let ArgNode::Tuple { slots } = node else {
        panic!("expected a tuple");
    };
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0].ty, "u32");
    assert_eq!(slots[1].ty, "string");
    assert_eq!(slots[2].ty, "bool");
}

/// Every edit hands the whole flattened tree to the change handler.
#[test]
fn test_change_handler_sees_every_edit() {
    let session = session(vec![json!({"type": "fn", "name": "set_pair", "method": "post",
        "inputs": [{"name": "pair", "ty": {"kind": "tuple", "items": [path("u8"), path("bool")]}}]})]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut form = session
        .argument_form("set_pair")
        .unwrap()
        .on_change(move |value| sink.lock().unwrap().push(value.clone()));

    form.set("pair.0", json!("8")).unwrap();
    form.set("pair.1", json!("true")).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(*seen, vec![json!({"pair": [8, false]}), json!({"pair": [8, true]})]);
    drop(seen);

    let call = session.prepare_call("set_pair", &form.value()).unwrap();
    assert_eq!(call.payload, vec![8, 1]);
}

#[test]
fn test_unknown_function_has_no_form() {
    let session = session(vec![]);
    assert!(session.argument_form("missing").is_err());
}
