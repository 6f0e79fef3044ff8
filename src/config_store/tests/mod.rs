//! Unit tests for config_store module
//! No filesystem, timing, or external dependencies.

#![allow(clippy::panic)]


use std::{cell::RefCell, rc::Rc};

use serde_json::{Value, json};

use crate::config_store::{ConfigError, ConfigStore, EventRouter, UpdateEvent};

fn record(store: &mut ConfigStore, event: &str) -> Rc<RefCell<Vec<UpdateEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    store
        .on(event, move |e| sink.borrow_mut().push(e.clone()))
        .unwrap();
    seen
}

#[test]
fn simple_set_and_get() {
    let mut store = ConfigStore::new();
    store.set("xxx", 1);

    assert_eq!(store.get("xxx"), Some(&json!(1)));
    assert_eq!(store.get("not exist"), None);
    assert_eq!(store.get_or("not exist", &json!(1)), &json!(1));
}

#[test]
fn get_or_returns_stored_falsy_values() {
    let mut store = ConfigStore::new();
    store.set("off", false).set("zero", 0).set("nothing", Value::Null);

    let fallback = json!("fallback");
    assert_eq!(store.get_or("off", &fallback), &json!(false));
    assert_eq!(store.get_or("zero", &fallback), &json!(0));
    assert_eq!(store.get_or("nothing", &fallback), &Value::Null);
}

#[test]
fn has_is_true_only_for_present_keys() {
    let mut store = ConfigStore::new();
    store.set("present", 0).set("nested.null", Value::Null);

    assert!(store.has("present"));
    assert!(store.has("nested"));
    assert!(store.has("nested.null"));
    assert!(!store.has("absent"));
    assert!(!store.has("present.deeper"));
}

#[test]
fn dotted_paths_build_nested_mappings() {
    let mut store = ConfigStore::new();
    store.set("xxx.aaa", 1);
    store.set("yyy", json!({"aaa": 2}));

    assert_eq!(store.get("xxx.aaa"), Some(&json!(1)));
    assert_eq!(store.get("xxx"), Some(&json!({"aaa": 1})));
    assert_eq!(store.get("yyy.aaa"), Some(&json!(2)));
    assert_eq!(store.to_json(), &json!({"xxx": {"aaa": 1}, "yyy": {"aaa": 2}}));
}

#[test]
fn path_round_trip_preserves_structure() {
    let mut store = ConfigStore::new();
    let value = json!({"hosts": ["a", "b"], "tls": {"enabled": true}, "ratio": 0.5});
    store.set("servers.primary.settings", value.clone());

    assert_eq!(store.get("servers.primary.settings"), Some(&value));
    assert_eq!(store.get("servers.primary.settings.hosts.1"), Some(&json!("b")));
}

#[test]
fn merge_overwrites_and_namespaces() {
    let mut store = ConfigStore::new();
    store.set("xxx", 2);
    store.merge(json!({"xxx": 1}), None);
    store.merge(json!({"yyy": 1}), Some("prefix"));

    assert_eq!(store.get("xxx"), Some(&json!(1)));
    assert_eq!(store.get("prefix.yyy"), Some(&json!(1)));
    assert_eq!(store.get("yyy"), None);
}

#[test]
fn merge_strips_trailing_dots_from_prefix() {
    let mut store = ConfigStore::new();
    store.merge(json!({"a": 1}), Some("pre..."));
    store.merge(json!({"b": 2}), Some(""));

    assert_eq!(store.get("pre.a"), Some(&json!(1)));
    assert_eq!(store.get("b"), Some(&json!(2)));
}

#[test]
fn merge_replaces_top_level_subtrees() {
    let mut store = ConfigStore::new();
    store.merge(json!({"db": {"host": "localhost", "port": 5432}}), None);
    store.merge(json!({"db": {"host": "remote"}}), None);

    assert_eq!(store.get("db"), Some(&json!({"host": "remote"})));
    assert!(!store.has("db.port"));
}

#[test]
fn merge_visits_keys_in_source_order() {
    let mut store = ConfigStore::new();
    let seen = record(&mut store, "update");

    store.merge(json!({"zeta": 1, "alpha": 2, "mid": 3}), Some("ns"));

    let keys: Vec<String> = seen.borrow().iter().map(|e| e.key.clone()).collect();
    assert_eq!(keys, vec!["ns.zeta", "ns.alpha", "ns.mid"]);
}

#[test]
fn merge_of_sequence_uses_indices() {
    let mut store = ConfigStore::new();
    store.merge(json!(["a", "b"]), Some("list"));

    assert_eq!(store.get("list.0"), Some(&json!("a")));
    assert_eq!(store.get("list.1"), Some(&json!("b")));
}

#[test]
fn merge_of_scalar_changes_nothing() {
    let mut store = ConfigStore::new();
    store.merge(json!(42), None);

    assert_eq!(store.to_json(), &json!({}));
}

#[test]
fn typed_accessors_coerce() {
    let mut store = ConfigStore::new();
    store.set("xxx", 1.2);

    assert_eq!(store.get_as_string("xxx", None).as_deref(), Some("1.2"));
    assert_eq!(store.get_as_number("xxx", None), Some(1.2));
    assert_eq!(store.get_as_integer("xxx", None), Some(1));
}

#[test]
fn typed_accessors_parse_strings() {
    let mut store = ConfigStore::new();
    store.set("timeout", "2.75s").set("name", "server").set("flag", true);

    assert_eq!(store.get_as_number("timeout", None), Some(2.75));
    assert_eq!(store.get_as_integer("timeout", None), Some(2));
    assert_eq!(store.get_as_number("name", Some(1.0)), None);
    assert_eq!(store.get_as_string("flag", None).as_deref(), Some("true"));
    assert_eq!(store.get_as_number("flag", None), None);
}

#[test]
fn typed_accessors_floor_negative_numbers() {
    let mut store = ConfigStore::new();
    store.set("n", -1.5);

    assert_eq!(store.get_as_integer("n", None), Some(-2));
}

#[test]
fn set_with_huge_sequence_index_keeps_existing_items() {
    let mut store = ConfigStore::new();
    store.set("list", json!([1, 2]));
    store.set("list.18446744073709551615", 1);
    store.set("list.1000000000", 2);

    assert_eq!(store.get("list.0"), Some(&json!(1)));
    assert_eq!(store.get("list.18446744073709551615"), Some(&json!(1)));
    assert_eq!(store.get_as_integer("list.1000000000", None), Some(2));
}

#[test]
fn integer_accessor_rejects_values_outside_i64() {
    let mut store = ConfigStore::new();
    store
        .set("big", 1e300)
        .set("inf", "Infinity")
        .set("neg_inf", "-Infinity")
        .set("edge", -9_223_372_036_854_775_808.0);

    assert_eq!(store.get_as_integer("big", None), None);
    assert_eq!(store.get_as_integer("inf", Some(5)), None);
    assert_eq!(store.get_as_integer("neg_inf", None), None);
    assert_eq!(store.get_as_integer("edge", None), Some(i64::MIN));
    assert_eq!(store.get_as_number("big", None), Some(1e300));
}

#[test]
fn typed_accessors_fall_back_on_absent_or_null() {
    let mut store = ConfigStore::new();
    store.set("nothing", Value::Null);

    assert_eq!(store.get_as_string("missing", None), None);
    assert_eq!(store.get_as_string("missing", Some("d")).as_deref(), Some("d"));
    assert_eq!(store.get_as_number("nothing", Some(3.5)), Some(3.5));
    assert_eq!(store.get_as_integer("nothing", Some(7)), Some(7));
    assert_eq!(store.get_as_integer("missing", None), None);
}

#[test]
fn get_as_deserializes() {
    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Server {
        host: String,
        port: u16,
    }

    let mut store = ConfigStore::new();
    store.set("server", json!({"host": "localhost", "port": 8080}));

    let server: Option<Server> = store.get_as("server").unwrap();
    assert_eq!(
        server,
        Some(Server {
            host: "localhost".to_string(),
            port: 8080
        })
    );
    assert_eq!(store.get_as::<u16>("missing").unwrap(), None);

    match store.get_as::<u16>("server.host") {
        Err(ConfigError::TypeMismatch { path, .. }) => assert_eq!(path, "server.host"),
        other => panic!("expected type mismatch, got {other:?}"),
    }
}

#[test]
fn update_fires_on_catch_all_with_payload() {
    let mut store = ConfigStore::new();
    let seen = record(&mut store, "update");

    store.set("xxx.aa", 1);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].key, "xxx.aa");
    assert_eq!(seen[0].value, json!(1));
    assert_eq!(seen[0].old_value, None);
}

#[test]
fn exact_key_listener_needs_no_wildcard() {
    let mut store = ConfigStore::new();
    let seen = record(&mut store, "update:xxx.aa");

    store.set("xxx.aa", 1);
    store.set("xxx.bb", 1);

    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn wildcard_listener_sees_subtree_only() {
    let mut store = ConfigStore::new();
    let inside = record(&mut store, "update:xxx.**");
    let outside = record(&mut store, "update:yyy.**");

    store.set("xxx.aa", 1);

    let inside = inside.borrow();
    assert_eq!(inside.len(), 1);
    assert_eq!(inside[0].key, "xxx.aa");
    assert_eq!(inside[0].value, json!(1));
    assert!(outside.borrow().is_empty());
}

#[test]
fn idempotent_write_emits_once() {
    let mut store = ConfigStore::new();
    let any = record(&mut store, "update");
    let exact = record(&mut store, "update:k");

    store.set("k", "v");
    store.set("k", "v");

    assert_eq!(any.borrow().len(), 1);
    assert_eq!(exact.borrow().len(), 1);
}

#[test]
fn equal_structures_are_not_rewritten() {
    let mut store = ConfigStore::new();
    let seen = record(&mut store, "update");

    store.set("obj", json!({"a": [1, 2]}));
    store.set("obj", json!({"a": [1.0, 2]}));
    store.set("obj", json!({"a": [1, 3]}));

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].old_value, Some(json!({"a": [1, 2]})));
}

#[test]
fn off_stops_delivery() {
    let mut store = ConfigStore::new();
    let seen = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&seen);
    let id = store.on("update", move |_| *sink.borrow_mut() += 1).unwrap();

    store.set("a", 1);
    assert!(store.off(id));
    store.set("a", 2);

    assert_eq!(*seen.borrow(), 1);
}

#[test]
fn injected_router_keeps_its_handlers() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let mut router = EventRouter::new();
    router
        .on("update:app.*", move |e| sink.borrow_mut().push(e.key.clone()))
        .unwrap();

    let mut store = ConfigStore::with_router(router);
    store.set("app.name", "demo");

    assert_eq!(*seen.borrow(), vec!["app.name".to_string()]);
    assert_eq!(store.events().subscriber_count(), 1);
}

#[test]
fn invalid_event_names_are_rejected() {
    let mut store = ConfigStore::new();

    assert!(matches!(
        store.on("change", |_| {}),
        Err(ConfigError::InvalidEventName(name)) if name == "change"
    ));
}
