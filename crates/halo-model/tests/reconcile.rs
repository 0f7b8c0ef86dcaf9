mod common;

use common::{EventLog, embed_test, items, model};
use halo_model::{Model, Value};
use proptest::prelude::*;
use serde_json::json;

#[test]
fn reinit_keeps_nested_identity() {
    let m = model(embed_test());
    let author = m.get("author").unwrap().as_model().cloned().unwrap();
    let chapters = m.get("chapters").unwrap().as_collection().cloned().unwrap();
    let first = chapters.at(0).unwrap();

    m.reinit(json!({
        "_links": {"self": {"href": "/embed-test"}},
        "_embedded": {
            "author": {"_links": {"self": {"href": "/people/1"}}, "name": "Ada L."},
            "chapters": [
                {"_links": {"self": {"href": "/chapters/1"}}, "title": "One, revised"},
                {"_links": {"self": {"href": "/chapters/2"}}, "title": "Two"}
            ]
        }
    }))
    .unwrap();

    assert!(m.get("author").unwrap().as_model().unwrap().ptr_eq(&author));
    assert!(m.get("chapters").unwrap().as_collection().unwrap().ptr_eq(&chapters));
    assert!(chapters.at(0).unwrap().ptr_eq(&first));
    assert_eq!(author.get("name").unwrap(), "Ada L.");
    assert_eq!(first.get("title").unwrap(), "One, revised");
}

#[test]
fn nested_model_events_cascade_with_keys() {
    let m = model(json!({"bar": {"foo": {"value": 1}}}));
    let log = EventLog::on_model(&m);
    m.set("bar.foo.value", 2).unwrap();
    assert!(log.contains("change:value:foo:bar"));
    assert!(log.contains("change:foo:bar"));
}

#[test]
fn child_observers_are_unaffected_by_cascade() {
    let m = model(json!({"child": {"x": 1}}));
    let child = m.get("child").unwrap().as_model().cloned().unwrap();
    let child_log = EventLog::on_model(&child);
    child.set("x", 2).unwrap();
    assert_eq!(child_log.names(), vec!["change:x", "change"]);
}

#[test]
fn collection_member_events_reach_root() {
    let m = model(json!({"list": [{"name": "a"}]}));
    let log = EventLog::on_model(&m);
    m.get("list[0]")
        .unwrap()
        .as_model()
        .unwrap()
        .set("name", "b")
        .unwrap();
    assert!(log.contains("change:name:list"));
}

#[test]
fn replacing_a_child_detaches_the_old_one() {
    let m = model(json!({"child": {"x": 1}}));
    let old = m.get("child").unwrap().as_model().cloned().unwrap();
    let replacement = Model::new(json!({"y": 1})).unwrap();
    m.set("child", replacement.clone()).unwrap();

    let log = EventLog::on_model(&m);
    old.set("x", 2).unwrap();
    assert!(log.names().is_empty());
    replacement.set("y", 2).unwrap();
    assert!(log.contains("change:y:child"));
}

#[test]
fn scalar_overwrites_nested_value() {
    let m = model(json!({"child": {"x": 1}}));
    m.set("child", 5).unwrap();
    assert_eq!(m.get("child").unwrap(), Value::from(5));
}

#[test]
fn dotted_path_round_trip_for_existing_chain() {
    let m = model(json!({"a": {"b": {"c": 0}}}));
    m.set("a.b.c", json!({"deep": true})).unwrap();
    assert_eq!(m.get("a.b.c.deep").unwrap(), Value::from(true));
}

fn names_of(log: &EventLog, wanted: &[&str]) -> Vec<String> {
    log.names()
        .into_iter()
        .filter(|n| wanted.contains(&n.as_str()))
        .collect()
}

proptest! {
    #[test]
    fn dotted_set_then_get(v in any::<i64>()) {
        let m = model(json!({"a": {"b": {"c": 0}}}));
        m.set("a.b.c", v).unwrap();
        prop_assert_eq!(m.get("a.b.c"), Some(Value::from(v)));
    }

    #[test]
    fn reconciliation_arity_law(n in 0usize..6, m in 0usize..6) {
        let root = model(json!({"items": items(n, 1)}));
        let collection = root.get("items").unwrap().as_collection().cloned().unwrap();
        let before = collection.models();
        let log = EventLog::on_collection(&collection);

        root.reinit(json!({"items": items(m, 2)})).unwrap();

        let structural = names_of(&log, &["add", "remove", "reset"]);
        if n == 0 || m == 0 {
            prop_assert_eq!(structural, vec!["reset".to_owned()]);
            prop_assert_eq!(log.count("change"), 0);
        } else {
            let overlap = n.min(m);
            for (i, member) in before.iter().take(overlap).enumerate() {
                prop_assert!(collection.at(i).unwrap().ptr_eq(member));
            }
            prop_assert_eq!(log.count("change"), overlap);
            prop_assert_eq!(log.count("remove"), n.saturating_sub(m));
            prop_assert_eq!(log.count("add"), m.saturating_sub(n));
            prop_assert_eq!(log.count("reset"), 0);
        }
        prop_assert_eq!(collection.len(), m);
        prop_assert!(root.get("items").unwrap().as_collection().unwrap().ptr_eq(&collection));
    }
}
