//! In-place merging of incoming JSON into held entities.
//!
//! | Held       | Incoming                   | Action                          |
//! |------------|----------------------------|---------------------------------|
//! | model      | object                     | `reinit` the model in place     |
//! | collection | object array, or an object | arity policy below              |
//! | anything   | anything else              | not handled; caller overwrites  |
//!
//! Arity policy for `n` held members and `m` incoming documents:
//!
//! | Case              | Action                                          |
//! |-------------------|-------------------------------------------------|
//! | `n == 0 \|\| m == 0` | single `reset`                               |
//! | `n == m`          | positional `reinit`, no add/remove              |
//! | `n > m`           | positional `reinit` of `m`, `remove` the rest   |
//! | `n < m`           | positional `reinit` of `n`, `add` the rest      |
//!
//! Members inside the overlap keep their identity.

use serde_json::Value as Json;
use tracing::trace;

use crate::attrs::SetOptions;
use crate::collection::Collection;
use crate::error::Result;
use crate::value::Value;

/// Merge `incoming` into `held`. `Ok(false)` means the pair is not
/// reconcilable and the caller should overwrite.
pub(crate) fn merge_into(held: &Value, incoming: &Value, options: SetOptions) -> Result<bool> {
    match (held, incoming) {
        (Value::Model(model), Value::Json(doc @ Json::Object(_))) => {
            model.reinit_with(doc.clone(), options)?;
            Ok(true)
        }
        (Value::Collection(collection), Value::Json(json)) => match documents(json) {
            Some(docs) => {
                collection_into(collection, docs, options)?;
                Ok(true)
            }
            None => Ok(false),
        },
        _ => Ok(false),
    }
}

/// Whether [`merge_into`] would handle the pair.
pub(crate) fn accepts(held: &Value, incoming: &Value) -> bool {
    match (held, incoming) {
        (Value::Model(_), Value::Json(Json::Object(_))) => true,
        (Value::Collection(_), Value::Json(json)) => is_documents(json),
        _ => false,
    }
}

fn is_documents(json: &Json) -> bool {
    match json {
        Json::Array(items) => items.iter().all(Json::is_object),
        Json::Object(_) => true,
        _ => false,
    }
}

fn documents(json: &Json) -> Option<Vec<Json>> {
    match json {
        Json::Array(items) if is_documents(json) => Some(items.clone()),
        Json::Object(_) => Some(vec![json.clone()]),
        _ => None,
    }
}

pub(crate) fn collection_into(
    collection: &Collection,
    docs: Vec<Json>,
    options: SetOptions,
) -> Result<()> {
    let held = collection.len();
    let incoming = docs.len();
    if held == 0 || incoming == 0 {
        trace!(decision = "reset", held, incoming, "reconcile collection");
        return collection.reset(docs, options);
    }

    let members = collection.models();
    let mut docs = docs.into_iter();
    for member in &members {
        let Some(doc) = docs.next() else {
            break;
        };
        member.reinit_with(doc, options)?;
    }

    if held > incoming {
        trace!(decision = "truncate", held, incoming, "reconcile collection");
        collection.truncate(incoming, options);
    } else if held < incoming {
        trace!(decision = "extend", held, incoming, "reconcile collection");
        for doc in docs {
            collection.add(doc, options)?;
        }
    } else {
        trace!(decision = "update", held, incoming, "reconcile collection");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::model::Model;
    use serde_json::json;

    fn list(docs: Json) -> Collection {
        let Json::Array(items) = docs else {
            panic!("expected array")
        };
        Collection::from_documents(items, Rc::default()).unwrap()
    }

    fn record(c: &Collection) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        c.on_all(move |e| sink.borrow_mut().push(e.name().to_owned()));
        log
    }

    #[test]
    fn model_target_merges_in_place() {
        let model = Model::new(json!({"a": 1})).unwrap();
        let held = Value::Model(model.clone());
        assert!(merge_into(&held, &Value::from(json!({"a": 2})), SetOptions::default()).unwrap());
        assert_eq!(model.get("a"), Some(Value::from(2)));
    }

    #[test]
    fn scalar_into_model_is_not_handled() {
        let held = Value::Model(Model::new(json!({})).unwrap());
        assert!(!merge_into(&held, &Value::from(3), SetOptions::default()).unwrap());
    }

    #[test]
    fn mixed_array_into_collection_is_not_handled() {
        let held = Value::Collection(list(json!([{"a": 1}])));
        let mixed = Value::from(json!([{"a": 1}, 2]));
        assert!(!accepts(&held, &mixed));
        assert!(!merge_into(&held, &mixed, SetOptions::default()).unwrap());
    }

    #[test]
    fn single_object_is_coerced_to_one_element() {
        let c = list(json!([{"a": 1}, {"a": 2}]));
        let first = c.at(0).unwrap();
        merge_into(
            &Value::Collection(c.clone()),
            &Value::from(json!({"a": 9})),
            SetOptions::default(),
        )
        .unwrap();
        assert_eq!(c.len(), 1);
        assert!(c.at(0).unwrap().ptr_eq(&first));
        assert_eq!(first.get("a"), Some(Value::from(9)));
    }

    #[test]
    fn equal_lengths_update_positionally() {
        let c = list(json!([{"a": 1}, {"a": 2}]));
        let log = record(&c);
        collection_into(&c, vec![json!({"a": 1}), json!({"a": 3})], SetOptions::default())
            .unwrap();
        assert_eq!(*log.borrow(), vec!["change:a", "change"]);
    }

    #[test]
    fn empty_side_resets() {
        let c = list(json!([]));
        let log = record(&c);
        collection_into(&c, vec![json!({"a": 1})], SetOptions::default()).unwrap();
        collection_into(&c, vec![], SetOptions::default()).unwrap();
        assert_eq!(*log.borrow(), vec!["reset", "reset"]);
        assert!(c.is_empty());
    }

    #[test]
    fn growth_adds_surplus() {
        let c = list(json!([{"a": 1}]));
        let log = record(&c);
        collection_into(
            &c,
            vec![json!({"a": 1}), json!({"a": 2}), json!({"a": 3})],
            SetOptions::default(),
        )
        .unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(*log.borrow(), vec!["add", "add"]);
    }
}
