#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use halo_model::{Collection, Model, Subscription};
use serde_json::{Value as Json, json};

/// Single `curie` link plus a templated relation.
pub fn services_curie() -> Json {
    json!({
        "_links": {
            "self": {"href": "/services"},
            "curie": {"name": "app", "templated": true, "href": "/services/rels/{rel}"},
            "app:thing": {"href": "/services/thing/{id}", "templated": true},
            "app:list": [{"href": "/services/list/1"}, {"href": "/services/list/2"}],
            "app:single": [{"href": "/services/single"}]
        }
    })
}

/// Several curies under the plural relation.
pub fn services_curies() -> Json {
    json!({
        "_links": {
            "self": {"href": "/services"},
            "curies": [
                {"name": "app", "templated": true, "href": "/services/rels/{rel}"},
                {"name": "ext", "templated": true, "href": "/external/rels/{rel}"}
            ],
            "ext:report": {"href": "/reports{?year,month}", "templated": true}
        }
    })
}

pub fn attribute_test() -> Json {
    json!({
        "_links": {"self": {"href": "/attribute-test"}},
        "title": "Attributes",
        "count": 0,
        "empty": "",
        "flag": false,
        "nested": {"level": {"value": "deep"}},
        "tags": ["a", "b"]
    })
}

pub fn embed_test() -> Json {
    json!({
        "_links": {"self": {"href": "/embed-test"}},
        "_embedded": {
            "author": {
                "_links": {"self": {"href": "/people/1"}},
                "name": "Ada"
            },
            "chapters": [
                {"_links": {"self": {"href": "/chapters/1"}}, "title": "One"},
                {"_links": {"self": {"href": "/chapters/2"}}, "title": "Two"}
            ],
            "anonymous": {"note": "no self link"}
        }
    })
}

pub fn tasklist() -> Json {
    json!({
        "_links": {
            "self": {"href": "/tasklist"},
            "cmd:create": {"href": "#_commands/edit/create"}
        },
        "name": "Not default",
        "_commands": {
            "create": {
                "href": "/tasklist/create",
                "method": "POST",
                "properties": {"name": "Default"}
            },
            "edit": {
                "create": {
                    "method": "PUT",
                    "encoding": "application/json",
                    "properties": {"name": "Default", "done": false}
                }
            }
        }
    })
}

/// Documents `{"i": 0, "generation": g}`, `{"i": 1, ...}`, ...
pub fn items(count: usize, generation: u64) -> Json {
    Json::Array(
        (0..count)
            .map(|i| json!({"i": i, "generation": generation}))
            .collect(),
    )
}

pub fn model(doc: Json) -> Model {
    Model::new(doc).expect("fixture builds")
}

/// Records every event name seen on an emitter while alive.
pub struct EventLog {
    names: Rc<RefCell<Vec<String>>>,
    _subscription: Subscription,
}

impl EventLog {
    pub fn on_model(model: &Model) -> Self {
        let names = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&names);
        let subscription =
            model.subscribe_all(move |e| sink.borrow_mut().push(e.name().to_owned()));
        Self {
            names,
            _subscription: subscription,
        }
    }

    pub fn on_collection(collection: &Collection) -> Self {
        let names = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&names);
        let subscription = collection
            .emitter()
            .subscribe_all(move |e| sink.borrow_mut().push(e.name().to_owned()));
        Self {
            names,
            _subscription: subscription,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.names.borrow().clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.borrow().iter().any(|n| n == name)
    }

    pub fn count(&self, name: &str) -> usize {
        self.names.borrow().iter().filter(|n| *n == name).count()
    }

    pub fn clear(&self) {
        self.names.borrow_mut().clear();
    }
}
