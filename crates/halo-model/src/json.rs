//! Serialization back to the wire shape.
//!
//! `to_json` rebuilds `_links` (when any) and `_commands` (when any
//! command exists). `_embedded` is not rebuilt: embedded resources come
//! back as ordinary nested attributes. Scalar attributes that are null,
//! `false` or `""` serialize as `""`; `0` is kept.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as Json};

use crate::collection::Collection;
use crate::hypermedia::{COMMANDS, LINKS};
use crate::model::Model;
use crate::value::Value;

impl Model {
    /// Wire form of this model.
    #[must_use]
    pub fn to_json(&self) -> Json {
        let mut out = Map::new();
        for (key, value) in self.attributes() {
            out.insert(key, wire_value(&value));
        }
        let (links, commands) = {
            let state = self.state();
            let links = (!state.links.is_empty()).then(|| state.links.to_json());
            (links, state.commands.clone())
        };
        if let Some(links) = links {
            out.insert(LINKS.into(), links);
        }
        if let Some(registry) = commands.filter(|r| !r.is_empty()) {
            out.insert(COMMANDS.into(), registry.to_json());
        }
        Json::Object(out)
    }

    /// Attributes only, values as stored.
    #[must_use]
    pub fn to_plain_json(&self) -> Json {
        Json::Object(
            self.attributes()
                .into_iter()
                .map(|(key, value)| (key, value.to_plain_json()))
                .collect(),
        )
    }
}

fn wire_value(value: &Value) -> Json {
    match value {
        Value::Json(Json::Null | Json::Bool(false)) => Json::String(String::new()),
        Value::Json(json) => json.clone(),
        Value::Model(model) => model.to_json(),
        Value::Collection(collection) => collection.to_json(),
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
