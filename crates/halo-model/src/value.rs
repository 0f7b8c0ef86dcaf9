//! Attribute values.
//!
//! An attribute holds raw JSON or a nested entity. Raw JSON compares
//! structurally; entities compare by identity, so re-assigning the same
//! child is never a change.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value as Json;

use crate::collection::Collection;
use crate::model::Model;
use crate::path::Segment;

#[derive(Clone)]
pub enum Value {
    Json(Json),
    Model(Model),
    Collection(Collection),
}

impl Value {
    #[must_use]
    pub fn null() -> Self {
        Self::Json(Json::Null)
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&Json> {
        match self {
            Self::Json(json) => Some(json),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Json::as_str)
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_json().and_then(Json::as_i64)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_json().and_then(Json::as_f64)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_json().and_then(Json::as_bool)
    }

    #[must_use]
    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Self::Model(model) => Some(model),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Json(Json::Null))
    }

    /// Null or the empty string.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Json(Json::Null) => true,
            Self::Json(Json::String(s)) => s.is_empty(),
            _ => false,
        }
    }

    /// Whether this is a nested entity.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        !matches!(self, Self::Json(_))
    }

    /// JSON form without hypermedia sections or serialization quirks.
    #[must_use]
    pub fn to_plain_json(&self) -> Json {
        match self {
            Self::Json(json) => json.clone(),
            Self::Model(model) => model.to_plain_json(),
            Self::Collection(collection) => {
                Json::Array(collection.models().iter().map(Model::to_plain_json).collect())
            }
        }
    }

    /// Detached copy: entities become their plain JSON.
    pub(crate) fn detached(&self) -> Value {
        match self {
            Self::Json(json) => Self::Json(json.clone()),
            nested => Self::Json(nested.to_plain_json()),
        }
    }

    /// One path step down from this value.
    pub(crate) fn child(&self, segment: &Segment) -> Option<Value> {
        match (self, segment) {
            (Self::Model(model), Segment::Key(key)) => model.attribute(key),
            (Self::Collection(collection), Segment::Index(idx)) => {
                collection.at(*idx).map(Self::Model)
            }
            (Self::Json(Json::Object(map)), Segment::Key(key)) => {
                map.get(key).cloned().map(Self::Json)
            }
            (Self::Json(Json::Array(items)), Segment::Index(idx)) => {
                items.get(*idx).cloned().map(Self::Json)
            }
            _ => None,
        }
    }

    /// Wire a nested value under `parent[key]`.
    pub(crate) fn attach(&self, parent: &Model, key: &str) {
        match self {
            Self::Model(model) => {
                model.emitter().cascade_to(parent.emitter(), Some(key));
                model.set_parent(parent);
            }
            Self::Collection(collection) => {
                collection.emitter().cascade_to(parent.emitter(), Some(key));
                collection.set_parent(parent);
            }
            Self::Json(_) => {}
        }
    }

    pub(crate) fn detach(&self, parent: &Model, key: &str) {
        match self {
            Self::Model(model) => {
                model.emitter().detach_cascade(parent.emitter(), Some(key));
            }
            Self::Collection(collection) => {
                collection.emitter().detach_cascade(parent.emitter(), Some(key));
            }
            Self::Json(_) => {}
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::Model(a), Self::Model(b)) => a.ptr_eq(b),
            (Self::Collection(a), Self::Collection(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<Json> for Value {
    fn eq(&self, other: &Json) -> bool {
        self.as_json() == Some(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(json) => write!(f, "{json}"),
            Self::Model(model) => fmt::Debug::fmt(model, f),
            Self::Collection(collection) => fmt::Debug::fmt(collection, f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Json(json) => json.serialize(serializer),
            Self::Model(model) => model.serialize(serializer),
            Self::Collection(collection) => collection.serialize(serializer),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Self::Json(json)
    }
}

impl From<Model> for Value {
    fn from(model: Model) -> Self {
        Self::Model(model)
    }
}

impl From<Collection> for Value {
    fn from(collection: Collection) -> Self {
        Self::Collection(collection)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Json(Json::String(s.to_owned()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Json(Json::String(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Json(Json::Bool(b))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Json(Json::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Json(Json::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Json(Json::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Json(Json::from(n))
    }
}
