//! Attribute batches and `set` options.

use serde_json::{Map, Value as Json};

use crate::value::Value;

/// Flags accepted by every mutating call.
///
/// | Flag                  | Effect                                              |
/// |-----------------------|-----------------------------------------------------|
/// | `silent`              | commit without emitting any change event            |
/// | `unset`               | remove the addressed keys                           |
/// | `no_traverse`         | keep plain objects and arrays raw                   |
/// | `ignore_dot_notation` | treat `a.b` as a literal key                        |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SetOptions {
    pub silent: bool,
    pub unset: bool,
    pub no_traverse: bool,
    pub ignore_dot_notation: bool,
}

impl SetOptions {
    /// Options with only `silent` set.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            silent: true,
            unset: false,
            no_traverse: false,
            ignore_dot_notation: false,
        }
    }

    #[must_use]
    pub const fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    #[must_use]
    pub const fn with_unset(mut self, unset: bool) -> Self {
        self.unset = unset;
        self
    }

    #[must_use]
    pub const fn with_no_traverse(mut self, no_traverse: bool) -> Self {
        self.no_traverse = no_traverse;
        self
    }

    #[must_use]
    pub const fn with_ignore_dot_notation(mut self, ignore: bool) -> Self {
        self.ignore_dot_notation = ignore;
        self
    }
}

/// An ordered batch of `key -> value` assignments.
///
/// Inserting an existing key replaces its value in place, so the batch
/// behaves like a JSON object that remembers insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attrs {
    entries: Vec<(String, Value)>,
}

impl Attrs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for Attrs {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

impl From<Map<String, Json>> for Attrs {
    fn from(map: Map<String, Json>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for Attrs {
    fn from((key, value): (K, V)) -> Self {
        Self::new().with(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_replaces_in_place() {
        let attrs = Attrs::new().with("a", 1).with("b", 2).with("a", 3);
        assert_eq!(attrs.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(attrs.get("a"), Some(&Value::from(3)));
    }

    #[test]
    fn from_json_map_keeps_entries() {
        let Json::Object(map) = json!({"x": 1, "y": "two"}) else {
            unreachable!()
        };
        let attrs = Attrs::from(map);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("y").and_then(Value::as_str), Some("two"));
    }

    #[test]
    fn remove_returns_value() {
        let mut attrs = Attrs::from(("k", "v"));
        assert_eq!(attrs.remove("k"), Some(Value::from("v")));
        assert!(attrs.is_empty());
        assert_eq!(attrs.remove("k"), None);
    }

    #[test]
    fn option_builders() {
        let opts = SetOptions::silent().with_unset(true);
        assert!(opts.silent && opts.unset);
        assert!(!opts.no_traverse && !opts.ignore_dot_notation);
        assert_eq!(SetOptions::default().with_silent(true), SetOptions::silent());
    }
}
