#![forbid(unsafe_code)]

//! Link table: relations, curies and href resolution.
//!
//! A [`LinkTable`] is built from a document's `_links` section. Each relation
//! maps to a [`LinkEntry`]: a bare [`Link`], or an ordered list when the
//! relation carries zero or several link objects. A one-element array always
//! collapses to the bare form.
//!
//! # Invariants
//!
//! 1. Every link with `templated: true` holds its parsed template from the
//!    moment the table is built.
//! 2. Curies are read from the `curie` or `curies` relation and must all be
//!    templated.
//! 3. Relations iterate in name order.
//!
//! # Failure Modes
//!
//! | Condition                               | Result                               |
//! |-----------------------------------------|--------------------------------------|
//! | unknown relation                        | `Rel::Href("")`                      |
//! | templated relation, no parameters       | `MissingTemplateParams`              |
//! | curie without `templated: true`         | `UntemplatedCurie` (table not built) |
//! | link object without a string `href`     | href is empty                        |

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use halo_uri::{TemplateFactory, UriTemplate};
use serde_json::{Map, Value as Json};

use crate::error::HypermediaError;

const CURIE_RELS: [&str; 2] = ["curie", "curies"];

/// One link object.
#[derive(Clone)]
pub struct Link {
    href: String,
    templated: bool,
    name: Option<String>,
    extra: Map<String, Json>,
    template: Option<Rc<dyn UriTemplate>>,
}

impl Link {
    /// A plain, untemplated link.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            templated: false,
            name: None,
            extra: Map::new(),
            template: None,
        }
    }

    fn from_json(object: &Map<String, Json>, templates: &dyn TemplateFactory) -> Self {
        let href = object
            .get("href")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_owned();
        let templated = object
            .get("templated")
            .and_then(Json::as_bool)
            .unwrap_or(false);
        let name = object.get("name").and_then(Json::as_str).map(str::to_owned);
        let extra = object
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "href" | "templated" | "name"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let template = templated.then(|| templates.parse(&href));
        Self {
            href,
            templated,
            name,
            extra,
            template,
        }
    }

    #[must_use]
    pub fn href(&self) -> &str {
        &self.href
    }

    #[must_use]
    pub fn is_templated(&self) -> bool {
        self.templated
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Any other link member, such as `title` or `type`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Json> {
        self.extra.get(key)
    }

    /// Expand a templated href. `None` for plain links.
    #[must_use]
    pub fn expand(&self, params: &[(&str, &str)]) -> Option<String> {
        self.template.as_ref().map(|t| t.expand(params))
    }

    fn resolve(
        &self,
        rel: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<String, HypermediaError> {
        match (&self.template, params) {
            (Some(template), Some(params)) => Ok(template.expand(params)),
            (Some(_), None) => Err(HypermediaError::MissingTemplateParams {
                rel: rel.to_owned(),
            }),
            (None, _) => Ok(self.href.clone()),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Json {
        let mut object = Map::new();
        object.insert("href".into(), Json::String(self.href.clone()));
        if self.templated {
            object.insert("templated".into(), Json::Bool(true));
        }
        if let Some(name) = &self.name {
            object.insert("name".into(), Json::String(name.clone()));
        }
        for (k, v) in &self.extra {
            object.insert(k.clone(), v.clone());
        }
        Json::Object(object)
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("href", &self.href)
            .field("templated", &self.templated)
            .field("name", &self.name)
            .finish()
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.href == other.href
            && self.templated == other.templated
            && self.name == other.name
            && self.extra == other.extra
    }
}

/// What a relation name maps to.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEntry {
    One(Link),
    Many(Vec<Link>),
}

impl LinkEntry {
    #[must_use]
    pub fn links(&self) -> &[Link] {
        match self {
            Self::One(link) => std::slice::from_ref(link),
            Self::Many(links) => links,
        }
    }

    #[must_use]
    pub fn first(&self) -> Option<&Link> {
        self.links().first()
    }

    fn hrefs(&self) -> impl Iterator<Item = &str> {
        self.links().iter().map(Link::href)
    }

    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::One(link) => link.to_json(),
            Self::Many(links) => Json::Array(links.iter().map(Link::to_json).collect()),
        }
    }
}

/// Resolved href(s) of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rel {
    Href(String),
    Hrefs(Vec<String>),
}

impl Rel {
    /// The single href, if this relation has exactly one link.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Href(href) => Some(href),
            Self::Hrefs(_) => None,
        }
    }

    /// Whether this is the soft-miss sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Href(href) if href.is_empty())
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Href(href) => vec![href],
            Self::Hrefs(hrefs) => hrefs,
        }
    }
}

impl PartialEq<str> for Rel {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Rel {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

/// Structural difference between two tables, one entry per relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDelta {
    Added(String),
    Changed(String),
    Removed(String),
}

impl LinkDelta {
    #[must_use]
    pub fn event_name(&self) -> String {
        match self {
            Self::Added(rel) => crate::event::add_rel(rel),
            Self::Changed(rel) => crate::event::change_rel(rel),
            Self::Removed(rel) => crate::event::remove_rel(rel),
        }
    }
}

#[derive(Clone, Default)]
pub struct LinkTable {
    entries: BTreeMap<String, LinkEntry>,
    curies: BTreeMap<String, Rc<dyn UriTemplate>>,
}

impl LinkTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a `_links` section.
    ///
    /// Anything other than a JSON object yields an empty table. Array members
    /// that are not objects are skipped.
    pub fn parse(raw: &Json, templates: &dyn TemplateFactory) -> Result<Self, HypermediaError> {
        let mut table = Self::new();
        let Json::Object(rels) = raw else {
            return Ok(table);
        };
        for (rel, value) in rels {
            let entry = match value {
                Json::Object(object) => LinkEntry::One(Link::from_json(object, templates)),
                Json::Array(items) => {
                    let mut links: Vec<Link> = items
                        .iter()
                        .filter_map(Json::as_object)
                        .map(|object| Link::from_json(object, templates))
                        .collect();
                    if links.len() == 1 {
                        LinkEntry::One(links.remove(0))
                    } else {
                        LinkEntry::Many(links)
                    }
                }
                _ => continue,
            };
            table.entries.insert(rel.clone(), entry);
        }
        table.collect_curies()?;
        Ok(table)
    }

    fn collect_curies(&mut self) -> Result<(), HypermediaError> {
        for rel in CURIE_RELS {
            let Some(entry) = self.entries.get(rel) else {
                continue;
            };
            for link in entry.links() {
                let name = link.name().unwrap_or_default();
                let Some(template) = &link.template else {
                    return Err(HypermediaError::UntemplatedCurie {
                        name: name.to_owned(),
                    });
                };
                self.curies.insert(name.to_owned(), Rc::clone(template));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, rel: &str) -> Option<&LinkEntry> {
        self.entries.get(rel)
    }

    #[must_use]
    pub fn contains(&self, rel: &str) -> bool {
        self.entries.contains_key(rel)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LinkEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn insert(&mut self, rel: impl Into<String>, entry: LinkEntry) -> Option<LinkEntry> {
        self.entries.insert(rel.into(), entry)
    }

    pub fn remove(&mut self, rel: &str) -> Option<LinkEntry> {
        self.entries.remove(rel)
    }

    /// Template registered for a curie prefix.
    #[must_use]
    pub fn curie(&self, prefix: &str) -> Option<&Rc<dyn UriTemplate>> {
        self.curies.get(prefix)
    }

    /// Href of the `self` relation, if it has one non-empty href.
    #[must_use]
    pub fn self_href(&self) -> Option<&str> {
        self.entries
            .get("self")
            .and_then(LinkEntry::first)
            .map(Link::href)
            .filter(|href| !href.is_empty())
    }

    /// Resolve a relation to its href(s), expanding templates with `params`.
    pub fn resolve(
        &self,
        rel: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<Rel, HypermediaError> {
        match self.entries.get(rel) {
            None => Ok(Rel::Href(String::new())),
            Some(LinkEntry::One(link)) => link.resolve(rel, params).map(Rel::Href),
            Some(LinkEntry::Many(links)) => links
                .iter()
                .map(|link| link.resolve(rel, params))
                .collect::<Result<_, _>>()
                .map(Rel::Hrefs),
        }
    }

    /// Expand `prefix:name` through the curie table to the relation's
    /// documentation URI.
    #[must_use]
    pub fn fully_qualified(&self, rel: &str) -> Option<String> {
        let (prefix, name) = rel.split_once(':')?;
        self.curies
            .get(prefix)
            .map(|template| template.expand(&[("rel", name)]))
    }

    /// Relations added, changed (different hrefs) or removed going from
    /// `self` to `next`.
    #[must_use]
    pub fn diff(&self, next: &LinkTable) -> Vec<LinkDelta> {
        let mut deltas = Vec::new();
        for (rel, entry) in &next.entries {
            match self.entries.get(rel) {
                None => deltas.push(LinkDelta::Added(rel.clone())),
                Some(old) if !old.hrefs().eq(entry.hrefs()) => {
                    deltas.push(LinkDelta::Changed(rel.clone()));
                }
                Some(_) => {}
            }
        }
        for rel in self.entries.keys() {
            if !next.entries.contains_key(rel) {
                deltas.push(LinkDelta::Removed(rel.clone()));
            }
        }
        deltas
    }

    #[must_use]
    pub fn to_json(&self) -> Json {
        Json::Object(
            self.entries
                .iter()
                .map(|(rel, entry)| (rel.clone(), entry.to_json()))
                .collect(),
        )
    }
}

impl fmt::Debug for LinkTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkTable")
            .field("entries", &self.entries)
            .field("curies", &self.curies.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo_uri::Rfc6570;
    use serde_json::json;

    fn table(raw: Json) -> LinkTable {
        LinkTable::parse(&raw, &Rfc6570).unwrap()
    }

    #[test]
    fn singleton_array_collapses() {
        let t = table(json!({"item": [{"href": "/a"}]}));
        assert!(matches!(t.get("item"), Some(LinkEntry::One(_))));
        assert_eq!(t.resolve("item", None).unwrap(), "/a");
    }

    #[test]
    fn longer_arrays_stay_lists() {
        let t = table(json!({"item": [{"href": "/a"}, {"href": "/b"}]}));
        assert_eq!(
            t.resolve("item", None).unwrap(),
            Rel::Hrefs(vec!["/a".into(), "/b".into()])
        );
    }

    #[test]
    fn empty_array_resolves_to_empty_list() {
        let t = table(json!({"item": []}));
        assert_eq!(t.resolve("item", None).unwrap(), Rel::Hrefs(vec![]));
    }

    #[test]
    fn unknown_relation_is_soft_miss() {
        let t = table(json!({}));
        let rel = t.resolve("nope", None).unwrap();
        assert!(rel.is_empty());
        assert_eq!(rel, "");
    }

    #[test]
    fn templated_relation_requires_params() {
        let t = table(json!({"thing": {"href": "/thing/{id}", "templated": true}}));
        assert_eq!(
            t.resolve("thing", None),
            Err(HypermediaError::MissingTemplateParams { rel: "thing".into() })
        );
        assert_eq!(t.resolve("thing", Some(&[("id", "7")])).unwrap(), "/thing/7");
    }

    #[test]
    fn plain_link_ignores_params() {
        let t = table(json!({"self": {"href": "/x"}}));
        assert_eq!(t.resolve("self", Some(&[("id", "1")])).unwrap(), "/x");
    }

    #[test]
    fn curies_expand_relation_names() {
        let t = table(json!({
            "curie": {"name": "app", "templated": true, "href": "/rels/{rel}"}
        }));
        assert_eq!(t.fully_qualified("app:thing").as_deref(), Some("/rels/thing"));
        assert_eq!(t.fully_qualified("other:thing"), None);
        assert_eq!(t.fully_qualified("plain"), None);
    }

    #[test]
    fn curies_plural_form() {
        let t = table(json!({
            "curies": [
                {"name": "a", "templated": true, "href": "/a/{rel}"},
                {"name": "b", "templated": true, "href": "/b/{rel}"}
            ]
        }));
        assert_eq!(t.fully_qualified("b:x").as_deref(), Some("/b/x"));
    }

    #[test]
    fn untemplated_curie_fails() {
        let err = LinkTable::parse(
            &json!({"curie": {"name": "app", "href": "/rels/{rel}"}}),
            &Rfc6570,
        )
        .unwrap_err();
        assert_eq!(err, HypermediaError::UntemplatedCurie { name: "app".into() });
    }

    #[test]
    fn diff_reports_each_kind() {
        let before = table(json!({"a": {"href": "/a"}, "b": {"href": "/b"}}));
        let after = table(json!({"b": {"href": "/b2"}, "c": {"href": "/c"}}));
        let names: Vec<String> = before.diff(&after).iter().map(LinkDelta::event_name).collect();
        assert_eq!(names, vec!["change-rel:b", "add-rel:c", "remove-rel:a"]);
    }

    #[test]
    fn diff_ignores_identical_hrefs() {
        let before = table(json!({"a": {"href": "/a", "title": "x"}}));
        let after = table(json!({"a": {"href": "/a", "title": "y"}}));
        assert!(before.diff(&after).is_empty());
    }

    #[test]
    fn extra_members_round_trip() {
        let raw = json!({"self": {"href": "/s", "title": "Self"}});
        assert_eq!(table(raw.clone()).to_json(), raw);
    }

    #[test]
    fn self_href_requires_non_empty() {
        assert_eq!(table(json!({"self": {"href": ""}})).self_href(), None);
        assert_eq!(table(json!({"self": {"href": "/s"}})).self_href(), Some("/s"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn only_singletons_collapse(hrefs in proptest::collection::vec("/[a-z]{1,8}", 0..6)) {
                let links: Vec<Json> = hrefs.iter().map(|h| json!({"href": h})).collect();
                let t = table(json!({"item": links}));
                let rel = t.resolve("item", None).unwrap();
                if hrefs.len() == 1 {
                    prop_assert!(matches!(t.get("item"), Some(LinkEntry::One(_))));
                    prop_assert_eq!(rel, Rel::Href(hrefs[0].clone()));
                } else {
                    prop_assert!(matches!(t.get("item"), Some(LinkEntry::Many(_))));
                    prop_assert_eq!(rel, Rel::Hrefs(hrefs.clone()));
                }
            }

            #[test]
            fn parse_is_idempotent_through_to_json(
                hrefs in proptest::collection::vec("/[a-z]{1,8}", 0..4)
            ) {
                let links: Vec<Json> = hrefs.iter().map(|h| json!({"href": h})).collect();
                let once = table(json!({"item": links}));
                let twice = table(once.to_json());
                prop_assert!(once.diff(&twice).is_empty());
                prop_assert_eq!(once.to_json(), twice.to_json());
            }
        }
    }
}
