#![forbid(unsafe_code)]

//! Hypermedia entity: attribute store, link table and command registry.
//!
//! A [`Model`] is a shared handle (`Rc`) to one resource. Cloning the handle
//! never copies state; [`Model::ptr_eq`] is the identity test and
//! [`Model::cid`] its printable form.
//!
//! # Set cycle
//!
//! ```text
//! set(attrs) -> validate -> snapshot previous (outermost only)
//!            -> plan: classify keys, promote objects/arrays
//!            -> reconcile keys already holding entities
//!            -> dotted keys: forward to the target entity
//!            -> diff, commit
//!            -> change:<key> per changed key
//!            -> change, repeated while handlers left changes pending (outermost only)
//! ```
//!
//! # Invariants
//!
//! 1. No `RefCell` borrow of the model is held while listeners run, so
//!    handlers may freely read or `set` the model that notified them.
//! 2. Re-entrant `set` calls commit and emit `change:<key>` immediately but
//!    leave the generic `change` to the outermost call.
//! 3. A rejected validation leaves attributes untouched and emits nothing.
//!    The same holds when a new child entity fails to build.
//! 4. `reinit` keeps identity, listeners, and the identity of every nested
//!    entity whose key survives.
//!
//! # Failure Modes
//!
//! | Condition                         | Result                          |
//! |-----------------------------------|---------------------------------|
//! | document is not an object         | `ModelError::NotAnObject`       |
//! | validator rejects                 | `ModelError::Validation`        |
//! | curie is not templated            | `ModelError::Hypermedia`        |
//! | dotted set through missing path   | ignored, logged at debug        |
//! | dotted set into raw JSON          | ignored, logged at debug        |
//! | error after some keys committed   | committed keys still emit       |

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use halo_reactive::{Emitter, ListenerId, Subscription, SubscriptionScope};
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::attrs::{Attrs, SetOptions};
use crate::collection::Collection;
use crate::command::{self, Command, CommandMeta};
use crate::config::ModelConfig;
use crate::error::{HypermediaError, ModelError, Result, json_kind};
use crate::event::{self, EventData, ModelEvent};
use crate::hypermedia;
use crate::link::{Link, LinkEntry, LinkTable, Rel};
use crate::path::{Path, Segment};
use crate::reconcile;
use crate::sync;
use crate::value::Value;

pub(crate) type AttrMap = AHashMap<String, Value>;

// ---------------------------------------------------------------------------
// Cid
// ---------------------------------------------------------------------------

static NEXT_CID: AtomicU64 = AtomicU64::new(1);

/// Process-local identity of a model or collection, printed as `c<N>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid(u64);

impl Cid {
    pub(crate) fn next() -> Self {
        Self(NEXT_CID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct ModelState {
    pub(crate) attributes: AttrMap,
    pub(crate) previous: AttrMap,
    pub(crate) changed: AttrMap,
    changing: bool,
    pending: bool,
    pub(crate) links: LinkTable,
    pub(crate) commands: Option<Model>,
    pub(crate) sync: SubscriptionScope,
    validation_error: Option<String>,
}

pub(crate) struct ModelInner {
    cid: Cid,
    config: Rc<ModelConfig>,
    emitter: Emitter<EventData>,
    state: RefCell<ModelState>,
    parent: RefCell<Weak<ModelInner>>,
    pub(crate) command: Option<Rc<CommandMeta>>,
}

/// Shared handle to a hypermedia entity.
#[derive(Clone)]
pub struct Model {
    pub(crate) inner: Rc<ModelInner>,
}

/// Non-owning model handle.
#[derive(Clone, Default)]
pub struct WeakModel {
    inner: Weak<ModelInner>,
}

impl WeakModel {
    #[must_use]
    pub fn upgrade(&self) -> Option<Model> {
        self.inner.upgrade().map(|inner| Model { inner })
    }
}

impl fmt::Debug for WeakModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakModel")
            .field("live", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl Model {
    /// Build a model of the base variant from a document.
    pub fn new(doc: Json) -> Result<Self> {
        Self::with_config(doc, Rc::new(ModelConfig::default()))
    }

    /// Build a model of the variant described by `config`.
    ///
    /// Construction is silent: hypermedia sections are merged, the `parse`
    /// hook and defaults are applied, and attributes are committed without
    /// events.
    pub fn with_config(doc: Json, config: Rc<ModelConfig>) -> Result<Self> {
        let model = Self::empty(config, None);
        model.initialize(doc)?;
        Ok(model)
    }

    pub(crate) fn empty(config: Rc<ModelConfig>, command: Option<Rc<CommandMeta>>) -> Self {
        Self {
            inner: Rc::new(ModelInner {
                cid: Cid::next(),
                config,
                emitter: Emitter::new(),
                state: RefCell::new(ModelState::default()),
                parent: RefCell::new(Weak::new()),
                command,
            }),
        }
    }

    fn initialize(&self, doc: Json) -> Result<()> {
        let doc = into_document(doc)?;
        let merged = hypermedia::merge(self, doc)?;
        let mut attrs = merged.attrs;
        if let Some(parse) = self.inner.config.parse_hook() {
            attrs = parse(attrs);
        }
        for (key, value) in self.inner.config.defaults() {
            if !attrs.contains_key(key) {
                attrs.insert(key.clone(), value.clone());
            }
        }
        self.write(attrs.into(), SetOptions::silent())?;
        self.state_mut().changed.clear();
        if self.inner.config.sync_commands() {
            sync::pair(self);
        }
        Ok(())
    }

    /// Merge a fresh document into this model, keeping its identity.
    pub fn reinit(&self, doc: Json) -> Result<&Self> {
        self.reinit_with(doc, SetOptions::default())
    }

    /// [`reinit`](Self::reinit) with explicit options.
    ///
    /// Link and command events queued by the merge fire after the attributes
    /// are committed.
    pub fn reinit_with(&self, doc: Json, options: SetOptions) -> Result<&Self> {
        let doc = into_document(doc)?;
        let syncing = self.inner.config.sync_commands();
        if syncing {
            let released = std::mem::take(&mut self.state_mut().sync);
            drop(released);
        }
        let merged = self.merge_document(doc, options);
        if syncing {
            sync::pair(self);
        }
        let events = merged?;
        if !options.silent {
            for name in events {
                self.trigger(name, EventData::new(None, options));
            }
        }
        Ok(self)
    }

    /// Merge and commit `doc`, returning the queued link and command events.
    fn merge_document(&self, doc: Map<String, Json>, options: SetOptions) -> Result<Vec<String>> {
        let merged = hypermedia::merge(self, doc)?;
        self.write(merged.attrs.into(), options)?;
        Ok(merged.events)
    }
}

fn into_document(doc: Json) -> Result<Map<String, Json>> {
    match doc {
        Json::Object(map) => Ok(map),
        Json::Null => Ok(Map::new()),
        other => Err(ModelError::NotAnObject {
            found: json_kind(&other),
        }),
    }
}

impl FromStr for Model {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(serde_json::from_str(s)?)
    }
}

// ---------------------------------------------------------------------------
// Identity & plumbing
// ---------------------------------------------------------------------------

impl Model {
    #[must_use]
    pub fn cid(&self) -> Cid {
        self.inner.cid
    }

    /// Whether both handles point to the same model.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakModel {
        WeakModel {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Rc<ModelConfig> {
        &self.inner.config
    }

    /// The model holding this one as an attribute, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Model> {
        self.inner.parent.borrow().upgrade().map(|inner| Model { inner })
    }

    pub(crate) fn set_parent(&self, parent: &Model) {
        *self.inner.parent.borrow_mut() = Rc::downgrade(&parent.inner);
    }

    #[must_use]
    pub fn is_command(&self) -> bool {
        self.inner.command.is_some()
    }

    pub(crate) fn state(&self) -> Ref<'_, ModelState> {
        self.inner.state.borrow()
    }

    pub(crate) fn state_mut(&self) -> RefMut<'_, ModelState> {
        self.inner.state.borrow_mut()
    }

    #[must_use]
    pub fn emitter(&self) -> &Emitter<EventData> {
        &self.inner.emitter
    }

    pub fn on(&self, name: impl Into<String>, f: impl Fn(&ModelEvent) + 'static) -> ListenerId {
        self.inner.emitter.on(name, f)
    }

    pub fn on_all(&self, f: impl Fn(&ModelEvent) + 'static) -> ListenerId {
        self.inner.emitter.on_all(f)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.emitter.off(id)
    }

    pub fn subscribe(
        &self,
        name: impl Into<String>,
        f: impl Fn(&ModelEvent) + 'static,
    ) -> Subscription {
        self.inner.emitter.subscribe(name, f)
    }

    pub fn subscribe_all(&self, f: impl Fn(&ModelEvent) + 'static) -> Subscription {
        self.inner.emitter.subscribe_all(f)
    }

    pub fn trigger(&self, name: impl Into<String>, data: EventData) {
        self.inner.emitter.trigger(name, data);
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Model");
        d.field("cid", &self.inner.cid.to_string());
        match self.inner.state.try_borrow() {
            Ok(state) => {
                let mut keys: Vec<&String> = state.attributes.keys().collect();
                keys.sort();
                d.field("attributes", &keys).field("links", &state.links.len());
            }
            Err(_) => {
                d.field("attributes", &"<borrowed>");
            }
        }
        d.finish()
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

impl Model {
    /// Read an attribute by key, dot path (`a.b.c`) or indexed path
    /// (`a[0].b`). A literal key wins over path interpretation.
    ///
    /// `0`, `false` and `""` are present values; only a missing key or an
    /// unreachable path reads as `None`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        if let Some(value) = self.attribute(path) {
            return Some(value);
        }
        if !Path::is_compound(path) {
            return None;
        }
        self.get_path(&Path::parse(path))
    }

    /// Walk a parsed path from this model.
    #[must_use]
    pub fn get_path(&self, path: &Path) -> Option<Value> {
        let mut current = Value::Model(self.clone());
        for segment in path.segments() {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Literal attribute lookup, no path parsing.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.state().attributes.get(key).cloned()
    }

    /// Whether `key` resolves to a non-null value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }

    /// Attribute names, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state().attributes.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Attributes sorted by key.
    #[must_use]
    pub fn attributes(&self) -> Vec<(String, Value)> {
        sorted(&self.state().attributes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state().attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().attributes.is_empty()
    }

    /// Value of `key` before the last outermost `set` began.
    #[must_use]
    pub fn previous(&self, key: &str) -> Option<Value> {
        self.state().previous.get(key).cloned()
    }

    #[must_use]
    pub fn previous_attributes(&self) -> Vec<(String, Value)> {
        sorted(&self.state().previous)
    }

    /// Keys the last outermost `set` changed relative to its snapshot.
    #[must_use]
    pub fn changed_attributes(&self) -> Vec<(String, Value)> {
        sorted(&self.state().changed)
    }

    #[must_use]
    pub fn has_changed(&self, key: &str) -> bool {
        self.state().changed.contains_key(key)
    }

    /// Message of the last rejected validation.
    #[must_use]
    pub fn validation_error(&self) -> Option<String> {
        self.state().validation_error.clone()
    }
}

fn sorted(map: &AttrMap) -> Vec<(String, Value)> {
    let mut entries: Vec<(String, Value)> =
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// What one incoming key does to the model.
enum Step {
    /// Reconcile into the entity already held.
    Merge(Value, Value),
    /// Forward a dotted key to its target entity.
    Path(String, Value),
    Commit(String, Value),
}

impl Model {
    /// Set one attribute.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<&Self> {
        self.set_attrs(Attrs::new().with(key, value), SetOptions::default())
    }

    /// Set one attribute with options.
    pub fn set_with(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        options: SetOptions,
    ) -> Result<&Self> {
        self.set_attrs(Attrs::new().with(key, value), options)
    }

    /// Remove one attribute.
    pub fn unset(&self, key: impl Into<String>) -> Result<&Self> {
        self.set_attrs(
            Attrs::new().with(key, Value::null()),
            SetOptions::default().with_unset(true),
        )
    }

    /// Remove every attribute.
    pub fn clear(&self, options: SetOptions) -> Result<&Self> {
        let attrs: Attrs = self.keys().into_iter().map(|k| (k, Value::null())).collect();
        self.set_attrs(
            attrs,
            options.with_unset(true).with_ignore_dot_notation(true),
        )
    }

    /// Apply a batch of assignments.
    ///
    /// The validator runs here; documents applied by construction and
    /// `reinit` are not validated.
    pub fn set_attrs(&self, attrs: impl Into<Attrs>, options: SetOptions) -> Result<&Self> {
        let attrs = attrs.into();
        if let Some(validator) = self.inner.config.validator() {
            if let Err(message) = validator(self, &attrs) {
                debug!(cid = %self.inner.cid, %message, "set rejected by validator");
                self.state_mut().validation_error = Some(message.clone());
                return Err(ModelError::Validation(message));
            }
        }
        self.state_mut().validation_error = None;
        self.write(attrs, options)?;
        Ok(self)
    }

    /// The set cycle without validation.
    ///
    /// Keys committed before an error still emit their change events.
    fn write(&self, attrs: Attrs, options: SetOptions) -> Result<()> {
        let outer = self.begin_change();
        let mut changes = Vec::new();
        let applied = self.apply(attrs, options, &mut changes);
        self.finish_change(outer, &changes, options);
        applied
    }

    fn begin_change(&self) -> bool {
        let mut state = self.state_mut();
        let outer = !state.changing;
        state.changing = true;
        if outer {
            state.previous = state.attributes.clone();
            state.changed.clear();
        }
        outer
    }

    fn apply(&self, attrs: Attrs, options: SetOptions, changes: &mut Vec<String>) -> Result<()> {
        for step in self.plan(attrs, options)? {
            match step {
                Step::Merge(held, incoming) => {
                    reconcile::merge_into(&held, &incoming, options)?;
                }
                Step::Path(key, value) => self.set_through_path(&key, value, options)?,
                Step::Commit(key, value) => {
                    if self.commit(&key, &value, options) {
                        changes.push(key);
                    }
                }
            }
        }
        Ok(())
    }

    /// Classify every key and build new child entities before anything is
    /// committed.
    fn plan(&self, attrs: Attrs, options: SetOptions) -> Result<Vec<Step>> {
        attrs
            .into_iter()
            .map(|(key, value)| {
                if !options.unset {
                    let held = self
                        .state()
                        .attributes
                        .get(&key)
                        .filter(|held| reconcile::accepts(held, &value))
                        .cloned();
                    if let Some(held) = held {
                        return Ok(Step::Merge(held, value));
                    }
                }
                if !options.ignore_dot_notation && Path::is_compound(&key) {
                    return Ok(Step::Path(key, value));
                }
                let value = if options.unset {
                    value
                } else {
                    self.promote(&key, value, options)?
                };
                Ok(Step::Commit(key, value))
            })
            .collect()
    }

    fn set_through_path(&self, key: &str, value: Value, options: SetOptions) -> Result<()> {
        let path = Path::parse(key);
        let target = path
            .split_last()
            .and_then(|(lead, last)| Some((self.get_path(&lead)?, last.clone())));
        match target {
            Some((Value::Model(model), Segment::Key(last))) => {
                model.set_attrs(
                    Attrs::new().with(last, value),
                    options.with_ignore_dot_notation(true),
                )?;
            }
            Some((Value::Collection(collection), Segment::Index(index))) => {
                match (collection.at(index), value) {
                    (Some(member), Value::Json(doc @ Json::Object(_))) => {
                        member.reinit_with(doc, options)?;
                    }
                    _ => debug!(cid = %self.inner.cid, path = key, "dotted set member not merged"),
                }
            }
            _ => debug!(cid = %self.inner.cid, path = key, "dotted set target not found"),
        }
        Ok(())
    }

    /// Turn plain objects into child models and object arrays into
    /// collections.
    fn promote(&self, key: &str, value: Value, options: SetOptions) -> Result<Value> {
        if options.no_traverse {
            return Ok(value);
        }
        match value {
            Value::Json(Json::Object(map)) => {
                let config = self.inner.config.child_config(key);
                Ok(Value::Model(Model::with_config(Json::Object(map), config)?))
            }
            Value::Json(Json::Array(items)) if items.iter().all(Json::is_object) => {
                let config = self.inner.config.child_config(key);
                Ok(Value::Collection(Collection::from_documents(items, config)?))
            }
            other => Ok(other),
        }
    }

    /// Store one value; `true` when it differs from the current one.
    fn commit(&self, key: &str, value: &Value, options: SetOptions) -> bool {
        let (changed, replaced) = {
            let mut state = self.state_mut();
            let changed = if options.unset {
                state.attributes.contains_key(key)
            } else {
                state.attributes.get(key) != Some(value)
            };
            let differs_from_previous = if options.unset {
                state.previous.contains_key(key)
            } else {
                state.previous.get(key) != Some(value)
            };
            if differs_from_previous {
                state.changed.insert(key.to_owned(), value.clone());
            } else {
                state.changed.remove(key);
            }
            let replaced = if options.unset {
                state.attributes.remove(key)
            } else {
                state.attributes.insert(key.to_owned(), value.clone())
            };
            (changed, replaced)
        };

        if let Some(old) = replaced {
            if options.unset || old != *value {
                old.detach(self, key);
            }
        }
        if !options.unset {
            value.attach(self, key);
        }
        changed
    }

    fn finish_change(&self, outer: bool, changes: &[String], options: SetOptions) {
        if !options.silent {
            if !changes.is_empty() {
                self.state_mut().pending = true;
            }
            for key in changes {
                let value = self.attribute(key);
                self.trigger(event::change(key), EventData::new(value, options));
            }
        }
        if !outer {
            return;
        }
        if !options.silent {
            while self.take_pending() {
                self.trigger(
                    event::CHANGE,
                    EventData::new(Some(Value::Model(self.clone())), options),
                );
            }
        }
        let mut state = self.state_mut();
        state.pending = false;
        state.changing = false;
    }

    fn take_pending(&self) -> bool {
        std::mem::take(&mut self.state_mut().pending)
    }
}

// ---------------------------------------------------------------------------
// Hypermedia surface
// ---------------------------------------------------------------------------

impl Model {
    /// Href of the `self` relation.
    pub fn url(&self) -> Result<String, HypermediaError> {
        self.state()
            .links
            .self_href()
            .map(str::to_owned)
            .ok_or(HypermediaError::NotHypermedia)
    }

    /// Replace the `self` relation.
    pub fn set_url(&self, href: impl Into<String>) {
        self.state_mut()
            .links
            .insert("self", LinkEntry::One(Link::new(href)));
    }

    /// Resolve a relation. Unknown relations resolve to an empty href.
    pub fn rel(&self, rel: &str) -> Result<Rel, HypermediaError> {
        self.state().links.resolve(rel, None)
    }

    /// Resolve a relation, expanding templates with `params`.
    pub fn rel_with(&self, rel: &str, params: &[(&str, &str)]) -> Result<Rel, HypermediaError> {
        self.state().links.resolve(rel, Some(params))
    }

    /// Snapshot of the link table.
    #[must_use]
    pub fn rels(&self) -> LinkTable {
        self.state().links.clone()
    }

    /// Documentation URI of a `prefix:name` relation via the curie table.
    #[must_use]
    pub fn fully_qualified_rel(&self, rel: &str) -> Option<String> {
        self.state().links.fully_qualified(rel)
    }

    /// Look up a command by dotted id, or by a relation whose href points
    /// into `#_commands/`.
    #[must_use]
    pub fn command(&self, id_or_rel: &str) -> Option<Command> {
        let id = self
            .state()
            .links
            .get(id_or_rel)
            .and_then(LinkEntry::first)
            .and_then(|link| command::id_from_href(link.href()));
        let registry = self.state().commands.clone()?;
        command::find(&registry, id.as_deref().unwrap_or(id_or_rel))
    }

    /// Every command, ordered by id.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        let mut found = Vec::new();
        if let Some(registry) = self.state().commands.clone() {
            collect_commands(&registry, &mut found);
        }
        found
    }

    /// Read `<command id>.<property>`.
    #[must_use]
    pub fn get_command_property(&self, path: &str) -> Option<Value> {
        let (id, prop) = path.rsplit_once('.')?;
        self.command(id)?.properties().attribute(prop)
    }

    /// Write `<command id>.<property>`. `Ok(false)` when no such command.
    pub fn set_command_property(&self, path: &str, value: impl Into<Value>) -> Result<bool> {
        let Some((id, prop)) = path.rsplit_once('.') else {
            return Ok(false);
        };
        let Some(command) = self.command(id) else {
            return Ok(false);
        };
        command.properties().set_with(
            prop,
            value,
            SetOptions::default().with_ignore_dot_notation(true),
        )?;
        Ok(true)
    }
}

fn collect_commands(group: &Model, found: &mut Vec<Command>) {
    for (_, value) in group.attributes() {
        let Value::Model(model) = value else {
            continue;
        };
        match Command::from_model(model.clone()) {
            Some(command) => found.push(command),
            None => collect_commands(&model, found),
        }
    }
}
