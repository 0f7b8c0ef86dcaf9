#![forbid(unsafe_code)]

//! Commands: described state-changing operations embedded in a resource.
//!
//! A [`Command`] is a model carrying `href`, `method`, optional `encoding`,
//! and a `properties` model holding the operation's parameters. It is
//! owned by its parent's command registry and keeps only a weak reference
//! back to the parent.
//!
//! # State machine
//!
//! ```text
//!            property change (not restoring)
//!   clean ───────────────────────────────────▶ dirty   emits dirty:<id>
//!     ▲                                          │
//!     └──────── clean() / merge update ──────────┘      emits clean:<id>
//! ```
//!
//! # Invariants
//!
//! 1. Every property change re-emits `change:<prop>:<id>` on the parent.
//! 2. Restoring the clean snapshot never marks the command dirty.
//! 3. A merge that updates the command replaces its snapshot and leaves it
//!    clean.
//! 4. A removed command has no listeners left.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use halo_reactive::SubscriptionScope;
use serde_json::{Map, Value as Json};

use crate::attrs::{Attrs, SetOptions};
use crate::error::Result;
use crate::event::{self, EventData};
use crate::hypermedia::EventQueue;
use crate::model::{Model, WeakModel};
use crate::value::Value;

const PROPERTIES: &str = "properties";
const COMMAND_PREFIX: &str = "#_commands/";

pub(crate) struct CommandMeta {
    id: String,
    parent: WeakModel,
    properties: Model,
    clean: Cell<bool>,
    restoring: Cell<bool>,
    snapshot: RefCell<Map<String, Json>>,
    listeners: RefCell<SubscriptionScope>,
}

/// Handle to a command model.
#[derive(Clone)]
pub struct Command {
    model: Model,
    meta: Rc<CommandMeta>,
}

impl Command {
    pub(crate) fn from_model(model: Model) -> Option<Self> {
        let meta = Rc::clone(model.inner.command.as_ref()?);
        Some(Self { model, meta })
    }

    fn create(parent: &Model, id: &str, mut data: Map<String, Json>) -> Result<Self> {
        let props = take_properties(&mut data);
        if !data.contains_key("href") {
            if let Ok(url) = parent.url() {
                data.insert("href".into(), Json::String(url));
            }
        }
        let base = Rc::new(parent.config().base());
        let properties = Model::with_config(Json::Object(props), Rc::clone(&base))?;
        let meta = Rc::new(CommandMeta {
            id: id.to_owned(),
            parent: parent.downgrade(),
            properties: properties.clone(),
            clean: Cell::new(true),
            restoring: Cell::new(false),
            snapshot: RefCell::new(Map::new()),
            listeners: RefCell::new(SubscriptionScope::new()),
        });
        let model = Model::empty(base, Some(Rc::clone(&meta)));
        let mut attrs = Attrs::from(data);
        attrs.insert(PROPERTIES, Value::Model(properties));
        model.set_attrs(attrs, quiet())?;

        let command = Self { model, meta };
        command.wire();
        command.mark_clean();
        Ok(command)
    }

    /// Apply a merged leaf to an existing command.
    fn update(&self, mut data: Map<String, Json>) -> Result<()> {
        let props = take_properties(&mut data);
        self.model.set_attrs(data, quiet())?;

        let properties = &self.meta.properties;
        let stale: Attrs = properties
            .keys()
            .into_iter()
            .filter(|key| !props.contains_key(key))
            .map(|key| (key, Value::null()))
            .collect();
        if !stale.is_empty() {
            properties.set_attrs(stale, quiet().with_unset(true))?;
        }
        properties.set_attrs(props, quiet())?;

        self.mark_clean();
        Ok(())
    }

    /// Listen for every direct property change, including keys added later.
    fn wire(&self) {
        let command = self.model.downgrade();
        let sub = self.meta.properties.emitter().subscribe_all(move |e| {
            let Some(prop) = event::changed_attribute(e.name()) else {
                return;
            };
            if let Some(command) = command.upgrade().and_then(Command::from_model) {
                command.property_changed(prop, e.payload());
            }
        });
        let mut scope = self.meta.listeners.borrow_mut();
        scope.clear();
        scope.hold(sub);
    }

    fn property_changed(&self, prop: &str, data: &EventData) {
        let Some(parent) = self.meta.parent.upgrade() else {
            return;
        };
        parent.trigger(event::command_property(prop, &self.meta.id), data.clone());
        if self.meta.restoring.get() {
            return;
        }
        self.meta.clean.set(false);
        parent.trigger(event::dirty(&self.meta.id), EventData::default());
    }

    fn mark_clean(&self) {
        let snapshot = match self.meta.properties.to_plain_json() {
            Json::Object(map) => map,
            _ => Map::new(),
        };
        *self.meta.snapshot.borrow_mut() = snapshot;
        self.meta.clean.set(true);
    }

    fn teardown(&self) {
        self.meta.listeners.borrow_mut().clear();
    }

    /// Command id, dotted for nested commands.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The parameter model.
    #[must_use]
    pub fn properties(&self) -> &Model {
        &self.meta.properties
    }

    /// The entity that owns this command.
    #[must_use]
    pub fn parent(&self) -> Option<Model> {
        self.meta.parent.upgrade()
    }

    #[must_use]
    pub fn href(&self) -> Option<String> {
        self.string_field("href")
    }

    #[must_use]
    pub fn method(&self) -> Option<String> {
        self.string_field("method")
    }

    #[must_use]
    pub fn encoding(&self) -> Option<String> {
        self.string_field("encoding")
    }

    fn string_field(&self, key: &str) -> Option<String> {
        self.model
            .attribute(key)
            .and_then(|v| v.as_str().map(str::to_owned))
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.meta.clean.get()
    }

    /// Properties as of the last merge or `clean()`.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Json> {
        self.meta.snapshot.borrow().clone()
    }

    /// Restore the clean snapshot and emit `clean:<id>` on the parent.
    pub fn clean(&self) -> Result<()> {
        let snapshot = self.snapshot();
        self.meta.restoring.set(true);
        let restored = self.restore(snapshot);
        self.meta.restoring.set(false);
        restored?;

        self.meta.clean.set(true);
        if let Some(parent) = self.parent() {
            parent.trigger(event::clean(&self.meta.id), EventData::default());
        }
        Ok(())
    }

    fn restore(&self, snapshot: Map<String, Json>) -> Result<()> {
        let properties = &self.meta.properties;
        let extra: Attrs = properties
            .keys()
            .into_iter()
            .filter(|key| !snapshot.contains_key(key))
            .map(|key| (key, Value::null()))
            .collect();
        if !extra.is_empty() {
            properties.set_attrs(extra, literal().with_unset(true))?;
        }
        properties.set_attrs(snapshot, literal())?;
        Ok(())
    }

    /// Overwrite every property `other` defines with this command's value,
    /// removing it from `other` when this command has none.
    pub fn push_to(&self, other: &Command) -> Result<()> {
        let mut assign = Attrs::new();
        let mut remove = Attrs::new();
        for key in other.properties().keys() {
            match self.properties().attribute(&key) {
                Some(value) => assign.insert(key, value.detached()),
                None => remove.insert(key, Value::null()),
            }
        }
        if !remove.is_empty() {
            other.properties().set_attrs(remove, literal().with_unset(true))?;
        }
        other.properties().set_attrs(assign, literal())?;
        Ok(())
    }

    /// Copy in `other`'s non-empty values for the properties this command
    /// defines.
    pub fn pull_from(&self, other: &Command) -> Result<()> {
        let incoming: Attrs = self
            .properties()
            .keys()
            .into_iter()
            .filter_map(|key| {
                let value = other.properties().attribute(&key)?;
                (!value.is_blank()).then(|| (key, value.detached()))
            })
            .collect();
        self.properties().set_attrs(incoming, literal())?;
        Ok(())
    }

    /// Copy the parent's value of each property key into the command.
    pub fn pull(&self) -> Result<()> {
        let Some(parent) = self.parent() else {
            return Ok(());
        };
        let incoming: Attrs = self
            .properties()
            .keys()
            .into_iter()
            .filter_map(|key| {
                let value = parent.attribute(&key)?;
                Some((key, value.detached()))
            })
            .collect();
        self.properties().set_attrs(incoming, literal())?;
        Ok(())
    }

    /// Write each property onto the parent attribute of the same name.
    pub fn push(&self) -> Result<()> {
        let Some(parent) = self.parent() else {
            return Ok(());
        };
        let outgoing: Attrs = self
            .properties()
            .attributes()
            .into_iter()
            .map(|(key, value)| (key, value.detached()))
            .collect();
        parent.set_attrs(outgoing, literal())?;
        Ok(())
    }
}

impl Deref for Command {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.model.ptr_eq(&other.model)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.meta.id)
            .field("clean", &self.meta.clean.get())
            .field("properties", &self.meta.properties.keys())
            .finish()
    }
}

/// Options for merge-driven writes.
fn quiet() -> SetOptions {
    SetOptions::silent().with_ignore_dot_notation(true)
}

/// Options for user-driven property writes.
fn literal() -> SetOptions {
    SetOptions::default().with_ignore_dot_notation(true)
}

fn take_properties(data: &mut Map<String, Json>) -> Map<String, Json> {
    match data.remove(PROPERTIES) {
        Some(Json::Object(props)) => props,
        _ => Map::new(),
    }
}

/// Command id addressed by a relation href such as `#_commands/edit/create`.
pub(crate) fn id_from_href(href: &str) -> Option<String> {
    href.strip_prefix(COMMAND_PREFIX)
        .map(|path| path.replace('/', "."))
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge a `_commands` tree into `model`'s registry.
pub(crate) fn merge_commands(model: &Model, raw: &Json, queue: &mut EventQueue) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaves(raw, "", &mut leaves);
    let registry = registry_of(model);

    for command in model.commands() {
        if leaves.iter().any(|(id, _)| id == command.id()) {
            continue;
        }
        command.teardown();
        uninstall(&registry, command.id())?;
        queue.push(event::remove_command(command.id()));
    }

    for (id, data) in leaves {
        match find(&registry, &id) {
            Some(command) => {
                command.update(data)?;
                queue.push(event::clean(&id));
            }
            None => {
                let command = Command::create(model, &id, data)?;
                install(&registry, &id, &command)?;
                queue.push(event::add_command(&id));
                queue.push(event::clean(&id));
            }
        }
    }
    Ok(())
}

/// Leaves are objects owning a `properties` member; anything else nests.
fn collect_leaves(json: &Json, prefix: &str, out: &mut Vec<(String, Map<String, Json>)>) {
    let Json::Object(map) = json else {
        return;
    };
    for (key, value) in map {
        let id = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Json::Object(object) if object.contains_key(PROPERTIES) => {
                out.push((id, object.clone()));
            }
            Json::Object(_) => collect_leaves(value, &id, out),
            _ => {}
        }
    }
}

fn registry_of(model: &Model) -> Model {
    if let Some(registry) = model.state().commands.clone() {
        return registry;
    }
    let registry = Model::empty(Rc::new(model.config().base()), None);
    model.state_mut().commands = Some(registry.clone());
    registry
}

pub(crate) fn find(registry: &Model, id: &str) -> Option<Command> {
    let mut group = registry.clone();
    let mut segments = id.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Value::Model(next) = group.attribute(segment)? else {
            return None;
        };
        if segments.peek().is_none() {
            return Command::from_model(next);
        }
        if next.is_command() {
            return None;
        }
        group = next;
    }
    None
}

fn install(registry: &Model, id: &str, command: &Command) -> Result<()> {
    let mut segments: Vec<&str> = id.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return Ok(());
    };
    let mut group = registry.clone();
    for segment in segments {
        let next = match group.attribute(segment) {
            Some(Value::Model(existing)) if !existing.is_command() => existing,
            _ => {
                let fresh = Model::empty(Rc::new(registry.config().base()), None);
                group.set_with(segment, Value::Model(fresh.clone()), quiet())?;
                fresh
            }
        };
        group = next;
    }
    group.set_with(leaf, Value::Model(command.model.clone()), quiet())?;
    Ok(())
}

/// Remove a command and prune the groups it leaves empty.
fn uninstall(registry: &Model, id: &str) -> Result<()> {
    let segments: Vec<&str> = id.split('.').collect();
    let mut chain = Vec::with_capacity(segments.len());
    let mut group = registry.clone();
    for (i, segment) in segments.iter().enumerate() {
        chain.push((group.clone(), *segment));
        if i + 1 == segments.len() {
            break;
        }
        match group.attribute(segment) {
            Some(Value::Model(next)) => group = next,
            _ => return Ok(()),
        }
    }

    let remove = quiet().with_unset(true);
    let mut child_emptied = true;
    for (group, key) in chain.into_iter().rev() {
        if !child_emptied {
            break;
        }
        group.set_with(key, Value::null(), remove)?;
        child_emptied = group.is_empty();
    }
    Ok(())
}
